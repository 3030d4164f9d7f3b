//! In-memory chain client with scripted behaviour
//!
//! Used for dry runs and tests. Every resolution and invocation is recorded so
//! callers can check what would have been submitted.

use crate::traits::{ChainClient, ContractHandle};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use types::utils::is_valid_contract_address;
use types::{
    BlockRef, ChainError, Confirmation, EntrypointCall, OperationDescriptor, PendingOperation,
    KNOWN_ENTRYPOINTS,
};

const BASE58_ALPHABET: &[u8] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Chain id reported by the stub
pub const STUB_CHAIN_ID: &str = "NetXstubchain00";

/// Scripted behaviour for an entrypoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StubBehavior {
    /// Submit and confirm as applied
    Succeed,
    /// Submit, then report failure with the given reason
    Fail(String),
    /// Reject at invocation time with the given reason
    Reject(String),
    /// Submit and never confirm
    Hang,
}

/// Calls recorded by the stub
#[derive(Debug, Clone, Default)]
pub struct StubLog {
    /// Resolved addresses, in order
    pub resolutions: Vec<String>,
    /// Invoked entrypoints, in order
    pub invocations: Vec<String>,
    /// Confirmations awaited, by entrypoint
    pub confirmations: Vec<String>,
}

#[derive(Debug)]
struct StubState {
    behaviors: HashMap<String, StubBehavior>,
    entrypoints: Vec<String>,
    unreachable: HashSet<String>,
    validate_arguments: bool,
    log: Mutex<StubLog>,
    counter: AtomicU64,
}

/// Scripted in-memory chain client
#[derive(Debug, Clone)]
pub struct StubChainClient {
    state: Arc<StubState>,
}

/// Contract handle returned by [`StubChainClient`]
#[derive(Debug, Clone)]
pub struct StubContract {
    address: String,
    state: Arc<StubState>,
}

impl StubChainClient {
    /// Create a stub where every known entrypoint succeeds
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Start building a scripted stub
    pub fn builder() -> StubChainClientBuilder {
        StubChainClientBuilder::default()
    }

    /// Snapshot of recorded calls
    pub fn log(&self) -> StubLog {
        self.state.lock_log().clone()
    }

    /// Entrypoints invoked so far
    pub fn invocations(&self) -> Vec<String> {
        self.state.lock_log().invocations.clone()
    }

    /// Addresses resolved so far
    pub fn resolutions(&self) -> Vec<String> {
        self.state.lock_log().resolutions.clone()
    }
}

impl Default for StubChainClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`StubChainClient`]
#[derive(Debug)]
pub struct StubChainClientBuilder {
    behaviors: HashMap<String, StubBehavior>,
    entrypoints: Vec<String>,
    unreachable: HashSet<String>,
    validate_arguments: bool,
}

impl Default for StubChainClientBuilder {
    fn default() -> Self {
        Self {
            behaviors: HashMap::new(),
            entrypoints: KNOWN_ENTRYPOINTS.iter().map(|e| e.to_string()).collect(),
            unreachable: HashSet::new(),
            validate_arguments: true,
        }
    }
}

impl StubChainClientBuilder {
    /// Script the behaviour of an entrypoint
    pub fn behavior(mut self, entrypoint: &str, behavior: StubBehavior) -> Self {
        if !self.entrypoints.iter().any(|e| e == entrypoint) {
            self.entrypoints.push(entrypoint.to_string());
        }
        self.behaviors.insert(entrypoint.to_string(), behavior);
        self
    }

    /// Make an address fail resolution as unreachable
    pub fn unreachable(mut self, address: &str) -> Self {
        self.unreachable.insert(address.to_string());
        self
    }

    /// Toggle typed argument validation on invoke
    pub fn validate_arguments(mut self, validate: bool) -> Self {
        self.validate_arguments = validate;
        self
    }

    pub fn build(self) -> StubChainClient {
        StubChainClient {
            state: Arc::new(StubState {
                behaviors: self.behaviors,
                entrypoints: self.entrypoints,
                unreachable: self.unreachable,
                validate_arguments: self.validate_arguments,
                log: Mutex::new(StubLog::default()),
                counter: AtomicU64::new(0),
            }),
        }
    }
}

impl StubState {
    fn lock_log(&self) -> MutexGuard<'_, StubLog> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn behavior(&self, entrypoint: &str) -> StubBehavior {
        self.behaviors
            .get(entrypoint)
            .cloned()
            .unwrap_or(StubBehavior::Succeed)
    }

    fn next_sequence(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Deterministic base58 operation hash for a sequence number
fn stub_operation_hash(sequence: u64) -> String {
    let mut digits = Vec::new();
    let mut n = sequence;
    loop {
        digits.push(BASE58_ALPHABET[(n % 58) as usize] as char);
        n /= 58;
        if n == 0 {
            break;
        }
    }
    let encoded: String = digits.into_iter().rev().collect();
    format!("oo{:1>49}", encoded)
}

#[async_trait]
impl ChainClient for StubChainClient {
    type Contract = StubContract;

    async fn resolve_contract(&self, address: &str) -> Result<StubContract, ChainError> {
        self.state.lock_log().resolutions.push(address.to_string());

        if !is_valid_contract_address(address) {
            return Err(ChainError::ContractResolution {
                address: address.to_string(),
                reason: "not a valid KT1 contract address".to_string(),
            });
        }
        if self.state.unreachable.contains(address) {
            return Err(ChainError::ContractResolution {
                address: address.to_string(),
                reason: "contract unreachable".to_string(),
            });
        }

        Ok(StubContract {
            address: address.to_string(),
            state: self.state.clone(),
        })
    }

    async fn await_confirmation(
        &self,
        pending: &PendingOperation,
    ) -> Result<Confirmation, ChainError> {
        self.state
            .lock_log()
            .confirmations
            .push(pending.entrypoint.clone());

        match self.state.behavior(&pending.entrypoint) {
            StubBehavior::Succeed => Ok(Confirmation::Applied {
                block: BlockRef {
                    level: self.state.next_sequence(),
                    chain_id: STUB_CHAIN_ID.to_string(),
                    hash: None,
                },
            }),
            StubBehavior::Fail(reason) => Ok(Confirmation::Failed {
                block: None,
                reason,
            }),
            StubBehavior::Reject(reason) => Err(ChainError::Confirmation {
                op_hash: pending.op_hash.clone(),
                reason: format!("operation was rejected before submission: {}", reason),
            }),
            StubBehavior::Hang => std::future::pending().await,
        }
    }

    fn name(&self) -> &str {
        "stub"
    }
}

#[async_trait]
impl ContractHandle for StubContract {
    fn address(&self) -> &str {
        &self.address
    }

    fn entrypoints(&self) -> &[String] {
        &self.state.entrypoints
    }

    async fn invoke(&self, entrypoint: &str, args: &[Value]) -> Result<PendingOperation, ChainError> {
        self.state.lock_log().invocations.push(entrypoint.to_string());

        if !self.has_entrypoint(entrypoint) {
            return Err(ChainError::Invocation {
                entrypoint: entrypoint.to_string(),
                reason: format!("contract {} has no such entrypoint", self.address),
            });
        }

        if self.state.validate_arguments && EntrypointCall::is_known(entrypoint) {
            let descriptor = OperationDescriptor::new(entrypoint, args.to_vec());
            EntrypointCall::from_descriptor(&descriptor)
                .map_err(|e| e.into_invocation_error(entrypoint))?;
        }

        if let StubBehavior::Reject(reason) = self.state.behavior(entrypoint) {
            return Err(ChainError::Invocation {
                entrypoint: entrypoint.to_string(),
                reason,
            });
        }

        let op_hash = stub_operation_hash(self.state.next_sequence());
        Ok(PendingOperation::new(op_hash, entrypoint))
    }
}
