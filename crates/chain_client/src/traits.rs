//! Chain client traits and interfaces

use async_trait::async_trait;
use serde_json::Value;
use types::{ChainError, Confirmation, PendingOperation};

/// Access to a ledger through a wallet that signs and submits operations
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Handle type returned for a resolved contract
    type Contract: ContractHandle;

    /// Resolve a deployed contract by address
    async fn resolve_contract(&self, address: &str) -> Result<Self::Contract, ChainError>;

    /// Wait until a submitted operation reaches a terminal state.
    ///
    /// Never returns while the operation is still pending. Any timeout policy
    /// belongs to the implementation and is reported as
    /// [`ChainError::Confirmation`].
    async fn await_confirmation(
        &self,
        pending: &PendingOperation,
    ) -> Result<Confirmation, ChainError>;

    /// Get the name of the chain client
    fn name(&self) -> &str;
}

/// A resolved contract exposing named entrypoints
#[async_trait]
pub trait ContractHandle: Send + Sync {
    /// Contract address
    fn address(&self) -> &str;

    /// Entrypoints exposed by the contract
    fn entrypoints(&self) -> &[String];

    /// Check if the contract exposes an entrypoint
    fn has_entrypoint(&self, name: &str) -> bool {
        self.entrypoints().iter().any(|e| e == name)
    }

    /// Sign and submit a call to an entrypoint.
    ///
    /// Fails with [`ChainError::Invocation`] without submitting when the
    /// entrypoint is unknown or the arguments are malformed.
    async fn invoke(&self, entrypoint: &str, args: &[Value])
        -> Result<PendingOperation, ChainError>;
}
