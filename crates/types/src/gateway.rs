//! Wallet gateway wire types

use crate::operation::BlockRef;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// Wallet gateway connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewaySettings {
    /// Gateway base URL
    pub url: String,
    /// Timeout for a single request
    pub request_timeout: Duration,
    /// Interval between operation status polls
    pub poll_interval: Duration,
    /// Give up waiting for a confirmation after this long
    pub max_wait: Duration,
    /// Blocks required on top of the including block
    pub required_confirmations: u32,
}

/// Active wallet account and network (`GET /wallet`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WalletInfo {
    /// Public key hash of the signing account
    pub address: String,
    /// Network the wallet is connected to
    pub network: String,
}

/// Contract entrypoints (`GET /contracts/{address}/entrypoints`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntrypointsResponse {
    /// Entrypoint name to Michelson parameter type
    pub entrypoints: BTreeMap<String, Value>,
}

/// Operation submission request (`POST /operations`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitOperationRequest {
    /// Target contract address
    pub contract: String,
    /// Entrypoint name
    pub entrypoint: String,
    /// Entrypoint arguments
    pub args: Vec<Value>,
}

/// Operation submission response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitOperationResponse {
    /// Injected operation hash
    #[serde(rename = "opHash")]
    pub op_hash: String,
}

/// Operation status as reported by the gateway (`GET /operations/{hash}`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationStatusResponse {
    /// Current status
    pub status: GatewayOperationStatus,
    /// Number of blocks since inclusion
    #[serde(default)]
    pub confirmations: u32,
    /// Including block
    #[serde(default)]
    pub block: Option<BlockRef>,
    /// Errors reported by the node
    #[serde(default)]
    pub errors: Vec<GatewayErrorDetail>,
}

/// Operation status values
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GatewayOperationStatus {
    /// Not yet included
    Pending,
    /// Included and applied
    Applied,
    /// Included but failed
    Failed,
    /// Reverted because a later operation in the batch failed
    Backtracked,
    /// Skipped because an earlier operation in the batch failed
    Skipped,
}

/// Error detail from the gateway
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GatewayErrorDetail {
    /// Error identifier
    pub id: String,
    /// Human readable message
    #[serde(default)]
    pub message: Option<String>,
}

impl GatewaySettings {
    /// Settings with default timings for the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            request_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(2),
            max_wait: Duration::from_secs(600),
            required_confirmations: 1,
        }
    }
}

impl GatewayOperationStatus {
    /// Check if the status is terminal
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GatewayOperationStatus::Pending)
    }
}

impl OperationStatusResponse {
    /// Join reported errors into one message
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return format!("operation {:?}", self.status).to_lowercase();
        }
        self.errors
            .iter()
            .map(|e| match &e.message {
                Some(message) => format!("{}: {}", e.id, message),
                None => e.id.clone(),
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}
