//! Operation and pipeline types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Unique identifier for a pipeline run
pub type RunId = Uuid;

/// One contract call to perform
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationDescriptor {
    /// Entrypoint name
    pub name: String,
    /// Ordered argument list
    #[serde(default)]
    pub args: Vec<Value>,
}

/// The full ordered job for one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineRequest {
    /// Target contract address
    pub contract: String,
    /// Operations in submission order
    pub operations: Vec<OperationDescriptor>,
}

/// An operation that was accepted for submission but is not yet terminal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingOperation {
    /// Operation hash
    #[serde(rename = "opHash")]
    pub op_hash: String,
    /// Entrypoint that was invoked
    pub entrypoint: String,
    /// Submission timestamp
    #[serde(rename = "submittedAt")]
    pub submitted_at: DateTime<Utc>,
}

/// Block that included an operation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockRef {
    /// Block level (height)
    pub level: u64,
    /// Chain identifier
    #[serde(rename = "chainId")]
    pub chain_id: String,
    /// Block hash
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

/// Terminal confirmation reported by a chain client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    /// Operation applied and included
    Applied { block: BlockRef },
    /// Operation included but failed, or dropped
    Failed {
        block: Option<BlockRef>,
        reason: String,
    },
}

/// Terminal status of an operation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    /// Operation confirmed as applied
    Succeeded,
    /// Operation rejected before submission or failed on chain
    Failed,
    /// Caller abandoned the operation
    Cancelled,
}

/// Kind of failure recorded on an outcome
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// Rejected before submission
    Invocation,
    /// Submitted but the chain reported failure
    Confirmation,
    /// Abandoned by the caller
    Cancelled,
}

/// Error detail attached to a failed or cancelled outcome
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutcomeError {
    pub kind: FailureKind,
    pub message: String,
}

/// Result of one operation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OperationOutcome {
    /// Position in the request
    pub index: usize,
    /// Entrypoint name
    #[serde(rename = "operationName")]
    pub operation_name: String,
    /// Operation hash, absent if never submitted
    #[serde(rename = "opHash")]
    pub op_hash: Option<String>,
    /// Terminal status
    pub status: OperationStatus,
    /// Including block, if any
    pub block: Option<BlockRef>,
    /// Error detail for failed or cancelled operations
    pub error: Option<OutcomeError>,
    /// Time the terminal state was reached
    #[serde(rename = "completedAt")]
    pub completed_at: DateTime<Utc>,
}

/// Overall status of a pipeline run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PipelineStatus {
    /// Every operation succeeded
    AllSucceeded,
    /// The run stopped at the given index
    FailedAt { index: usize },
}

/// Aggregate result of a pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Run identifier
    #[serde(rename = "runId")]
    pub run_id: RunId,
    /// Target contract address
    pub contract: String,
    /// Outcomes in request order
    pub outcomes: Vec<OperationOutcome>,
    /// Overall status
    pub status: PipelineStatus,
    /// Run start timestamp
    #[serde(rename = "startedAt")]
    pub started_at: DateTime<Utc>,
    /// Run finish timestamp
    #[serde(rename = "finishedAt")]
    pub finished_at: DateTime<Utc>,
}

impl OperationDescriptor {
    /// Create a new descriptor
    pub fn new(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

impl PipelineRequest {
    /// Create a new request
    pub fn new(contract: impl Into<String>, operations: Vec<OperationDescriptor>) -> Self {
        Self {
            contract: contract.into(),
            operations,
        }
    }

    /// Number of operations in the request
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Check if the request has no operations
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

impl PendingOperation {
    /// Create a pending operation submitted now
    pub fn new(op_hash: impl Into<String>, entrypoint: impl Into<String>) -> Self {
        Self {
            op_hash: op_hash.into(),
            entrypoint: entrypoint.into(),
            submitted_at: Utc::now(),
        }
    }
}

impl OperationOutcome {
    /// Outcome of an operation confirmed by the chain client
    pub fn confirmed(index: usize, pending: &PendingOperation, confirmation: Confirmation) -> Self {
        let (status, block, error) = match confirmation {
            Confirmation::Applied { block } => (OperationStatus::Succeeded, Some(block), None),
            Confirmation::Failed { block, reason } => (
                OperationStatus::Failed,
                block,
                Some(OutcomeError {
                    kind: FailureKind::Confirmation,
                    message: reason,
                }),
            ),
        };

        Self {
            index,
            operation_name: pending.entrypoint.clone(),
            op_hash: Some(pending.op_hash.clone()),
            status,
            block,
            error,
            completed_at: Utc::now(),
        }
    }

    /// Outcome of an operation that could not be confirmed
    pub fn unconfirmed(index: usize, pending: &PendingOperation, message: String) -> Self {
        Self {
            index,
            operation_name: pending.entrypoint.clone(),
            op_hash: Some(pending.op_hash.clone()),
            status: OperationStatus::Failed,
            block: None,
            error: Some(OutcomeError {
                kind: FailureKind::Confirmation,
                message,
            }),
            completed_at: Utc::now(),
        }
    }

    /// Outcome of an operation rejected before submission
    pub fn rejected(index: usize, name: &str, message: String) -> Self {
        Self {
            index,
            operation_name: name.to_string(),
            op_hash: None,
            status: OperationStatus::Failed,
            block: None,
            error: Some(OutcomeError {
                kind: FailureKind::Invocation,
                message,
            }),
            completed_at: Utc::now(),
        }
    }

    /// Outcome of an operation abandoned by the caller
    pub fn cancelled(index: usize, name: &str, op_hash: Option<String>) -> Self {
        Self {
            index,
            operation_name: name.to_string(),
            op_hash,
            status: OperationStatus::Cancelled,
            block: None,
            error: Some(OutcomeError {
                kind: FailureKind::Cancelled,
                message: "cancelled while awaiting confirmation".to_string(),
            }),
            completed_at: Utc::now(),
        }
    }

    /// Check if the operation succeeded
    pub fn is_success(&self) -> bool {
        self.status == OperationStatus::Succeeded
    }
}

impl PipelineResult {
    /// Check if every operation succeeded
    pub fn is_success(&self) -> bool {
        self.status == PipelineStatus::AllSucceeded
    }

    /// Index of the failed operation, if any
    pub fn failed_index(&self) -> Option<usize> {
        match self.status {
            PipelineStatus::AllSucceeded => None,
            PipelineStatus::FailedAt { index } => Some(index),
        }
    }

    /// Outcome of the failed operation, if any
    pub fn failed_outcome(&self) -> Option<&OperationOutcome> {
        self.failed_index().and_then(|i| self.outcomes.get(i))
    }

    /// Run duration in milliseconds
    pub fn duration_ms(&self) -> i64 {
        crate::utils::time_diff_ms(self.started_at, self.finished_at)
    }
}
