//! Error types for the Carbon Pipeline system

use thiserror::Error;

/// Main error type for the carbon pipeline system
#[derive(Error, Debug)]
pub enum CarbonPipelineError {
    /// Pipeline run errors raised before any submission
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Chain client errors
    #[error("Chain client error: {0}")]
    Chain(#[from] ChainError),

    /// Request file errors
    #[error("Invalid request: {0}")]
    Request(String),
}

/// Errors that end a pipeline run before anything is submitted
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The request contains no operations
    #[error("Pipeline request contains no operations")]
    EmptyPipeline,

    /// The target contract could not be resolved
    #[error("Could not resolve contract {address}: {reason}")]
    ContractResolution { address: String, reason: String },
}

/// Errors reported by a chain client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// Contract address invalid or unreachable
    #[error("Contract resolution failed for {address}: {reason}")]
    ContractResolution { address: String, reason: String },

    /// Operation rejected before submission
    #[error("Invocation of {entrypoint} rejected: {reason}")]
    Invocation { entrypoint: String, reason: String },

    /// Operation submitted but not confirmed as applied
    #[error("Confirmation of {op_hash} failed: {reason}")]
    Confirmation { op_hash: String, reason: String },

    /// Wallet gateway unavailable or misbehaving
    #[error("Wallet gateway error: {0}")]
    Gateway(String),
}

/// Typed entrypoint argument errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgumentError {
    /// Entrypoint has no typed schema
    #[error("Unknown entrypoint: {0}")]
    UnknownEntrypoint(String),

    /// Arguments do not decode into the entrypoint schema
    #[error("Malformed arguments for {entrypoint}: {message}")]
    Malformed { entrypoint: String, message: String },

    /// Invalid address
    #[error("Invalid address for {field}: {value}")]
    InvalidAddress { field: String, value: String },

    /// Zero amount
    #[error("Amount must be greater than zero for {field}")]
    ZeroAmount { field: String },

    /// Metadata value is not hex-encoded bytes
    #[error("Metadata value for key {key} is not valid hex")]
    InvalidMetadata { key: String },

    /// Argument list is empty
    #[error("Argument list for {entrypoint} is empty")]
    Empty { entrypoint: String },
}

/// Configuration specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File not found
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    /// Validation error
    #[error("Configuration validation error: {field}: {message}")]
    ValidationError { field: String, message: String },

    /// Missing required field
    #[error("Missing required configuration field: {field}")]
    MissingField { field: String },

    /// Invalid value
    #[error("Invalid configuration value for {field}: {value}")]
    InvalidValue { field: String, value: String },
}

impl ArgumentError {
    /// Reject the invocation of `entrypoint` because of these arguments
    pub fn into_invocation_error(self, entrypoint: &str) -> ChainError {
        ChainError::Invocation {
            entrypoint: entrypoint.to_string(),
            reason: self.to_string(),
        }
    }
}

impl ChainError {
    /// Convert a resolution failure into the pipeline-level error
    pub fn into_pipeline_error(self, address: &str) -> PipelineError {
        match self {
            ChainError::ContractResolution { address, reason } => {
                PipelineError::ContractResolution { address, reason }
            }
            other => PipelineError::ContractResolution {
                address: address.to_string(),
                reason: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argument_error_becomes_invocation_error() {
        let err = ArgumentError::Empty {
            entrypoint: "mint".to_string(),
        }
        .into_invocation_error("mint");

        match err {
            ChainError::Invocation { entrypoint, reason } => {
                assert_eq!(entrypoint, "mint");
                assert!(reason.contains("empty"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_field_errors_keep_entrypoint_name() {
        let err = ArgumentError::InvalidAddress {
            field: "owner".to_string(),
            value: "ownerA".to_string(),
        }
        .into_invocation_error("mint");

        assert_eq!(
            err.to_string(),
            "Invocation of mint rejected: Invalid address for owner: ownerA"
        );
    }

    #[test]
    fn test_pipeline_error_wraps_into_top_level_error() {
        let err: CarbonPipelineError = PipelineError::EmptyPipeline.into();
        assert_eq!(
            err.to_string(),
            "Pipeline error: Pipeline request contains no operations"
        );
    }

    #[test]
    fn test_resolution_error_keeps_address() {
        let err = ChainError::Gateway("connection refused".to_string())
            .into_pipeline_error("KT1A9nbXJcQqbtNiBzhrwqmEccDXawJaRbNW");

        match err {
            PipelineError::ContractResolution { address, reason } => {
                assert_eq!(address, "KT1A9nbXJcQqbtNiBzhrwqmEccDXawJaRbNW");
                assert!(reason.contains("connection refused"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
