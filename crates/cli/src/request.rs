//! Request file loading

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use types::{CarbonPipelineError, OperationDescriptor, PipelineRequest};

/// On-disk request format (YAML or JSON)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestFile {
    /// Target contract, overrides the configured default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract: Option<String>,
    /// Operations in submission order
    #[serde(default)]
    pub operations: Vec<OperationDescriptor>,
}

impl RequestFile {
    /// Parse a request file from YAML or JSON text
    pub fn parse(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| CarbonPipelineError::Request(e.to_string()))
            .context("Failed to parse request file")
    }

    /// Read and parse a request file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read request file {}", path.display()))?;
        Self::parse(&content)
    }

    /// Build the pipeline request.
    ///
    /// The contract comes from the command line first, then the file, then the
    /// configured default.
    pub fn into_request(self, cli_contract: Option<&str>, default_contract: &str) -> PipelineRequest {
        let contract = cli_contract
            .map(str::to_string)
            .or(self.contract)
            .unwrap_or_else(|| default_contract.to_string());
        PipelineRequest::new(contract, self.operations)
    }
}

impl From<PipelineRequest> for RequestFile {
    fn from(request: PipelineRequest) -> Self {
        Self {
            contract: Some(request.contract),
            operations: request.operations,
        }
    }
}
