//! Shared types for the Carbon Pipeline system
//!
//! This crate contains the domain types shared by the chain client, the
//! pipeline runner and the command-line interface.

pub mod entrypoint;
pub mod error;
pub mod gateway;
pub mod operation;
pub mod utils;

// Re-export commonly used types
pub use entrypoint::*;
pub use error::{ArgumentError, CarbonPipelineError, ChainError, ConfigError, PipelineError};
pub use gateway::*;
pub use operation::*;
