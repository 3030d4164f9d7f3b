//! Sequential on-chain transaction pipeline
//!
//! Runs an ordered list of contract operations against one contract through a
//! [`chain_client::ChainClient`], confirming each operation before submitting
//! the next and stopping at the first one that does not succeed.

pub mod runner;
pub mod workflows;

pub use runner::*;
pub use workflows::Workflow;
