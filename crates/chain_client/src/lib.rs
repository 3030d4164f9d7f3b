//! Chain client for submitting contract operations
//!
//! This crate defines the capability the pipeline uses to reach the ledger,
//! with an HTTP implementation backed by a wallet gateway and a scripted
//! in-memory implementation for dry runs.

pub mod gateway;
pub mod stub;
pub mod traits;

pub use gateway::*;
pub use stub::*;
pub use traits::*;
