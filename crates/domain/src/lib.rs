//! # oplink Domain
//!
//! Value types shared by every oplink crate.
//!
//! This crate contains:
//! - Operation classification (`OperationType`, `FailureReason`)
//! - Connection identity and context (`ConnectionKey`, `ConnectionContext`)
//! - Event records handed to loggers and sinks
//! - Error types and Result definitions
//! - Configuration structures and constants
//!
//! ## Architecture
//! - No dependencies on other oplink crates
//! - Only external dependencies allowed

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
