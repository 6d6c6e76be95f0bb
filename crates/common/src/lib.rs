//! Leaf utilities shared across oplink crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: metric primitives and their error types
//! - `observability`: `tracing` diagnostics from the primitives
//! - `serde`: serialization of metric snapshots

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod observability;

// Re-export commonly used types for convenience
// ------------------------
#[cfg(feature = "foundation")]
pub use observability::{AtomicCounter, MetricsError, MetricsResult, RollingAverage};
