//! Observability primitives - metric accumulators and their errors
//!
//! These are the building blocks the client counters are made of. They carry
//! no global state and perform no I/O; exporting is done further up the stack.

pub mod errors;
pub mod metrics;

// Re-export commonly used types for convenience
pub use errors::{MetricsError, MetricsResult};
pub use metrics::{AtomicCounter, RollingAverage};
