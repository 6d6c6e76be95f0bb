//! Metric accumulators
//!
//! Thread-safe counters and single-writer averages.

pub mod counter;
pub mod rolling_average;

// Re-export metric types for convenience
pub use counter::AtomicCounter;
pub use rolling_average::RollingAverage;
