//! Client counters and latency averages

pub mod counters;

pub use counters::{CounterRegistry, CounterSnapshot, LatencyAverage};
