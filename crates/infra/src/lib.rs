//! # oplink infrastructure
//!
//! Implementations of the core ports that touch the outside world.
//!
//! This crate contains:
//! - Configuration loading from the environment, `.env` and TOML/JSON files
//! - `tracing` subscriber installation
//! - Event sinks: tracing, `metrics`/Prometheus, channel export, JSON lines
//! - Conversions from external errors into domain errors
//!
//! ## Architecture
//! - Implements traits defined in `oplink-core`
//! - Depends on `oplink-domain` and `oplink-common`
//! - Contains all "impure" code (I/O, global subscribers and recorders)

pub mod config;
pub mod errors;
pub mod observability;

// Re-export commonly used items
pub use errors::InfraError;
pub use observability::sinks::{
    install_prometheus_recorder, ChannelEventLogger, EventExporter, ExportStats, JsonLinesSink,
    MetricsEventLogger, TelemetryPipeline, TracingEventLogger,
};
