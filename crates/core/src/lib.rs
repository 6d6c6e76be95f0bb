//! # oplink Core
//!
//! Completion bridging and lifecycle accounting - no I/O.
//!
//! This crate contains:
//! - The single-fire [`Operation`] contract and an in-process implementation
//! - The operation-to-future adapter
//! - Client counters with per-operation-kind latency averages
//! - The event logging ports and the loggers that need no infrastructure
//!
//! ## Architecture Principles
//! - Depends only on `oplink-common` and `oplink-domain`
//! - Exporters, config loading and subscriber setup live in `oplink-infra`
//! - All sinks plug in through [`EventLogger`] / [`EventSink`]

pub mod logging;
pub mod metrics;
pub mod operation;

pub use logging::{
    CompositeLogger, EventDispatcher, EventLogger, EventSink, NoOpLogger, SimpleLogger,
};
pub use metrics::{CounterRegistry, CounterSnapshot, LatencyAverage};
pub use operation::{
    adapt, to_future, to_future_ref, AsyncOperation, CompletionObserver, IntoOperationFuture,
    Operation, OperationFuture, OperationState, QueryProgress,
};
