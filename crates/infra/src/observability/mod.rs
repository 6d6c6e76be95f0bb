//! Observability infrastructure: diagnostic logging setup and event sinks
//!
//! Two separate streams leave a client:
//!
//! 1. **Diagnostics**: `tracing` output from the workspace itself, installed
//!    by [`logging::init`].
//! 2. **Operation events**: query and connection outcomes reported through
//!    [`oplink_core::EventLogger`] implementations in [`sinks`].
//!
//! Event loggers never block the caller and never fail the operation that
//! produced the event; slow destinations go through the export channel.

pub mod logging;
pub mod sinks;
