//! Port interfaces for event logging
//!
//! These traits define the boundary between the operation lifecycle and the
//! places its events end up (counters, tracing, metrics, files).

use std::fmt;

use async_trait::async_trait;
use oplink_domain::{
    CommonLoggingData, ConnectionInfo, EventRecord, FailureReason, QueryLoggingData, Result,
};

/// Receiver of connection and query lifecycle events
///
/// Calls are synchronous, fire-and-forget and must not block on I/O: an
/// implementation that exports somewhere slow hands the event off (see the
/// channel logger in `oplink-infra`). Implementations never report errors
/// back to the caller; a logging problem must not fail the operation that
/// produced the event.
pub trait EventLogger: Send + Sync + fmt::Debug {
    fn log_query_success(&self, data: &QueryLoggingData, conn: &ConnectionInfo<'_>);

    fn log_query_failure(
        &self,
        data: &QueryLoggingData,
        reason: FailureReason,
        code: u32,
        message: &str,
        conn: &ConnectionInfo<'_>,
    );

    fn log_connection_success(&self, data: &CommonLoggingData, conn: &ConnectionInfo<'_>);

    fn log_connection_failure(
        &self,
        data: &CommonLoggingData,
        reason: FailureReason,
        code: u32,
        message: &str,
        conn: &ConnectionInfo<'_>,
    );

    /// A connection was returned or torn down
    fn log_connection_closed(&self, _conn: &ConnectionInfo<'_>) {}

    /// Name of the client API this logger reports for
    fn api_name(&self) -> &str;
}

/// Destination for exported event records
///
/// Driven off the hot path by an exporter task, so implementations may do
/// I/O.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Persist or forward a batch of records
    async fn export(&self, records: &[EventRecord]) -> Result<()>;

    /// Flush anything buffered
    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Short identifier used in diagnostics
    fn name(&self) -> &str;
}
