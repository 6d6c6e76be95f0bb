//! Event logger that writes one structured `tracing` event per lifecycle event

use oplink_core::EventLogger;
use oplink_domain::{CommonLoggingData, ConnectionInfo, FailureReason, QueryLoggingData};
use tracing::{info, warn};

/// Target every event is emitted on, so subscribers can route them apart
/// from diagnostics
pub const EVENT_TARGET: &str = "oplink::events";

/// Successes go out at `info`, failures at `warn`
#[derive(Debug, Clone)]
pub struct TracingEventLogger {
    api_name: String,
}

impl TracingEventLogger {
    pub fn new(api_name: impl Into<String>) -> Self {
        Self { api_name: api_name.into() }
    }
}

impl EventLogger for TracingEventLogger {
    fn log_query_success(&self, data: &QueryLoggingData, conn: &ConnectionInfo<'_>) {
        info!(
            target: EVENT_TARGET,
            api = %self.api_name,
            event = "query_success",
            operation = %data.operation_type(),
            duration_us = data.common.duration_micros(),
            queries = data.queries_executed,
            rows = data.rows_received,
            bytes = data.result_size,
            no_index_used = data.no_index_used,
            query = %data.query,
            endpoint = %conn.endpoint(),
            "Query succeeded"
        );
    }

    fn log_query_failure(
        &self,
        data: &QueryLoggingData,
        reason: FailureReason,
        code: u32,
        message: &str,
        conn: &ConnectionInfo<'_>,
    ) {
        warn!(
            target: EVENT_TARGET,
            api = %self.api_name,
            event = "query_failure",
            operation = %data.operation_type(),
            duration_us = data.common.duration_micros(),
            %reason,
            code,
            error = message,
            query = %data.query,
            endpoint = %conn.endpoint(),
            "Query failed"
        );
    }

    fn log_connection_success(&self, data: &CommonLoggingData, conn: &ConnectionInfo<'_>) {
        info!(
            target: EVENT_TARGET,
            api = %self.api_name,
            event = "connection_success",
            operation = %data.operation_type,
            duration_us = data.duration_micros(),
            ssl_session_reused = conn.ssl_session_reused(),
            endpoint = %conn.endpoint(),
            "Connection opened"
        );
    }

    fn log_connection_failure(
        &self,
        data: &CommonLoggingData,
        reason: FailureReason,
        code: u32,
        message: &str,
        conn: &ConnectionInfo<'_>,
    ) {
        warn!(
            target: EVENT_TARGET,
            api = %self.api_name,
            event = "connection_failure",
            operation = %data.operation_type,
            duration_us = data.duration_micros(),
            %reason,
            code,
            error = message,
            endpoint = %conn.endpoint(),
            "Connection failed"
        );
    }

    fn log_connection_closed(&self, conn: &ConnectionInfo<'_>) {
        info!(
            target: EVENT_TARGET,
            api = %self.api_name,
            event = "connection_closed",
            endpoint = %conn.endpoint(),
            "Connection closed"
        );
    }

    fn api_name(&self) -> &str {
        &self.api_name
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use oplink_domain::{ConnectionKey, OperationType};
    use tracing_subscriber::fmt::MakeWriter;

    use super::*;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn capture(emit: impl FnOnce()) -> String {
        let sink = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(sink.clone())
            .with_ansi(false)
            .with_target(true)
            .with_max_level(tracing::Level::TRACE)
            .finish();
        tracing::subscriber::with_default(subscriber, emit);
        sink.text()
    }

    #[test]
    fn test_query_success_is_info_on_event_target() {
        let logger = TracingEventLogger::new("orders");
        let key = ConnectionKey::new("db1.local", 3306, "shop", "reader", "s3cr3t");
        let data = QueryLoggingData::new(OperationType::Query, Duration::from_micros(5000), "SELECT 1")
            .with_rows_received(1);

        let output = capture(|| logger.log_query_success(&data, &ConnectionInfo::new(&key, None)));

        assert!(output.contains("INFO"));
        assert!(output.contains(EVENT_TARGET));
        assert!(output.contains("event=\"query_success\""));
        assert!(output.contains("duration_us=5000"));
        assert!(output.contains("db1.local"));
        assert!(!output.contains("s3cr3t"), "password must not reach the log: {output}");
    }

    #[test]
    fn test_failure_is_warn_with_reason_and_code() {
        let logger = TracingEventLogger::new("orders");
        let data = CommonLoggingData::new(OperationType::Connect, Duration::from_micros(300));

        let output = capture(|| {
            logger.log_connection_failure(
                &data,
                FailureReason::DatabaseError,
                1045,
                "Access denied",
                &ConnectionInfo::empty(),
            );
        });

        assert!(output.contains("WARN"));
        assert!(output.contains("code=1045"));
        assert!(output.contains("DatabaseError"));
        assert!(output.contains("Access denied"));
    }
}
