//! Counter-backed logger

use std::sync::Arc;

use oplink_domain::{CommonLoggingData, ConnectionInfo, FailureReason, QueryLoggingData};
use tracing::{debug, info};

use super::ports::EventLogger;
use crate::metrics::CounterRegistry;

/// Logger that keeps the shared [`CounterRegistry`] up to date
///
/// Every event bumps the matching counter and feeds its duration into the
/// per-operation-kind latency average, successes and failures alike. Each
/// event also produces one `debug` line.
#[derive(Debug, Clone)]
pub struct SimpleLogger {
    api_name: String,
    counters: Arc<CounterRegistry>,
}

impl SimpleLogger {
    pub fn new(api_name: impl Into<String>, counters: Arc<CounterRegistry>) -> Self {
        Self { api_name: api_name.into(), counters }
    }

    pub fn counters(&self) -> &Arc<CounterRegistry> {
        &self.counters
    }

    /// Render the stats report and log it at `info`
    pub fn print_stats(&self) -> String {
        let report = self.counters.printable_report();
        info!(api = %self.api_name, "{report}");
        report
    }
}

impl EventLogger for SimpleLogger {
    fn log_query_success(&self, data: &QueryLoggingData, conn: &ConnectionInfo<'_>) {
        self.counters.increment_succeeded_queries();
        self.counters.record_latency(data.operation_type(), data.common.duration_micros());
        debug!(
            api = %self.api_name,
            operation = %data.operation_type(),
            duration_us = data.common.duration_micros(),
            queries = data.queries_executed,
            rows = data.rows_received,
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
        self.counters.increment_failed_queries();
        self.counters.record_latency(data.operation_type(), data.common.duration_micros());
        debug!(
            api = %self.api_name,
            operation = %data.operation_type(),
            duration_us = data.common.duration_micros(),
            %reason,
            code,
            error = message,
            endpoint = %conn.endpoint(),
            "Query failed"
        );
    }

    fn log_connection_success(&self, data: &CommonLoggingData, conn: &ConnectionInfo<'_>) {
        self.counters.increment_opened_connections();
        if conn.ssl_session_reused() {
            self.counters.increment_reused_ssl_sessions();
        }
        self.counters.record_latency(data.operation_type, data.duration_micros());
        debug!(
            api = %self.api_name,
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
        self.counters.increment_failed_connections();
        self.counters.record_latency(data.operation_type, data.duration_micros());
        debug!(
            api = %self.api_name,
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
        self.counters.increment_closed_connections();
        debug!(api = %self.api_name, endpoint = %conn.endpoint(), "Connection closed");
    }

    fn api_name(&self) -> &str {
        &self.api_name
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use oplink_domain::{BasicConnectionContext, ConnectionKey, OperationType};

    use super::*;

    fn logger() -> SimpleLogger {
        SimpleLogger::new("test-api", Arc::new(CounterRegistry::new(0.5).unwrap()))
    }

    #[test]
    fn test_connection_events_update_counters() {
        let logger = logger();
        let key = ConnectionKey::new("db1.local", 3306, "shop", "reader", "pw");
        let resumed = BasicConnectionContext::new().with_ssl(true);
        let fresh = BasicConnectionContext::new().with_ssl(false);
        let data = CommonLoggingData::new(OperationType::Connect, Duration::from_micros(900));

        logger.log_connection_success(&data, &ConnectionInfo::new(&key, Some(&resumed)));
        logger.log_connection_success(&data, &ConnectionInfo::new(&key, Some(&fresh)));
        logger.log_connection_failure(
            &data,
            FailureReason::Timeout,
            0,
            "connect timed out",
            &ConnectionInfo::new(&key, None),
        );
        logger.log_connection_closed(&ConnectionInfo::new(&key, None));

        let counters = logger.counters();
        assert_eq!(counters.opened_connections(), 2);
        assert_eq!(counters.reused_ssl_sessions(), 1);
        assert_eq!(counters.failed_connections(), 1);
        assert_eq!(counters.closed_connections(), 1);
        assert_eq!(counters.latency_average(OperationType::Connect), Some(900.0));
    }

    #[test]
    fn test_query_events_feed_latency() {
        let logger = logger();
        for micros in [10, 20, 30] {
            let data =
                QueryLoggingData::new(OperationType::Query, Duration::from_micros(micros), "SELECT 1");
            logger.log_query_success(&data, &ConnectionInfo::empty());
        }
        assert_eq!(logger.counters().succeeded_queries(), 3);
        assert_eq!(logger.counters().latency_average(OperationType::Query), Some(22.5));
    }

    #[test]
    fn test_print_stats_returns_report() {
        let logger = logger();
        let data = QueryLoggingData::new(OperationType::Query, Duration::ZERO, "SELECT 1");
        logger.log_query_failure(&data, FailureReason::BadUsage, 0, "empty", &ConnectionInfo::empty());

        let report = logger.print_stats();
        assert!(report.starts_with("Client Stats\n"));
        assert!(report.contains("Failed Queries 1\n"));
        assert_eq!(logger.api_name(), "test-api");
    }
}
