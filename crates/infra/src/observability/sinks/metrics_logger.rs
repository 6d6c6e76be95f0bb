//! Event logger backed by the `metrics` facade
//!
//! Emits counters and histograms through whatever recorder is installed. A
//! Prometheus recorder can be installed with [`install_prometheus_recorder`].
//!
//! | Metric | Kind | Labels |
//! |---|---|---|
//! | `<prefix>_queries_total` | counter | api, operation, outcome |
//! | `<prefix>_query_failures_total` | counter | api, reason |
//! | `<prefix>_query_duration_seconds` | histogram | api, operation |
//! | `<prefix>_query_rows_total` | counter | api |
//! | `<prefix>_connections_total` | counter | api, outcome |
//! | `<prefix>_connection_failures_total` | counter | api, reason |
//! | `<prefix>_connection_duration_seconds` | histogram | api |
//! | `<prefix>_connections_closed_total` | counter | api |
//! | `<prefix>_ssl_sessions_reused_total` | counter | api |

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use oplink_core::EventLogger;
use oplink_domain::{
    CommonLoggingData, ConnectionInfo, FailureReason, OplinkError, QueryLoggingData, Result,
};

const OUTCOME_SUCCESS: &str = "success";
const OUTCOME_FAILURE: &str = "failure";

/// Full metric names for one prefix, built once
#[derive(Debug, Clone)]
struct MetricNames {
    queries: String,
    query_failures: String,
    query_duration: String,
    query_rows: String,
    connections: String,
    connection_failures: String,
    connection_duration: String,
    connections_closed: String,
    ssl_reused: String,
}

impl MetricNames {
    fn new(prefix: &str) -> Self {
        Self {
            queries: format!("{prefix}_queries_total"),
            query_failures: format!("{prefix}_query_failures_total"),
            query_duration: format!("{prefix}_query_duration_seconds"),
            query_rows: format!("{prefix}_query_rows_total"),
            connections: format!("{prefix}_connections_total"),
            connection_failures: format!("{prefix}_connection_failures_total"),
            connection_duration: format!("{prefix}_connection_duration_seconds"),
            connections_closed: format!("{prefix}_connections_closed_total"),
            ssl_reused: format!("{prefix}_ssl_sessions_reused_total"),
        }
    }
}

/// Logger that turns lifecycle events into metrics
#[derive(Debug, Clone)]
pub struct MetricsEventLogger {
    api_name: String,
    names: MetricNames,
}

impl MetricsEventLogger {
    pub fn new(api_name: impl Into<String>, prefix: &str) -> Self {
        Self { api_name: api_name.into(), names: MetricNames::new(prefix) }
    }

    /// Register help text and units with the installed recorder
    pub fn describe(&self) {
        let n = &self.names;
        describe_counter!(n.queries.clone(), "Completed queries by outcome");
        describe_counter!(n.query_failures.clone(), "Failed queries by failure reason");
        describe_histogram!(n.query_duration.clone(), Unit::Seconds, "Query latency");
        describe_counter!(n.query_rows.clone(), "Rows received by successful queries");
        describe_counter!(n.connections.clone(), "Connection attempts by outcome");
        describe_counter!(n.connection_failures.clone(), "Failed connections by failure reason");
        describe_histogram!(n.connection_duration.clone(), Unit::Seconds, "Connect latency");
        describe_counter!(n.connections_closed.clone(), "Connections closed");
        describe_counter!(n.ssl_reused.clone(), "Connections that resumed a TLS session");
    }

    fn record_query(&self, data: &QueryLoggingData, outcome: &'static str) {
        let operation = data.operation_type().as_str();
        counter!(
            self.names.queries.clone(),
            "api" => self.api_name.clone(),
            "operation" => operation,
            "outcome" => outcome
        )
        .increment(1);
        histogram!(
            self.names.query_duration.clone(),
            "api" => self.api_name.clone(),
            "operation" => operation
        )
        .record(data.duration().as_secs_f64());
    }

    fn record_connection(&self, data: &CommonLoggingData, outcome: &'static str) {
        counter!(self.names.connections.clone(), "api" => self.api_name.clone(), "outcome" => outcome)
            .increment(1);
        histogram!(self.names.connection_duration.clone(), "api" => self.api_name.clone())
            .record(data.duration.as_secs_f64());
    }
}

impl EventLogger for MetricsEventLogger {
    fn log_query_success(&self, data: &QueryLoggingData, _conn: &ConnectionInfo<'_>) {
        self.record_query(data, OUTCOME_SUCCESS);
        counter!(self.names.query_rows.clone(), "api" => self.api_name.clone())
            .increment(data.rows_received);
    }

    fn log_query_failure(
        &self,
        data: &QueryLoggingData,
        reason: FailureReason,
        _code: u32,
        _message: &str,
        _conn: &ConnectionInfo<'_>,
    ) {
        self.record_query(data, OUTCOME_FAILURE);
        counter!(
            self.names.query_failures.clone(),
            "api" => self.api_name.clone(),
            "reason" => reason.as_str()
        )
        .increment(1);
    }

    fn log_connection_success(&self, data: &CommonLoggingData, conn: &ConnectionInfo<'_>) {
        self.record_connection(data, OUTCOME_SUCCESS);
        if conn.ssl_session_reused() {
            counter!(self.names.ssl_reused.clone(), "api" => self.api_name.clone()).increment(1);
        }
    }

    fn log_connection_failure(
        &self,
        data: &CommonLoggingData,
        reason: FailureReason,
        _code: u32,
        _message: &str,
        _conn: &ConnectionInfo<'_>,
    ) {
        self.record_connection(data, OUTCOME_FAILURE);
        counter!(
            self.names.connection_failures.clone(),
            "api" => self.api_name.clone(),
            "reason" => reason.as_str()
        )
        .increment(1);
    }

    fn log_connection_closed(&self, _conn: &ConnectionInfo<'_>) {
        counter!(self.names.connections_closed.clone(), "api" => self.api_name.clone()).increment(1);
    }

    fn api_name(&self) -> &str {
        &self.api_name
    }
}

/// Install a process-wide Prometheus recorder and describe the metrics
/// `logger` emits
///
/// The returned handle renders the exposition text; serving it is up to the
/// caller.
///
/// # Errors
/// Returns `OplinkError::Internal` if a global recorder is already installed.
pub fn install_prometheus_recorder(logger: &MetricsEventLogger) -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| OplinkError::Internal(format!("Failed to install Prometheus recorder: {e}")))?;
    logger.describe();
    tracing::info!(api = %logger.api_name, "Prometheus recorder installed");
    Ok(handle)
}
