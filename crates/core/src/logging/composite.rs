//! Fan-out and no-op loggers

use std::sync::Arc;

use oplink_domain::{CommonLoggingData, ConnectionInfo, FailureReason, QueryLoggingData};

use super::ports::EventLogger;

/// Forwards every event to each inner logger, in insertion order
#[derive(Debug, Clone)]
pub struct CompositeLogger {
    api_name: String,
    loggers: Vec<Arc<dyn EventLogger>>,
}

impl CompositeLogger {
    pub fn new(api_name: impl Into<String>) -> Self {
        Self { api_name: api_name.into(), loggers: Vec::new() }
    }

    pub fn with_logger(mut self, logger: Arc<dyn EventLogger>) -> Self {
        self.loggers.push(logger);
        self
    }

    pub fn len(&self) -> usize {
        self.loggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loggers.is_empty()
    }
}

impl EventLogger for CompositeLogger {
    fn log_query_success(&self, data: &QueryLoggingData, conn: &ConnectionInfo<'_>) {
        for logger in &self.loggers {
            logger.log_query_success(data, conn);
        }
    }

    fn log_query_failure(
        &self,
        data: &QueryLoggingData,
        reason: FailureReason,
        code: u32,
        message: &str,
        conn: &ConnectionInfo<'_>,
    ) {
        for logger in &self.loggers {
            logger.log_query_failure(data, reason, code, message, conn);
        }
    }

    fn log_connection_success(&self, data: &CommonLoggingData, conn: &ConnectionInfo<'_>) {
        for logger in &self.loggers {
            logger.log_connection_success(data, conn);
        }
    }

    fn log_connection_failure(
        &self,
        data: &CommonLoggingData,
        reason: FailureReason,
        code: u32,
        message: &str,
        conn: &ConnectionInfo<'_>,
    ) {
        for logger in &self.loggers {
            logger.log_connection_failure(data, reason, code, message, conn);
        }
    }

    fn log_connection_closed(&self, conn: &ConnectionInfo<'_>) {
        for logger in &self.loggers {
            logger.log_connection_closed(conn);
        }
    }

    fn api_name(&self) -> &str {
        &self.api_name
    }
}

/// Discards every event
#[derive(Debug, Clone, Default)]
pub struct NoOpLogger {
    api_name: String,
}

impl NoOpLogger {
    pub fn new(api_name: impl Into<String>) -> Self {
        Self { api_name: api_name.into() }
    }
}

impl EventLogger for NoOpLogger {
    fn log_query_success(&self, _data: &QueryLoggingData, _conn: &ConnectionInfo<'_>) {}

    fn log_query_failure(
        &self,
        _data: &QueryLoggingData,
        _reason: FailureReason,
        _code: u32,
        _message: &str,
        _conn: &ConnectionInfo<'_>,
    ) {
    }

    fn log_connection_success(&self, _data: &CommonLoggingData, _conn: &ConnectionInfo<'_>) {}

    fn log_connection_failure(
        &self,
        _data: &CommonLoggingData,
        _reason: FailureReason,
        _code: u32,
        _message: &str,
        _conn: &ConnectionInfo<'_>,
    ) {
    }

    fn api_name(&self) -> &str {
        &self.api_name
    }
}
