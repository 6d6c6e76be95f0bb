//! Error types used throughout the workspace

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::connection::ConnectionKey;
use crate::types::operation::FailureReason;

/// Main error type for configuration and infrastructure plumbing
#[derive(Error, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum OplinkError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for oplink plumbing
pub type Result<T> = std::result::Result<T, OplinkError>;

/// Terminal failure of an asynchronous operation
///
/// This is what an operation future resolves with when the operation did not
/// succeed. Callers branch on [`OperationError::reason`]; `code` carries the
/// backend-specific error number (0 when the failure did not come from the
/// backend).
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{reason} (code {code}): {message}")]
pub struct OperationError {
    /// Why the operation did not succeed
    pub reason: FailureReason,
    /// Backend error number
    pub code: u32,
    /// Human-readable diagnostic
    pub message: String,
    /// Connection the operation ran against, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_key: Option<ConnectionKey>,
    /// Time between operation start and failure
    #[serde(default, with = "crate::utils::serde::duration_micros")]
    pub elapsed: Duration,
}

impl OperationError {
    /// Create an error with the given reason and message
    pub fn new(reason: FailureReason, code: u32, message: impl Into<String>) -> Self {
        Self { reason, code, message: message.into(), connection_key: None, elapsed: Duration::ZERO }
    }

    /// Caller misused the API before any backend activity
    pub fn bad_usage(message: impl Into<String>) -> Self {
        Self::new(FailureReason::BadUsage, 0, message)
    }

    /// Operation missed its deadline
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(FailureReason::Timeout, 0, message)
    }

    /// Operation was cancelled by its caller or by shutdown
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(FailureReason::Cancelled, 0, message)
    }

    /// Backend rejected or failed the operation
    pub fn database(code: u32, message: impl Into<String>) -> Self {
        Self::new(FailureReason::DatabaseError, code, message)
    }

    /// Attach the connection the operation ran against
    pub fn with_connection_key(mut self, key: ConnectionKey) -> Self {
        self.connection_key = Some(key);
        self
    }

    /// Attach the elapsed time at failure
    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }

    /// Whether the operation was cancelled
    pub fn is_cancelled(&self) -> bool {
        self.reason == FailureReason::Cancelled
    }

    /// Whether the operation timed out
    pub fn is_timeout(&self) -> bool {
        self.reason == FailureReason::Timeout
    }
}

/// Result of a single asynchronous operation
pub type OperationResult<T> = std::result::Result<T, OperationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_error_display() {
        let err = OperationError::database(1045, "Access denied");
        assert_eq!(err.to_string(), "DatabaseError (code 1045): Access denied");
    }

    #[test]
    fn test_reason_predicates_are_distinct() {
        let cancelled = OperationError::cancelled("shutdown");
        let timeout = OperationError::timeout("deadline exceeded");

        assert!(cancelled.is_cancelled());
        assert!(!cancelled.is_timeout());
        assert!(timeout.is_timeout());
        assert!(!timeout.is_cancelled());
        assert_ne!(cancelled.reason, timeout.reason);
    }

    #[test]
    fn test_builder_attaches_context() {
        let key = ConnectionKey::new("db1.local", 3306, "shop", "reader", "secret");
        let err = OperationError::bad_usage("empty query")
            .with_connection_key(key.clone())
            .with_elapsed(Duration::from_micros(250));

        assert_eq!(err.connection_key, Some(key));
        assert_eq!(err.elapsed, Duration::from_micros(250));
        assert_eq!(err.reason, FailureReason::BadUsage);
    }

    #[test]
    fn test_serialized_error_omits_password() {
        let key = ConnectionKey::new("db1.local", 3306, "shop", "reader", "hunter2");
        let err = OperationError::database(2013, "Lost connection").with_connection_key(key);

        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"reason\":\"DatabaseError\""));
        assert!(json.contains("db1.local"));
        assert!(!json.contains("hunter2"));
    }

    #[test]
    fn test_oplink_error_serialization_shape() {
        let err = OplinkError::Config("missing api name".into());
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, r#"{"type":"Config","message":"missing api name"}"#);
    }
}
