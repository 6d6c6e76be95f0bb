//! Event record types
//!
//! Immutable values describing one completed connection attempt or query.
//! Loggers receive the borrowed forms ([`CommonLoggingData`],
//! [`QueryLoggingData`]) on the hot path; sinks that export asynchronously
//! receive an owned [`EventRecord`].

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::connection::{ConnectionInfo, ConnectionSnapshot};
use crate::types::operation::{FailureReason, OperationType};
use crate::utils::serde::duration_micros;

/// Fields shared by every event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonLoggingData {
    pub operation_type: OperationType,
    #[serde(with = "duration_micros")]
    pub duration: Duration,
}

impl CommonLoggingData {
    pub fn new(operation_type: OperationType, duration: Duration) -> Self {
        Self { operation_type, duration }
    }

    /// Duration in whole microseconds, saturating
    pub fn duration_micros(&self) -> u64 {
        u64::try_from(self.duration.as_micros()).unwrap_or(u64::MAX)
    }
}

/// Logging data for one completed query (or batch of queries)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryLoggingData {
    #[serde(flatten)]
    pub common: CommonLoggingData,
    pub queries_executed: u32,
    pub query: String,
    pub rows_received: u64,
    pub result_size: u64,
    pub no_index_used: bool,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub query_attributes: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub response_attributes: HashMap<String, String>,
}

impl QueryLoggingData {
    /// Query data with no rows, no attributes and one executed statement
    pub fn new(operation_type: OperationType, duration: Duration, query: impl Into<String>) -> Self {
        Self {
            common: CommonLoggingData::new(operation_type, duration),
            queries_executed: 1,
            query: query.into(),
            rows_received: 0,
            result_size: 0,
            no_index_used: false,
            query_attributes: HashMap::new(),
            response_attributes: HashMap::new(),
        }
    }

    pub fn with_queries_executed(mut self, queries: u32) -> Self {
        self.queries_executed = queries;
        self
    }

    pub fn with_rows_received(mut self, rows: u64) -> Self {
        self.rows_received = rows;
        self
    }

    pub fn with_result_size(mut self, bytes: u64) -> Self {
        self.result_size = bytes;
        self
    }

    pub fn with_no_index_used(mut self, no_index_used: bool) -> Self {
        self.no_index_used = no_index_used;
        self
    }

    pub fn with_query_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_response_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.response_attributes.insert(key.into(), value.into());
        self
    }

    pub fn operation_type(&self) -> OperationType {
        self.common.operation_type
    }

    pub fn duration(&self) -> Duration {
        self.common.duration
    }
}

/// Which logger capability produced a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    QuerySuccess,
    QueryFailure,
    ConnectionSuccess,
    ConnectionFailure,
    ConnectionClosed,
}

impl EventKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::QuerySuccess => "query_success",
            Self::QueryFailure => "query_failure",
            Self::ConnectionSuccess => "connection_success",
            Self::ConnectionFailure => "connection_failure",
            Self::ConnectionClosed => "connection_closed",
        }
    }

    pub const fn is_failure(self) -> bool {
        matches!(self, Self::QueryFailure | Self::ConnectionFailure)
    }
}

/// Why a logged operation failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDetails {
    pub reason: FailureReason,
    pub code: u32,
    pub message: String,
}

/// Payload of an exported event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "payload", rename_all = "snake_case")]
pub enum EventPayload {
    Query(QueryLoggingData),
    Connection(CommonLoggingData),
}

impl EventPayload {
    pub fn common(&self) -> &CommonLoggingData {
        match self {
            Self::Query(data) => &data.common,
            Self::Connection(data) => data,
        }
    }
}

/// Owned, serializable snapshot of one logged event
///
/// Built when an event has to leave the caller's stack, e.g. when it is
/// queued for asynchronous export. The connection context is copied at
/// construction so the record stays valid after the connection is recycled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub api_name: String,
    pub kind: EventKind,
    #[serde(flatten)]
    pub payload: EventPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureDetails>,
    pub connection: ConnectionSnapshot,
}

impl EventRecord {
    fn build(
        api_name: &str,
        kind: EventKind,
        payload: EventPayload,
        failure: Option<FailureDetails>,
        conn: &ConnectionInfo<'_>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            recorded_at: Utc::now(),
            api_name: api_name.to_string(),
            kind,
            payload,
            failure,
            connection: ConnectionSnapshot::capture(conn),
        }
    }

    pub fn query_success(api_name: &str, data: &QueryLoggingData, conn: &ConnectionInfo<'_>) -> Self {
        Self::build(api_name, EventKind::QuerySuccess, EventPayload::Query(data.clone()), None, conn)
    }

    pub fn query_failure(
        api_name: &str,
        data: &QueryLoggingData,
        failure: FailureDetails,
        conn: &ConnectionInfo<'_>,
    ) -> Self {
        Self::build(
            api_name,
            EventKind::QueryFailure,
            EventPayload::Query(data.clone()),
            Some(failure),
            conn,
        )
    }

    pub fn connection_success(
        api_name: &str,
        data: &CommonLoggingData,
        conn: &ConnectionInfo<'_>,
    ) -> Self {
        Self::build(api_name, EventKind::ConnectionSuccess, EventPayload::Connection(*data), None, conn)
    }

    pub fn connection_failure(
        api_name: &str,
        data: &CommonLoggingData,
        failure: FailureDetails,
        conn: &ConnectionInfo<'_>,
    ) -> Self {
        Self::build(
            api_name,
            EventKind::ConnectionFailure,
            EventPayload::Connection(*data),
            Some(failure),
            conn,
        )
    }

    pub fn connection_closed(api_name: &str, conn: &ConnectionInfo<'_>) -> Self {
        Self::build(
            api_name,
            EventKind::ConnectionClosed,
            EventPayload::Connection(CommonLoggingData::new(OperationType::None, Duration::ZERO)),
            None,
            conn,
        )
    }

    pub fn operation_type(&self) -> OperationType {
        self.payload.common().operation_type
    }

    pub fn duration(&self) -> Duration {
        self.payload.common().duration
    }
}
