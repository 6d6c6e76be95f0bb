//! Operation classification types
//!
//! Every event the logging pipeline sees is tagged with the kind of
//! asynchronous activity that produced it, and every failure with the reason
//! it did not succeed.

use serde::{Deserialize, Serialize};

use crate::impl_label_conversions;

/// Kind of asynchronous activity that produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum OperationType {
    #[default]
    None = 0,
    Query = 1,
    MultiQuery = 2,
    MultiQueryStream = 3,
    Connect = 4,
    PoolConnect = 5,
    Locator = 6,
    TestDatabase = 7,
}

impl_label_conversions!(OperationType {
    None => "None",
    Query => "Query",
    MultiQuery => "MultiQuery",
    MultiQueryStream => "MultiQueryStream",
    Connect => "Connect",
    PoolConnect => "PoolConnect",
    Locator => "Locator",
    TestDatabase => "TestDatabase",
});

impl OperationType {
    /// Number of operation kinds
    pub const COUNT: usize = Self::ALL.len();

    /// Dense index in `0..COUNT`, usable for per-kind arrays
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Whether this kind establishes a connection rather than running SQL
    pub const fn is_connection(self) -> bool {
        matches!(self, Self::Connect | Self::PoolConnect)
    }
}

/// Mutually exclusive classification of why an operation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum FailureReason {
    /// Caller misused the API before any backend activity
    BadUsage = 0,
    /// Operation did not complete within its deadline
    Timeout = 1,
    /// Explicitly cancelled by the caller or by shutdown
    Cancelled = 2,
    /// Backend rejected or failed the operation
    DatabaseError = 3,
}

impl_label_conversions!(FailureReason {
    BadUsage => "BadUsage",
    Timeout => "Timeout",
    Cancelled => "Cancelled",
    DatabaseError => "DatabaseError",
});
