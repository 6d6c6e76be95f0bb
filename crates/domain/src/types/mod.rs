//! Domain types and models

pub mod connection;
pub mod logging;
pub mod operation;

pub use connection::{
    BasicConnectionContext, ConnectionContext, ConnectionInfo, ConnectionKey, ConnectionSnapshot,
};
pub use logging::{
    CommonLoggingData, EventKind, EventPayload, EventRecord, FailureDetails, QueryLoggingData,
};
pub use operation::{FailureReason, OperationType};
