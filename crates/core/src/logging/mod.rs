//! Structured event logging
//!
//! [`EventLogger`] is the capability set every sink implements. The core
//! ships the counter-backed [`SimpleLogger`], fan-out and no-op loggers, and
//! the [`EventDispatcher`] that isolates the lifecycle from logger failures.

pub mod composite;
pub mod dispatcher;
pub mod ports;
pub mod simple;

pub use composite::{CompositeLogger, NoOpLogger};
pub use dispatcher::EventDispatcher;
pub use ports::{EventLogger, EventSink};
pub use simple::SimpleLogger;
