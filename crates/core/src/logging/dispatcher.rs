//! Panic-isolating event dispatch
//!
//! The dispatcher is what the operation lifecycle talks to. It forwards each
//! event to the configured logger and guarantees that nothing the logger
//! does (including panicking) reaches the operation that produced the event.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use oplink_common::observability::AtomicCounter;
use oplink_domain::{
    CommonLoggingData, ConnectionInfo, FailureReason, OperationError, QueryLoggingData,
};
use tracing::error;

use super::ports::EventLogger;
use crate::operation::{Operation, OperationState};

/// Routes lifecycle events to an [`EventLogger`]
#[derive(Debug)]
pub struct EventDispatcher {
    logger: Arc<dyn EventLogger>,
    dropped: AtomicCounter,
}

impl EventDispatcher {
    pub fn new(logger: Arc<dyn EventLogger>) -> Self {
        Self { logger, dropped: AtomicCounter::default() }
    }

    pub fn logger(&self) -> &Arc<dyn EventLogger> {
        &self.logger
    }

    /// Events lost because the logger panicked
    pub fn dropped_events(&self) -> u64 {
        self.dropped.get()
    }

    pub fn query_success(&self, data: &QueryLoggingData, conn: &ConnectionInfo<'_>) {
        self.guarded("query_success", |logger| logger.log_query_success(data, conn));
    }

    pub fn query_failure(
        &self,
        data: &QueryLoggingData,
        reason: FailureReason,
        code: u32,
        message: &str,
        conn: &ConnectionInfo<'_>,
    ) {
        self.guarded("query_failure", |logger| {
            logger.log_query_failure(data, reason, code, message, conn);
        });
    }

    pub fn connection_success(&self, data: &CommonLoggingData, conn: &ConnectionInfo<'_>) {
        self.guarded("connection_success", |logger| logger.log_connection_success(data, conn));
    }

    pub fn connection_failure(
        &self,
        data: &CommonLoggingData,
        reason: FailureReason,
        code: u32,
        message: &str,
        conn: &ConnectionInfo<'_>,
    ) {
        self.guarded("connection_failure", |logger| {
            logger.log_connection_failure(data, reason, code, message, conn);
        });
    }

    pub fn connection_closed(&self, conn: &ConnectionInfo<'_>) {
        self.guarded("connection_closed", |logger| logger.log_connection_closed(conn));
    }

    /// Log the query outcome of `operation` once it settles
    pub fn watch_query<O: Operation>(self: &Arc<Self>, operation: &O) {
        let dispatcher = Arc::clone(self);
        operation.observe(Box::new(move |completed: &O| dispatcher.dispatch_query(completed)));
    }

    /// Log the connection outcome of `operation` once it settles
    pub fn watch_connection<O: Operation>(self: &Arc<Self>, operation: &O) {
        let dispatcher = Arc::clone(self);
        operation
            .observe(Box::new(move |completed: &O| dispatcher.dispatch_connection(completed)));
    }

    fn dispatch_query<O: Operation>(&self, operation: &O) {
        let progress = operation.query_progress();
        let data = QueryLoggingData::new(
            operation.operation_type(),
            operation.elapsed(),
            operation.query().unwrap_or_default(),
        )
        .with_queries_executed(progress.queries_executed)
        .with_rows_received(progress.rows_received)
        .with_result_size(progress.result_size);

        let key = operation.connection_key();
        let context = operation.connection_context();
        let conn = ConnectionInfo { key: key.as_ref(), context: context.as_deref() };

        match settled_failure(operation) {
            None => self.query_success(&data, &conn),
            Some(failure) => {
                self.query_failure(&data, failure.reason, failure.code, &failure.message, &conn);
            }
        }
    }

    fn dispatch_connection<O: Operation>(&self, operation: &O) {
        let data = CommonLoggingData::new(operation.operation_type(), operation.elapsed());
        let key = operation.connection_key();
        let context = operation.connection_context();
        let conn = ConnectionInfo { key: key.as_ref(), context: context.as_deref() };

        match settled_failure(operation) {
            None => self.connection_success(&data, &conn),
            Some(failure) => {
                self.connection_failure(
                    &data,
                    failure.reason,
                    failure.code,
                    &failure.message,
                    &conn,
                );
            }
        }
    }

    fn guarded(&self, event: &'static str, call: impl FnOnce(&dyn EventLogger)) {
        let logger = self.logger.as_ref();
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| call(logger))) {
            self.dropped.increment();
            error!(
                api = %logger.api_name(),
                event,
                panic = panic_message(payload.as_ref()),
                "Event logger panicked; event dropped"
            );
        }
    }
}

/// `None` for a success, the failure otherwise
fn settled_failure<O: Operation>(operation: &O) -> Option<OperationError> {
    match operation.state() {
        OperationState::Succeeded => None,
        _ => Some(
            operation
                .failure()
                .unwrap_or_else(|| OperationError::bad_usage("operation settled without outcome")),
        ),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic payload>")
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use oplink_domain::{BasicConnectionContext, ConnectionKey, OperationType};

    use super::*;
    use crate::logging::SimpleLogger;
    use crate::metrics::CounterRegistry;
    use crate::operation::AsyncOperation;

    #[derive(Debug)]
    struct PanickingLogger;

    impl EventLogger for PanickingLogger {
        fn log_query_success(&self, _: &QueryLoggingData, _: &ConnectionInfo<'_>) {
            panic!("sink exploded");
        }

        fn log_query_failure(
            &self,
            _: &QueryLoggingData,
            _: FailureReason,
            _: u32,
            _: &str,
            _: &ConnectionInfo<'_>,
        ) {
            panic!("{}", String::from("sink exploded on failure"));
        }

        fn log_connection_success(&self, _: &CommonLoggingData, _: &ConnectionInfo<'_>) {}

        fn log_connection_failure(
            &self,
            _: &CommonLoggingData,
            _: FailureReason,
            _: u32,
            _: &str,
            _: &ConnectionInfo<'_>,
        ) {
        }

        fn api_name(&self) -> &str {
            "panicky"
        }
    }

    fn counting() -> (Arc<EventDispatcher>, Arc<CounterRegistry>) {
        let counters = Arc::new(CounterRegistry::new(0.5).unwrap());
        let logger = Arc::new(SimpleLogger::new("api", Arc::clone(&counters)));
        (Arc::new(EventDispatcher::new(logger)), counters)
    }

    #[test]
    fn test_panic_is_contained_and_counted() {
        let dispatcher = EventDispatcher::new(Arc::new(PanickingLogger));
        let data = QueryLoggingData::new(OperationType::Query, Duration::ZERO, "SELECT 1");

        dispatcher.query_success(&data, &ConnectionInfo::empty());
        dispatcher.query_failure(&data, FailureReason::Timeout, 0, "late", &ConnectionInfo::empty());
        dispatcher.connection_closed(&ConnectionInfo::empty());

        assert_eq!(dispatcher.dropped_events(), 2);
    }

    #[test]
    fn test_panic_message_extraction() {
        let static_payload: Box<dyn Any + Send> = Box::new("static");
        let owned_payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let other_payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(static_payload.as_ref()), "static");
        assert_eq!(panic_message(owned_payload.as_ref()), "owned");
        assert_eq!(panic_message(other_payload.as_ref()), "<non-string panic payload>");
    }

    #[test]
    fn test_watch_query_logs_success_with_progress() {
        let (dispatcher, counters) = counting();
        let op = AsyncOperation::<()>::for_query("SELECT * FROM orders");
        dispatcher.watch_query(&op);

        op.record_query_progress(1, 3, 120);
        op.succeed(());

        assert_eq!(counters.succeeded_queries(), 1);
        assert_eq!(counters.failed_queries(), 0);
        assert!(counters.latency_average(OperationType::Query).is_some());
    }

    #[test]
    fn test_watch_query_logs_failure() {
        let (dispatcher, counters) = counting();
        let op = AsyncOperation::<()>::for_query("SELECT 1");
        dispatcher.watch_query(&op);
        op.fail(OperationError::database(1045, "Access denied"));

        assert_eq!(counters.failed_queries(), 1);
        assert_eq!(counters.succeeded_queries(), 0);
    }

    #[test]
    fn test_watch_connection_counts_reused_sessions() {
        let (dispatcher, counters) = counting();
        let key = ConnectionKey::new("db1.local", 3306, "shop", "reader", "pw");
        let op = AsyncOperation::<()>::new(OperationType::Connect).with_connection_key(key);
        op.set_connection_context(Box::new(BasicConnectionContext::new().with_ssl(true)));
        dispatcher.watch_connection(&op);
        op.succeed(());

        assert_eq!(counters.opened_connections(), 1);
        assert_eq!(counters.reused_ssl_sessions(), 1);
    }

    #[test]
    fn test_watch_after_settlement_still_logs() {
        let (dispatcher, counters) = counting();
        let op = AsyncOperation::<()>::new(OperationType::PoolConnect);
        op.time_out();
        dispatcher.watch_connection(&op);

        assert_eq!(counters.failed_connections(), 1);
    }
}
