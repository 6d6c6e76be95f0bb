//! In-process operation settled by its owner
//!
//! Registration and settlement go through one mutex around a
//! `Pending { observers }` / `Settled { .. }` state, so an observer attached
//! concurrently with completion is either queued before settlement or sees
//! the settled state and runs at once. Observers always run outside the lock.

use std::fmt;
use std::future::Future;
use std::mem;
use std::sync::Arc;
use std::time::{Duration, Instant};

use oplink_domain::{
    ConnectionContext, ConnectionKey, OperationError, OperationResult, OperationType,
};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use super::{CompletionObserver, Operation, OperationState, QueryProgress};

enum Outcome<T> {
    /// `None` once the payload has been taken
    Value(Option<T>),
    Error(OperationError),
}

enum Completion<T> {
    Pending { observers: Vec<CompletionObserver<AsyncOperation<T>>> },
    Settled { state: OperationState, outcome: Outcome<T>, elapsed: Duration },
}

/// Operation completed by calling [`succeed`](Self::succeed),
/// [`fail`](Self::fail), [`cancel`](Self::cancel) or
/// [`time_out`](Self::time_out), or by [`drive`](Self::drive)-ing a future.
///
/// Only the first completion counts; later ones return `false`. Dropping
/// an operation that never completed settles it as cancelled so attached
/// observers still run.
pub struct AsyncOperation<T> {
    operation_type: OperationType,
    started: Instant,
    connection_key: Option<ConnectionKey>,
    query: Option<String>,
    context: Mutex<Option<Box<dyn ConnectionContext>>>,
    progress: Mutex<QueryProgress>,
    completion: Mutex<Completion<T>>,
}

impl<T: Send + 'static> AsyncOperation<T> {
    pub fn new(operation_type: OperationType) -> Self {
        Self {
            operation_type,
            started: Instant::now(),
            connection_key: None,
            query: None,
            context: Mutex::new(None),
            progress: Mutex::new(QueryProgress::default()),
            completion: Mutex::new(Completion::Pending { observers: Vec::new() }),
        }
    }

    /// Query operation carrying its SQL text
    pub fn for_query(query: impl Into<String>) -> Self {
        let mut operation = Self::new(OperationType::Query);
        operation.query = Some(query.into());
        operation
    }

    pub fn with_connection_key(mut self, key: ConnectionKey) -> Self {
        self.connection_key = Some(key);
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Attach or replace the connection context, e.g. once TLS is negotiated
    pub fn set_connection_context(&self, context: Box<dyn ConnectionContext>) {
        *self.context.lock() = Some(context);
    }

    /// Accumulate query progress
    pub fn record_query_progress(&self, queries_executed: u32, rows_received: u64, result_size: u64) {
        let mut progress = self.progress.lock();
        progress.queries_executed = progress.queries_executed.saturating_add(queries_executed);
        progress.rows_received = progress.rows_received.saturating_add(rows_received);
        progress.result_size = progress.result_size.saturating_add(result_size);
    }

    /// Settle successfully
    pub fn succeed(&self, value: T) -> bool {
        self.settle(OperationState::Succeeded, Outcome::Value(Some(value)))
    }

    /// Settle with a failure; the state follows the failure reason
    pub fn fail(&self, error: OperationError) -> bool {
        let state = OperationState::for_error(&error);
        self.settle(state, Outcome::Error(error))
    }

    pub fn cancel(&self) -> bool {
        self.fail(OperationError::cancelled("operation cancelled"))
    }

    pub fn time_out(&self) -> bool {
        self.fail(OperationError::timeout("operation timed out"))
    }

    /// Run `work` on the tokio runtime and settle with its result
    ///
    /// The spawned task keeps the operation alive until it settles. With a
    /// `deadline`, work still running when it expires is dropped and the
    /// operation settles with a `Timeout` failure. If the task itself is
    /// dropped first (aborted, or its runtime shut down) the operation
    /// settles as cancelled. Must be called from within a tokio runtime.
    pub fn drive<F>(self: &Arc<Self>, work: F, deadline: Option<Duration>) -> JoinHandle<bool>
    where
        F: Future<Output = OperationResult<T>> + Send + 'static,
    {
        let guard = CancelOnDrop(Arc::clone(self));
        tokio::spawn(async move {
            let operation = &guard.0;
            let result = match deadline {
                Some(limit) => tokio::time::timeout(limit, work).await.unwrap_or_else(|_| {
                    Err(OperationError::timeout(format!("deadline of {limit:?} exceeded")))
                }),
                None => work.await,
            };
            match result {
                Ok(value) => operation.succeed(value),
                Err(error) => operation.fail(error),
            }
        })
    }

    fn settle(&self, state: OperationState, outcome: Outcome<T>) -> bool {
        let elapsed = self.started.elapsed();
        let outcome = match outcome {
            Outcome::Error(error) => Outcome::Error(self.decorate(error, elapsed)),
            value => value,
        };

        let observers = {
            let mut completion = self.completion.lock();
            match &mut *completion {
                Completion::Settled { .. } => {
                    debug!(
                        operation = %self.operation_type,
                        ?state,
                        "Ignoring completion of an already settled operation"
                    );
                    return false;
                }
                Completion::Pending { observers } => {
                    let observers = mem::take(observers);
                    *completion = Completion::Settled { state, outcome, elapsed };
                    observers
                }
            }
        };

        trace!(
            operation = %self.operation_type,
            ?state,
            elapsed_us = saturating_micros(elapsed),
            observers = observers.len(),
            "Operation settled"
        );
        for observer in observers {
            observer(self);
        }
        true
    }

    fn decorate(&self, mut error: OperationError, elapsed: Duration) -> OperationError {
        if error.connection_key.is_none() {
            error.connection_key = self.connection_key.clone();
        }
        if error.elapsed.is_zero() {
            error.elapsed = elapsed;
        }
        error
    }
}

impl<T: Send + 'static> Operation for AsyncOperation<T> {
    type Output = T;

    fn operation_type(&self) -> OperationType {
        self.operation_type
    }

    fn state(&self) -> OperationState {
        match &*self.completion.lock() {
            Completion::Pending { .. } => OperationState::Pending,
            Completion::Settled { state, .. } => *state,
        }
    }

    fn elapsed(&self) -> Duration {
        match &*self.completion.lock() {
            Completion::Pending { .. } => self.started.elapsed(),
            Completion::Settled { elapsed, .. } => *elapsed,
        }
    }

    fn observe(&self, observer: CompletionObserver<Self>) {
        {
            let mut completion = self.completion.lock();
            if let Completion::Pending { observers } = &mut *completion {
                observers.push(observer);
                return;
            }
        }
        observer(self);
    }

    fn take_outcome(&self) -> Option<OperationResult<T>> {
        match &mut *self.completion.lock() {
            Completion::Pending { .. } => None,
            Completion::Settled { outcome: Outcome::Value(value), .. } => Some(
                value
                    .take()
                    .ok_or_else(|| OperationError::bad_usage("operation result already consumed")),
            ),
            Completion::Settled { outcome: Outcome::Error(error), .. } => Some(Err(error.clone())),
        }
    }

    fn failure(&self) -> Option<OperationError> {
        match &*self.completion.lock() {
            Completion::Settled { outcome: Outcome::Error(error), .. } => Some(error.clone()),
            _ => None,
        }
    }

    fn connection_key(&self) -> Option<ConnectionKey> {
        self.connection_key.clone()
    }

    fn connection_context(&self) -> Option<Box<dyn ConnectionContext>> {
        self.context.lock().as_ref().map(|context| context.clone_box())
    }

    fn query(&self) -> Option<String> {
        self.query.clone()
    }

    fn query_progress(&self) -> QueryProgress {
        *self.progress.lock()
    }
}

impl<T> Drop for AsyncOperation<T> {
    fn drop(&mut self) {
        let completion = self.completion.get_mut();
        let Completion::Pending { observers } = completion else {
            return;
        };
        let observers = mem::take(observers);
        let elapsed = self.started.elapsed();
        let mut error = OperationError::cancelled("operation dropped before completion")
            .with_elapsed(elapsed);
        error.connection_key = self.connection_key.clone();
        *completion = Completion::Settled {
            state: OperationState::Cancelled,
            outcome: Outcome::Error(error),
            elapsed,
        };

        if !observers.is_empty() {
            debug!(
                operation = %self.operation_type,
                observers = observers.len(),
                "Operation dropped while pending; settling as cancelled"
            );
        }
        for observer in observers {
            observer(self);
        }
    }
}

fn saturating_micros(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX)
}

/// Settles a still pending operation as cancelled when its driver goes away
struct CancelOnDrop<T: Send + 'static>(Arc<AsyncOperation<T>>);

impl<T: Send + 'static> Drop for CancelOnDrop<T> {
    fn drop(&mut self) {
        if !self.0.is_done() {
            self.0.fail(OperationError::cancelled("driving task dropped before completion"));
        }
    }
}

impl<T> fmt::Debug for AsyncOperation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.completion.lock() {
            Completion::Pending { .. } => OperationState::Pending,
            Completion::Settled { state, .. } => *state,
        };
        f.debug_struct("AsyncOperation")
            .field("operation_type", &self.operation_type)
            .field("state", &state)
            .field("connection_key", &self.connection_key)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use oplink_domain::{BasicConnectionContext, FailureReason};

    use super::*;

    #[test]
    fn test_first_completion_wins() {
        let op = AsyncOperation::<u32>::new(OperationType::Query);
        assert_eq!(op.state(), OperationState::Pending);
        assert!(op.succeed(7));
        assert!(!op.fail(OperationError::database(1, "late")));
        assert!(!op.cancel());
        assert_eq!(op.state(), OperationState::Succeeded);
        assert_eq!(op.take_outcome(), Some(Ok(7)));
    }

    #[test]
    fn test_pending_has_no_outcome() {
        let op = AsyncOperation::<()>::new(OperationType::Connect);
        assert!(op.take_outcome().is_none());
        assert!(op.failure().is_none());
        assert!(!op.is_done());
    }

    #[test]
    fn test_success_payload_taken_once() {
        let op = AsyncOperation::new(OperationType::Query);
        op.succeed(String::from("row"));
        assert_eq!(op.take_outcome(), Some(Ok(String::from("row"))));

        let second = op.take_outcome().unwrap().unwrap_err();
        assert_eq!(second.reason, FailureReason::BadUsage);
    }

    #[test]
    fn test_failure_returned_every_time_and_decorated() {
        let key = ConnectionKey::new("db1.local", 3306, "shop", "reader", "pw");
        let op = AsyncOperation::<()>::new(OperationType::Query).with_connection_key(key.clone());
        op.fail(OperationError::database(1045, "Access denied"));

        let first = op.take_outcome().unwrap().unwrap_err();
        let second = op.take_outcome().unwrap().unwrap_err();
        assert_eq!(first, second);
        assert_eq!(first.connection_key, Some(key));
        assert_eq!(op.state(), OperationState::Failed);
        assert_eq!(op.failure().map(|e| e.code), Some(1045));
    }

    #[test]
    fn test_cancel_and_timeout_states() {
        let cancelled = AsyncOperation::<()>::new(OperationType::Query);
        cancelled.cancel();
        assert_eq!(cancelled.state(), OperationState::Cancelled);

        let timed_out = AsyncOperation::<()>::new(OperationType::Query);
        timed_out.time_out();
        assert_eq!(timed_out.state(), OperationState::TimedOut);
        assert!(timed_out.failure().unwrap().is_timeout());
    }

    #[test]
    fn test_observers_run_once_in_order() {
        let op = AsyncOperation::<u8>::new(OperationType::Query);
        let calls = Arc::new(Mutex::new(Vec::new()));
        for id in 0..3 {
            let calls = Arc::clone(&calls);
            op.observe(Box::new(move |completed: &AsyncOperation<u8>| {
                calls.lock().push((id, completed.state()));
            }));
        }
        op.succeed(1);
        op.succeed(2);

        let calls = calls.lock();
        assert_eq!(
            *calls,
            vec![
                (0, OperationState::Succeeded),
                (1, OperationState::Succeeded),
                (2, OperationState::Succeeded)
            ]
        );
    }

    #[test]
    fn test_late_observer_runs_immediately() {
        let op = AsyncOperation::<u8>::new(OperationType::Query);
        op.succeed(1);

        let ran = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ran);
        op.observe(Box::new(move |_: &AsyncOperation<u8>| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_while_pending_notifies_observers() {
        let seen = Arc::new(Mutex::new(None));
        {
            let op = AsyncOperation::<u8>::new(OperationType::Query);
            let seen = Arc::clone(&seen);
            op.observe(Box::new(move |completed: &AsyncOperation<u8>| {
                *seen.lock() = completed.failure();
            }));
        }
        let failure = seen.lock().clone().unwrap();
        assert!(failure.is_cancelled());
    }

    #[test]
    fn test_progress_and_context() {
        let op = AsyncOperation::<()>::for_query("SELECT 1");
        op.record_query_progress(1, 10, 256);
        op.record_query_progress(1, 5, 128);
        assert_eq!(
            op.query_progress(),
            QueryProgress { queries_executed: 2, rows_received: 15, result_size: 384 }
        );
        assert_eq!(op.query().as_deref(), Some("SELECT 1"));

        assert!(op.connection_context().is_none());
        op.set_connection_context(Box::new(BasicConnectionContext::new().with_ssl(true)));
        assert!(op.connection_context().unwrap().ssl_session_reused());
    }

    #[tokio::test]
    async fn test_drive_settles_with_result() {
        let op = Arc::new(AsyncOperation::<u32>::new(OperationType::Query));
        let settled = op.drive(async { Ok(42) }, None).await.unwrap();
        assert!(settled);
        assert_eq!(op.take_outcome(), Some(Ok(42)));
    }

    #[test]
    fn test_elapsed_micros_saturate() {
        assert_eq!(saturating_micros(Duration::from_millis(5)), 5000);
        assert_eq!(saturating_micros(Duration::MAX), u64::MAX);
    }

    #[tokio::test]
    async fn test_aborted_drive_settles_cancelled() {
        let op = Arc::new(AsyncOperation::<u32>::new(OperationType::Query));
        let handle = op.drive(std::future::pending(), None);
        assert_eq!(Arc::strong_count(&op), 2);

        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());
        assert_eq!(op.state(), OperationState::Cancelled);
        assert!(op.failure().unwrap().message.contains("driving task dropped"));
        assert_eq!(Arc::strong_count(&op), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drive_deadline_times_out() {
        let op = Arc::new(AsyncOperation::<u32>::new(OperationType::Query));
        let handle = op.drive(
            async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(1)
            },
            Some(Duration::from_millis(50)),
        );
        assert!(handle.await.unwrap());
        assert_eq!(op.state(), OperationState::TimedOut);
        assert!(op.failure().unwrap().is_timeout());
    }
}
