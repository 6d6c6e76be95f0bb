//! Single-fire asynchronous operations
//!
//! An [`Operation`] completes exactly once: it succeeds, fails, is cancelled
//! or times out. Interested parties attach completion observers, which run
//! once the terminal outcome is known (immediately when attached late).
//!
//! - [`completion::AsyncOperation`] is the in-process implementation.
//! - [`adapter`] turns any operation into an awaitable [`OperationFuture`].

pub mod adapter;
pub mod completion;

use std::time::Duration;

use oplink_domain::{ConnectionContext, ConnectionKey, OperationError, OperationResult, OperationType};
use serde::Serialize;

pub use adapter::{adapt, to_future, to_future_ref, IntoOperationFuture, OperationFuture};
pub use completion::AsyncOperation;

/// Callback run once with the completed operation
pub type CompletionObserver<O> = Box<dyn FnOnce(&O) + Send + 'static>;

/// Lifecycle state of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OperationState {
    Pending,
    Succeeded,
    Failed,
    Cancelled,
    TimedOut,
}

impl OperationState {
    /// Whether the operation has settled
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Terminal state implied by a failure
    pub fn for_error(error: &OperationError) -> Self {
        if error.is_cancelled() {
            Self::Cancelled
        } else if error.is_timeout() {
            Self::TimedOut
        } else {
            Self::Failed
        }
    }
}

/// Work a query operation has done so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueryProgress {
    pub queries_executed: u32,
    pub rows_received: u64,
    pub result_size: u64,
}

/// Contract every completion-driven operation fulfils
///
/// Observers attached with [`observe`](Operation::observe) are invoked
/// exactly once, after the terminal state and outcome are visible through
/// the other accessors. Attaching after completion invokes the observer
/// synchronously on the attaching thread.
pub trait Operation: Send + Sync + 'static {
    /// Value produced on success
    type Output: Send + 'static;

    fn operation_type(&self) -> OperationType;

    fn state(&self) -> OperationState;

    /// Time since start while pending, total run time once settled
    fn elapsed(&self) -> Duration;

    /// Attach a completion observer
    fn observe(&self, observer: CompletionObserver<Self>)
    where
        Self: Sized;

    /// Take the terminal outcome, `None` while pending
    ///
    /// A success payload moves out on the first call; later calls return a
    /// `BadUsage` error. Failures are returned on every call.
    fn take_outcome(&self) -> Option<OperationResult<Self::Output>>;

    /// The failure, when the operation settled unsuccessfully
    fn failure(&self) -> Option<OperationError>;

    fn connection_key(&self) -> Option<ConnectionKey> {
        None
    }

    /// Copy of the connection context, detached from the connection
    fn connection_context(&self) -> Option<Box<dyn ConnectionContext>> {
        None
    }

    /// SQL text for query operations
    fn query(&self) -> Option<String> {
        None
    }

    fn query_progress(&self) -> QueryProgress {
        QueryProgress::default()
    }

    fn is_done(&self) -> bool {
        self.state().is_terminal()
    }
}
