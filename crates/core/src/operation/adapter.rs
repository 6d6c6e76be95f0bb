//! Operation-to-future adapter
//!
//! [`to_future`] attaches a completion observer that owns the sending half
//! of a oneshot channel and hands back the receiving half as an
//! [`OperationFuture`].
//!
//! The observer holds no reference to the operation: it is stored inside
//! the operation, so a strong handle there would keep an unsettled operation
//! alive forever. Whoever can still complete the operation keeps it alive
//! (for [`AsyncOperation::drive`](super::AsyncOperation::drive), the driving
//! task). Once the last handle is gone the operation settles as cancelled
//! and the future resolves.
//!
//! ```
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! use std::sync::Arc;
//!
//! use oplink_core::operation::{to_future, AsyncOperation};
//! use oplink_domain::OperationType;
//!
//! let op = Arc::new(AsyncOperation::<u64>::new(OperationType::Query));
//! let future = to_future(Arc::clone(&op));
//! op.succeed(3);
//! assert_eq!(future.await, Ok(3));
//! # }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::{FusedFuture, FutureExt, Shared};
use oplink_domain::{OperationError, OperationResult};
use tokio::sync::oneshot;
use tracing::trace;

use super::Operation;

/// Future resolving with an operation's terminal outcome
///
/// Resolves exactly once. If the operation is destroyed without settling,
/// resolves with a `Cancelled` error.
#[derive(Debug)]
#[must_use = "futures do nothing unless polled"]
pub struct OperationFuture<T> {
    receiver: oneshot::Receiver<OperationResult<T>>,
    terminated: bool,
}

impl<T> OperationFuture<T> {
    fn new(receiver: oneshot::Receiver<OperationResult<T>>) -> Self {
        Self { receiver, terminated: false }
    }

    /// Future that is already settled with `result`
    pub fn ready(result: OperationResult<T>) -> Self {
        let (sender, receiver) = oneshot::channel();
        // The receiver is alive, so this cannot fail
        let _ = sender.send(result);
        Self::new(receiver)
    }

    /// Clonable future; every clone observes the same settled value
    pub fn shared(self) -> Shared<Self>
    where
        T: Clone,
    {
        FutureExt::shared(self)
    }
}

impl<T> Future for OperationFuture<T> {
    type Output = OperationResult<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let result = match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(Ok(result)) => result,
            Poll::Ready(Err(_)) => {
                Err(OperationError::cancelled("operation dropped before completion"))
            }
        };
        self.terminated = true;
        Poll::Ready(result)
    }
}

impl<T> FusedFuture for OperationFuture<T> {
    fn is_terminated(&self) -> bool {
        self.terminated
    }
}

/// Future for a shared operation, consuming the handle
pub fn to_future<O: Operation>(operation: Arc<O>) -> OperationFuture<O::Output> {
    let (sender, receiver) = oneshot::channel();
    operation.observe(Box::new(move |completed: &O| {
        let outcome = completed.take_outcome().unwrap_or_else(|| {
            Err(OperationError::bad_usage("completion observer ran before settlement"))
        });
        if sender.send(outcome).is_err() {
            trace!(
                operation = %completed.operation_type(),
                "Operation future dropped before completion"
            );
        }
    }));
    OperationFuture::new(receiver)
}

/// Future for a shared operation, leaving the caller's handle in place
pub fn to_future_ref<O: Operation>(operation: &Arc<O>) -> OperationFuture<O::Output> {
    to_future(Arc::clone(operation))
}

/// Anything that can be awaited as an operation outcome
pub trait IntoOperationFuture {
    type Output;

    fn into_operation_future(self) -> OperationFuture<Self::Output>;
}

impl<O: Operation> IntoOperationFuture for Arc<O> {
    type Output = O::Output;

    fn into_operation_future(self) -> OperationFuture<O::Output> {
        to_future(self)
    }
}

impl<O: Operation> IntoOperationFuture for &Arc<O> {
    type Output = O::Output;

    fn into_operation_future(self) -> OperationFuture<O::Output> {
        to_future_ref(self)
    }
}

impl<T> IntoOperationFuture for OperationFuture<T> {
    type Output = T;

    fn into_operation_future(self) -> Self {
        self
    }
}

/// Uniform entry point over owned handles, borrowed handles and futures
pub fn adapt<I: IntoOperationFuture>(source: I) -> OperationFuture<I::Output> {
    source.into_operation_future()
}

#[cfg(test)]
mod tests {
    use oplink_domain::{FailureReason, OperationType};

    use super::*;
    use crate::operation::AsyncOperation;

    #[tokio::test]
    async fn test_ready_future() {
        let future = OperationFuture::ready(Ok::<_, OperationError>(5));
        assert_eq!(future.await, Ok(5));
    }

    #[tokio::test]
    async fn test_adapt_is_identity_for_futures() {
        let future = adapt(OperationFuture::ready(Ok::<_, OperationError>("x")));
        assert_eq!(future.await, Ok("x"));
    }

    #[tokio::test]
    async fn test_adapter_holds_no_strong_reference() {
        let op = Arc::new(AsyncOperation::<u8>::new(OperationType::Query));
        let future = to_future_ref(&op);
        assert_eq!(Arc::strong_count(&op), 1);

        op.succeed(1);
        assert_eq!(future.await, Ok(1));
    }

    #[tokio::test]
    async fn test_last_handle_dropped_resolves_cancelled() {
        let op = Arc::new(AsyncOperation::<u8>::new(OperationType::Query));
        let weak = Arc::downgrade(&op);
        let future = to_future(op);
        assert!(weak.upgrade().is_none());

        let err = future.await.unwrap_err();
        assert_eq!(err.reason, FailureReason::Cancelled);
    }

    #[tokio::test]
    async fn test_second_adapter_gets_bad_usage() {
        let op = Arc::new(AsyncOperation::<u8>::new(OperationType::Query));
        let first = to_future_ref(&op);
        let second = to_future_ref(&op);
        op.succeed(9);

        assert_eq!(first.await, Ok(9));
        assert_eq!(second.await.unwrap_err().reason, FailureReason::BadUsage);
    }

    #[test]
    fn test_pending_until_settled_then_woken() {
        use tokio_test::{assert_pending, assert_ready_eq, task};

        let op = Arc::new(AsyncOperation::<u8>::new(OperationType::Query));
        let mut future = task::spawn(to_future_ref(&op));
        assert_pending!(future.poll());
        assert!(!future.is_woken());

        op.succeed(4);
        assert!(future.is_woken());
        assert_ready_eq!(future.poll(), Ok(4));
    }

    #[test]
    fn test_fused_after_completion() {
        let mut future = OperationFuture::ready(Ok::<_, OperationError>(1));
        assert!(!future.is_terminated());
        let result = futures::executor::block_on(&mut future);
        assert_eq!(result, Ok(1));
        assert!(future.is_terminated());
    }
}
