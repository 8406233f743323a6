//! Deferred outcome of an initiated write.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

/// Handle to the outcome of a write that is already under way.
///
/// Dropping it does not cancel the write, and failures are published on the
/// bus whether or not anyone awaits. Awaiting yields `Some(value)` on
/// success and `None` if the write was rejected.
#[derive(Debug)]
pub struct PendingWrite<T> {
    rx: oneshot::Receiver<Option<T>>,
}

impl<T> PendingWrite<T> {
    pub(crate) fn channel() -> (oneshot::Sender<Option<T>>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { rx })
    }

    /// A handle that has already settled as rejected.
    pub fn rejected() -> Self {
        let (tx, pending) = Self::channel();
        let _ = tx.send(None);
        pending
    }

    /// Check for the outcome without waiting.
    ///
    /// Returns `None` while the write is still in flight.
    pub fn try_outcome(&mut self) -> Option<Option<T>> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(None),
        }
    }
}

impl<T> Future for PendingWrite<T> {
    type Output = Option<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().rx)
            .poll(cx)
            .map(|outcome| outcome.ok().flatten())
    }
}
