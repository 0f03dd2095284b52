//! The asynchronous handle returned by `create`.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use tokio::sync::oneshot;

use crate::error::OutcomeError;

pub(crate) type Outcome<T, E> = Result<T, OutcomeError<E>>;

/// A pending result. Resolves once the registry settles its entry.
///
/// Cloning is cheap and every clone observes the same outcome, which is how
/// [`OutcomeRegistry::get`](crate::OutcomeRegistry::get) hands out the slot
/// without disturbing the creator's copy.
pub struct Pending<T, E> {
    inner: Shared<BoxFuture<'static, Outcome<T, E>>>,
}

impl<T, E> Pending<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Build a result slot and the sender that settles it.
    pub(crate) fn channel() -> (oneshot::Sender<Outcome<T, E>>, Self) {
        let (tx, rx) = oneshot::channel();
        // A dropped sender means the registry went away with the entry still in it.
        let inner = rx
            .map(|received| received.unwrap_or(Err(OutcomeError::Abandoned)))
            .boxed()
            .shared();
        (tx, Self { inner })
    }

    /// The outcome, if the entry has already been settled and this handle
    /// (or a clone) has been polled since.
    #[must_use]
    pub fn peek(&self) -> Option<&Outcome<T, E>> {
        self.inner.peek()
    }
}

impl<T, E> Clone for Pending<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T, E> Future for Pending<T, E>
where
    T: Clone,
    E: Clone,
{
    type Output = Outcome<T, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner).poll(cx)
    }
}

impl<T, E> fmt::Debug for Pending<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pending").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clones_observe_same_outcome() {
        let (tx, pending) = Pending::<u32, String>::channel();
        let other = pending.clone();
        tx.send(Ok(7)).unwrap();
        assert_eq!(pending.await, Ok(7));
        assert_eq!(other.await, Ok(7));
    }

    #[tokio::test]
    async fn test_dropped_sender_is_abandoned() {
        let (tx, pending) = Pending::<u32, String>::channel();
        drop(tx);
        assert_eq!(pending.await, Err(OutcomeError::Abandoned));
    }

    #[tokio::test]
    async fn test_peek_after_poll() {
        let (tx, pending) = Pending::<u32, String>::channel();
        assert!(pending.peek().is_none());
        tx.send(Err(OutcomeError::Rejected("no".to_string())))
            .unwrap();
        let observed = pending.clone().await;
        assert_eq!(observed, Err(OutcomeError::Rejected("no".to_string())));
        assert_eq!(pending.peek(), Some(&observed));
    }
}
