//! Per-entry timers.
//!
//! A timer is a spawned Tokio task owned by a [`TimerGuard`]. Dropping the
//! guard aborts the task, so removing an entry from the registry by any path
//! also cancels its timer.

use std::future::Future;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time;

use crate::error::RegistryError;

/// How long an entry may stay pending before it fails with
/// [`OutcomeError::TimedOut`](crate::OutcomeError::TimedOut).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Timeout {
    #[default]
    Never,
    /// A zero duration behaves like [`Timeout::Never`].
    After(Duration),
}

impl Timeout {
    /// A zero duration means "no timer", matching an infinite timeout.
    #[must_use]
    pub const fn after(duration: Duration) -> Self {
        if duration.is_zero() {
            Self::Never
        } else {
            Self::After(duration)
        }
    }

    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self::after(Duration::from_millis(millis))
    }

    /// The delay to arm a timer with, or `None` when no timer should run.
    #[must_use]
    pub const fn duration(self) -> Option<Duration> {
        match self {
            Self::After(duration) if !duration.is_zero() => Some(duration),
            Self::After(_) | Self::Never => None,
        }
    }

    #[must_use]
    pub const fn is_armed(self) -> bool {
        self.duration().is_some()
    }
}

impl From<Duration> for Timeout {
    fn from(duration: Duration) -> Self {
        Self::after(duration)
    }
}

impl From<Option<Duration>> for Timeout {
    fn from(duration: Option<Duration>) -> Self {
        duration.map_or(Self::Never, Self::after)
    }
}

/// Owns a running timer task; aborts it on drop.
#[derive(Debug)]
pub(crate) struct TimerGuard {
    handle: Option<JoinHandle<()>>,
}

impl TimerGuard {
    /// Spawn `on_expiry` after `after` elapses on the current runtime.
    pub(crate) fn arm<F>(after: Duration, on_expiry: F) -> Result<Self, RegistryError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| RegistryError::NoRuntime)?;
        let handle = runtime.spawn(async move {
            time::sleep(after).await;
            on_expiry.await;
        });
        Ok(Self {
            handle: Some(handle),
        })
    }

    /// Release the task without aborting it. Used by the expiry path, which
    /// runs inside the task itself.
    pub(crate) fn disarm(mut self) {
        self.handle.take();
    }
}

impl Drop for TimerGuard {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
