//! Error types for the outcome registry.
//!
//! Two distinct channels carry failures:
//! - [`RegistryError`] is returned synchronously by the call that triggered it.
//! - [`OutcomeError`] is delivered through the [`Pending`](crate::Pending)
//!   future to whoever awaits the result.

use std::fmt;

use thiserror::Error;

/// Synchronous failure of a registry operation.
///
/// Identifiers are rendered into the error at the failure site so the error
/// stays `'static` and independent of the registry's key type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("promise \"{id}\" doesn't exist")]
    NotFound { id: String },
    #[error("promise \"{id}\" is already pending")]
    AlreadyPending { id: String },
    #[error("arming a timeout requires a Tokio runtime")]
    NoRuntime,
}

impl RegistryError {
    pub(crate) fn not_found(id: &impl fmt::Display) -> Self {
        Self::NotFound { id: id.to_string() }
    }

    pub(crate) fn already_pending(id: &impl fmt::Display) -> Self {
        Self::AlreadyPending { id: id.to_string() }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Failure delivered through a pending result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OutcomeError<E> {
    /// Settled via `reject` with a caller-supplied payload.
    #[error("promise rejected")]
    Rejected(E),
    /// The entry's timer fired before anyone settled it.
    #[error("timed out")]
    TimedOut,
    /// The entry was cancelled or replaced by a colliding `create`.
    #[error("promise cancelled")]
    Cancelled,
    /// The registry was dropped while the entry was still pending.
    #[error("registry dropped before the promise was settled")]
    Abandoned,
}

impl<E> OutcomeError<E> {
    #[must_use]
    pub fn rejection(&self) -> Option<&E> {
        match self {
            Self::Rejected(payload) => Some(payload),
            Self::TimedOut | Self::Cancelled | Self::Abandoned => None,
        }
    }

    #[must_use]
    pub fn into_rejection(self) -> Option<E> {
        match self {
            Self::Rejected(payload) => Some(payload),
            Self::TimedOut | Self::Cancelled | Self::Abandoned => None,
        }
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut)
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
