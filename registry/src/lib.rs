//! Registry correlating caller-chosen identifiers with pending asynchronous
//! outcomes.
//!
//! A caller [`create`](OutcomeRegistry::create)s a [`Pending`] result under an
//! identifier and awaits it; unrelated code later settles it by that
//! identifier with [`resolve`](OutcomeRegistry::resolve),
//! [`reject`](OutcomeRegistry::reject) or [`cancel`](OutcomeRegistry::cancel),
//! or an optional timer fails it with [`OutcomeError::TimedOut`].

pub mod config;
pub mod error;

mod pending;
mod registry;
mod timer;

pub use config::{CollisionPolicy, ConfigError, RegistryConfig};
pub use error::{OutcomeError, RegistryError};
pub use pending::Pending;
pub use registry::OutcomeRegistry;
pub use timer::Timeout;
