//! Identifier → pending outcome bookkeeping.
//!
//! Each pending identifier owns exactly one [`Entry`]: the result slot handed
//! to callers, the sender that settles it, and its optional timer. Keeping
//! all three in one value means a slot can never exist without a way to
//! settle it. Removing the entry from the map *is* settlement; nothing lingers
//! afterwards.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::oneshot;

use crate::config::{CollisionPolicy, RegistryConfig};
use crate::error::{OutcomeError, RegistryError};
use crate::pending::{Outcome, Pending};
use crate::timer::{Timeout, TimerGuard};

struct Entry<T, E> {
    slot: Pending<T, E>,
    settle: oneshot::Sender<Outcome<T, E>>,
    timer: Option<TimerGuard>,
    /// Distinguishes this entry from later ones reusing the same identifier.
    generation: u64,
}

impl<T, E> Entry<T, E> {
    /// Cancel the timer (if still armed) and deliver `outcome`.
    fn finish(self, outcome: Outcome<T, E>) {
        drop(self.timer);
        // Every handle may already be gone; nobody left to tell.
        let _ = self.settle.send(outcome);
    }
}

struct Entries<K, T, E> {
    map: HashMap<K, Entry<T, E>>,
    next_generation: u64,
}

type SharedEntries<K, T, E> = Arc<Mutex<Entries<K, T, E>>>;

fn lock<K, T, E>(state: &Mutex<Entries<K, T, E>>) -> MutexGuard<'_, Entries<K, T, E>> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Timer callback. Only expires the entry it was armed for: if the
/// identifier was settled and re-created in the meantime, the generation
/// differs and the newer entry is left alone.
fn expire<K, T, E>(state: &Weak<Mutex<Entries<K, T, E>>>, id: &K, generation: u64)
where
    K: Eq + Hash + fmt::Display,
{
    let Some(state) = state.upgrade() else { return };
    let expired = {
        let mut guard = lock(&state);
        let entries = &mut *guard;
        let current = entries
            .map
            .get(id)
            .is_some_and(|entry| entry.generation == generation);
        if current {
            entries.map.remove(id)
        } else {
            None
        }
    };

    match expired {
        Some(mut entry) => {
            if let Some(timer) = entry.timer.take() {
                timer.disarm();
            }
            tracing::debug!(id = %id, "Pending promise timed out");
            entry.finish(Err(OutcomeError::TimedOut));
        }
        None => {
            tracing::trace!(id = %id, generation, "Stale timer fired after settlement");
        }
    }
}

/// Registry of pending outcomes keyed by caller-chosen identifiers.
///
/// The registry is a cheap handle; clones share the same entries, so the code
/// that creates a pending result and the code that later settles it can each
/// hold their own copy. When the last handle is dropped, outstanding results
/// fail with [`OutcomeError::Abandoned`] and their timers are cancelled.
///
/// Settlement is first-writer-wins: an explicit `resolve`/`reject`/`cancel`
/// racing a timer either settles the entry or finds it gone
/// ([`RegistryError::NotFound`]).
pub struct OutcomeRegistry<K, T, E> {
    state: SharedEntries<K, T, E>,
    config: RegistryConfig,
}

impl<K, T, E> OutcomeRegistry<K, T, E>
where
    K: Eq + Hash + Clone + fmt::Display + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    #[must_use]
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(Entries {
                map: HashMap::new(),
                next_generation: 0,
            })),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Create a pending result under `id` using the configured default timeout.
    pub fn create(&self, id: K) -> Result<Pending<T, E>, RegistryError> {
        self.create_with(id, self.config.default_timeout())
    }

    /// Create a pending result under `id`.
    ///
    /// With a finite timeout a timer is armed; when it fires the entry is
    /// removed and the result fails with [`OutcomeError::TimedOut`]. Arming
    /// needs a Tokio runtime; without one this returns
    /// [`RegistryError::NoRuntime`] and nothing is inserted.
    ///
    /// A colliding `id` is handled per [`CollisionPolicy`]. With `Reject`
    /// the existing entry is untouched; with `Replace` it is cancelled first.
    pub fn create_with(
        &self,
        id: K,
        timeout: impl Into<Timeout>,
    ) -> Result<Pending<T, E>, RegistryError> {
        let timeout = timeout.into();
        let mut guard = lock(&self.state);
        let entries = &mut *guard;

        let collides = entries.map.contains_key(&id);
        if collides && self.config.on_collision() == CollisionPolicy::Reject {
            return Err(RegistryError::already_pending(&id));
        }

        let generation = entries.next_generation;
        let timer = match timeout.duration() {
            Some(after) => {
                let state = Arc::downgrade(&self.state);
                let expiring = id.clone();
                Some(TimerGuard::arm(after, async move {
                    expire(&state, &expiring, generation);
                })?)
            }
            None => None,
        };
        entries.next_generation = generation.wrapping_add(1);

        let (settle, slot) = Pending::channel();
        let replaced = entries.map.insert(
            id.clone(),
            Entry {
                slot: slot.clone(),
                settle,
                timer,
                generation,
            },
        );
        drop(guard);

        if let Some(prior) = replaced {
            tracing::debug!(id = %id, "Replacing pending promise; prior one cancelled");
            prior.finish(Err(OutcomeError::Cancelled));
        }
        tracing::debug!(id = %id, timeout = ?timeout, "Created pending promise");
        Ok(slot)
    }

    /// Whether `id` has a pending result.
    #[must_use]
    pub fn has<Q>(&self, id: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        lock(&self.state).map.contains_key(id)
    }

    /// The pending result for `id`, without altering any state.
    #[must_use]
    pub fn get<Q>(&self, id: &Q) -> Option<Pending<T, E>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        lock(&self.state).map.get(id).map(|entry| entry.slot.clone())
    }

    /// Number of pending entries.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.state).map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the identifiers currently pending, in no particular order.
    #[must_use]
    pub fn ids(&self) -> Vec<K> {
        lock(&self.state).map.keys().cloned().collect()
    }

    pub fn resolve<Q>(&self, id: &Q, payload: T) -> Result<(), RegistryError>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + fmt::Display + ?Sized,
    {
        self.take(id)?.finish(Ok(payload));
        tracing::debug!(id = %id, "Resolved pending promise");
        Ok(())
    }

    pub fn reject<Q>(&self, id: &Q, payload: E) -> Result<(), RegistryError>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + fmt::Display + ?Sized,
    {
        self.take(id)?.finish(Err(OutcomeError::Rejected(payload)));
        tracing::debug!(id = %id, "Rejected pending promise");
        Ok(())
    }

    /// Discard the entry for `id`. Its awaiters see [`OutcomeError::Cancelled`].
    pub fn cancel<Q>(&self, id: &Q) -> Result<(), RegistryError>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + fmt::Display + ?Sized,
    {
        self.take(id)?.finish(Err(OutcomeError::Cancelled));
        tracing::debug!(id = %id, "Cancelled pending promise");
        Ok(())
    }

    /// Resolve every pending entry with a clone of `payload`. Returns how many
    /// entries were settled.
    pub fn resolve_all(&self, payload: T) -> usize {
        let drained = self.drain();
        let count = drained.len();
        for entry in drained {
            entry.finish(Ok(payload.clone()));
        }
        tracing::debug!(count, "Resolved all pending promises");
        count
    }

    pub fn reject_all(&self, payload: E) -> usize {
        let drained = self.drain();
        let count = drained.len();
        for entry in drained {
            entry.finish(Err(OutcomeError::Rejected(payload.clone())));
        }
        tracing::debug!(count, "Rejected all pending promises");
        count
    }

    pub fn cancel_all(&self) -> usize {
        let drained = self.drain();
        let count = drained.len();
        for entry in drained {
            entry.finish(Err(OutcomeError::Cancelled));
        }
        tracing::debug!(count, "Cancelled all pending promises");
        count
    }

    fn take<Q>(&self, id: &Q) -> Result<Entry<T, E>, RegistryError>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + fmt::Display + ?Sized,
    {
        lock(&self.state)
            .map
            .remove(id)
            .ok_or_else(|| RegistryError::not_found(&id))
    }

    /// Detach every entry under one lock acquisition. Settling then walks the
    /// detached snapshot, so nothing created or removed concurrently can make
    /// the walk skip an entry.
    fn drain(&self) -> Vec<Entry<T, E>> {
        let map = mem::take(&mut lock(&self.state).map);
        map.into_values().collect()
    }
}

impl<K, T, E> Default for OutcomeRegistry<K, T, E>
where
    K: Eq + Hash + Clone + fmt::Display + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, T, E> Clone for OutcomeRegistry<K, T, E> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            config: self.config,
        }
    }
}

impl<K, T, E> fmt::Debug for OutcomeRegistry<K, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutcomeRegistry")
            .field("pending", &lock(&self.state).map.len())
            .field("config", &self.config)
            .finish()
    }
}
