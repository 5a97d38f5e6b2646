//! Shared authenticated session with idempotent refresh.

use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use dcr_core::error::Result;

use crate::collaborators::SessionProvider;

/// An authenticated session. Immutable; refresh produces a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Bearer token
    pub token: String,
    /// Increases with every refresh
    pub generation: u64,
}

impl Session {
    /// Creates a session.
    pub fn new(token: impl Into<String>, generation: u64) -> Self {
        Self {
            token: token.into(),
            generation,
        }
    }
}

/// Holds the current session for a processing unit.
///
/// Readers take an `Arc` snapshot, so a refresh never pulls a session out
/// from under a call that is still using it.
pub struct SessionHandle {
    current: ArcSwap<Session>,
    provider: Arc<dyn SessionProvider>,
    refresh_lock: Mutex<()>,
}

impl SessionHandle {
    /// Acquires an initial session from `provider`.
    pub fn acquire(provider: Arc<dyn SessionProvider>) -> Result<Self> {
        let session = provider.acquire()?;
        tracing::debug!(generation = session.generation, "Acquired session");
        Ok(Self {
            current: ArcSwap::from_pointee(session),
            provider,
            refresh_lock: Mutex::new(()),
        })
    }

    /// Snapshot of the current session.
    pub fn current(&self) -> Arc<Session> {
        self.current.load_full()
    }

    /// Refreshes the session unless someone already did since
    /// `observed_generation` was read. Returns the session to retry with.
    pub fn refresh_if_stale(&self, observed_generation: u64) -> Result<Arc<Session>> {
        let _guard = self.refresh_lock.lock();
        let current = self.current.load_full();
        if current.generation != observed_generation {
            tracing::debug!(
                observed = observed_generation,
                current = current.generation,
                "Session already refreshed"
            );
            return Ok(current);
        }

        let fresh = Arc::new(self.provider.refresh(&current)?);
        tracing::info!(generation = fresh.generation, "Refreshed session");
        self.current.store(Arc::clone(&fresh));
        Ok(fresh)
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("generation", &self.current.load().generation)
            .finish()
    }
}
