//! Instance caches for singleton and scoped lifecycles
//!
//! One global cache for singletons and one cache per open scope token.
//! Transient services never touch this module. Each cache slot is a
//! `OnceCell`, so the first construction of a given key happens at most
//! once no matter how many threads race for it.

use crate::error::{DiError, Result};
use crate::identity::ServiceId;
use crate::registration::Instance;
use crate::scope::ScopeToken;
use ahash::RandomState;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

type Cell = Arc<OnceCell<Instance>>;
type ScopedCache = Arc<DashMap<ServiceId, Cell, RandomState>>;

/// Shared instance caches.
///
/// Map guards are never held while a constructor runs: the cell is cloned
/// out of the map first, then initialized. Constructing a dependency chain
/// re-enters these maps, and holding a shard lock across construction
/// would deadlock. A failed construction leaves its cell empty, so the
/// cache ends up as if the attempt never happened.
pub(crate) struct ScopeStore {
    /// Global singleton cache, keyed by identity alone
    singletons: DashMap<ServiceId, Cell, RandomState>,
    /// One cache per active scope token, discarded whole on close
    scoped: DashMap<ScopeToken, ScopedCache, RandomState>,
}

impl ScopeStore {
    pub fn new() -> Self {
        Self {
            singletons: DashMap::with_capacity_and_hasher_and_shard_amount(
                0,
                RandomState::new(),
                8,
            ),
            scoped: DashMap::with_capacity_and_hasher_and_shard_amount(0, RandomState::new(), 8),
        }
    }

    /// Get the cached singleton for `id`, constructing it via `create` on
    /// first access. Exactly one construction occurs per identity; racing
    /// callers block until it completes and then observe the same instance.
    pub fn get_or_create_singleton(
        &self,
        id: &ServiceId,
        create: impl FnOnce() -> Result<Instance>,
    ) -> Result<Instance> {
        let cell = Arc::clone(&self.singletons.entry(id.clone()).or_default());
        // Shard guard released; construction may recurse into this map.
        cell.get_or_try_init(create).cloned()
    }

    /// Scoped counterpart of [`ScopeStore::get_or_create_singleton`], keyed
    /// by `(token, id)`. Fails with [`DiError::NoActiveScope`] if the token
    /// no longer names an open scope.
    pub fn get_or_create_scoped(
        &self,
        token: ScopeToken,
        id: &ServiceId,
        create: impl FnOnce() -> Result<Instance>,
    ) -> Result<Instance> {
        let cache = self
            .scoped
            .get(&token)
            .map(|entry| Arc::clone(&entry))
            .ok_or_else(|| DiError::NoActiveScope(id.clone()))?;

        let cell = Arc::clone(&cache.entry(id.clone()).or_default());
        cell.get_or_try_init(create).cloned()
    }

    /// Create the empty cache slice for a freshly opened scope.
    pub fn open_scope(&self, token: ScopeToken) {
        #[cfg(feature = "logging")]
        debug!(target: "wirebox", scope = %token, "Opening scope");

        self.scoped.insert(
            token,
            Arc::new(DashMap::with_capacity_and_hasher_and_shard_amount(
                0,
                RandomState::new(),
                8,
            )),
        );
    }

    /// Discard a scope's entire cache slice. Idempotent.
    pub fn close_scope(&self, token: ScopeToken) {
        let removed = self.scoped.remove(&token);

        #[cfg(feature = "logging")]
        if let Some((_, cache)) = &removed {
            debug!(
                target: "wirebox",
                scope = %token,
                instances_dropped = cache.len(),
                "Closing scope"
            );
        }
        #[cfg(not(feature = "logging"))]
        drop(removed);
    }

    /// Evict cached instances for an identity from the singleton cache and
    /// every open scope. Called when a registration is overwritten so the
    /// new registration takes effect on the next resolution.
    pub fn invalidate(&self, id: &ServiceId) {
        let evicted = self.singletons.remove(id).is_some();
        for cache in self.scoped.iter() {
            cache.remove(id);
        }

        #[cfg(feature = "logging")]
        if evicted {
            trace!(target: "wirebox", service = %id, "Evicted cached instance after re-registration");
        }
        #[cfg(not(feature = "logging"))]
        let _ = evicted;
    }

    /// Number of currently open scopes.
    pub fn active_scopes(&self) -> usize {
        self.scoped.len()
    }
}

impl Default for ScopeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ScopeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeStore")
            .field("singletons", &self.singletons.len())
            .field("active_scopes", &self.scoped.len())
            .finish()
    }
}
