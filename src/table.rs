//! Registration table
//!
//! Lock-free storage mapping service identities to registrations, using
//! `DashMap` with `ahash` for concurrent access without blocking readers.

use crate::identity::ServiceId;
use crate::registration::Registration;
use ahash::RandomState;
use dashmap::DashMap;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::debug;

/// Thread-safe table of registrations keyed by [`ServiceId`].
///
/// Writers go through `DashMap`'s internal shard locks, so concurrent
/// readers observe either the old or the new registration atomically,
/// never a partial write. Inserting at an existing identity overwrites it:
/// last-write-wins, no error.
pub(crate) struct RegistrationTable {
    entries: DashMap<ServiceId, Arc<Registration>, RandomState>,
}

impl RegistrationTable {
    /// Create an empty table.
    ///
    /// Uses 8 shards: DI tables typically hold well under 50 entries, and
    /// the DashMap default of `num_cpus * 4` shards only slows creation.
    pub fn new() -> Self {
        Self {
            entries: DashMap::with_capacity_and_hasher_and_shard_amount(0, RandomState::new(), 8),
        }
    }

    /// Insert a registration, overwriting any prior one at the same identity.
    ///
    /// Returns the replaced registration so the caller can invalidate any
    /// instances cached under the old one.
    pub fn insert(&self, registration: Registration) -> Option<Arc<Registration>> {
        #[cfg(feature = "logging")]
        debug!(
            target: "wirebox",
            service = %registration.id(),
            lifecycle = registration.lifecycle().label(),
            "Registering service"
        );

        self.entries
            .insert(registration.id().clone(), Arc::new(registration))
    }

    /// Look up the registration for an identity.
    pub fn lookup(&self, id: &ServiceId) -> Option<Arc<Registration>> {
        self.entries.get(id).map(|entry| Arc::clone(&entry))
    }

    /// Whether any registration exists for an identity.
    pub fn contains(&self, id: &ServiceId) -> bool {
        self.entries.contains_key(id)
    }

    /// Snapshot of all registrations. Iteration order is unspecified.
    pub fn snapshot(&self) -> Vec<Arc<Registration>> {
        self.entries.iter().map(|entry| Arc::clone(&entry)).collect()
    }

    /// Number of registered identities.
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Default for RegistrationTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RegistrationTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationTable")
            .field("count", &self.len())
            .finish()
    }
}
