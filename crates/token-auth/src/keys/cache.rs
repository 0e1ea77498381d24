//! Raw public key cache.
//!
//! Entries map `endpoint:kid` to the PEM bytes served for that key. There is
//! no TTL: a key identifier names one immutable key, so an entry only leaves
//! the cache when it stops parsing.
//!
//! Both tables are sharded (`DashMap`), so unrelated key identifiers never
//! contend on a single lock. A reader concurrent with a writer for the same
//! entry sees either the old or the new bytes, never a mix.
//!
//! The in-flight table holds one async mutex per key currently being fetched.
//! Concurrent resolutions of the same key queue on it and re-check the cache
//! once they get it, so a burst of requests costs one network round-trip.
//! The mutex is dropped from the table when its last holder releases it; key
//! identifiers come from unverified token headers and must not accumulate.

use bytes::Bytes;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;

/// Cache key for a key identifier served by `endpoint`.
#[must_use]
pub fn cache_key(endpoint: &str, kid: &str) -> String {
    format!("{endpoint}:{kid}")
}

/// Concurrent cache of raw key material.
#[derive(Debug, Default)]
pub struct KeyCache {
    entries: DashMap<String, Bytes>,
    in_flight: DashMap<String, Arc<Mutex<()>>>,
}

impl KeyCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw material stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Store raw material under `key`, replacing any previous value.
    pub fn insert(&self, key: impl Into<String>, material: impl Into<Bytes>) {
        self.entries.insert(key.into(), material.into());
    }

    /// Remove the entry for `key`.
    pub fn remove(&self, key: &str) -> Option<Bytes> {
        self.entries.remove(key).map(|(_, material)| material)
    }

    /// Remove the entry for `key` only if it still holds `material`.
    ///
    /// Returns true if an entry was removed. A concurrent writer that
    /// replaced the bytes in the meantime keeps its value.
    pub fn remove_if_unchanged(&self, key: &str, material: &Bytes) -> bool {
        self.entries
            .remove_if(key, |_, current| current == material)
            .is_some()
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of keys with a fetch guard currently held or awaited.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Wait for exclusive right to fetch `key`.
    ///
    /// Returns `None` if `cancel` fires first.
    pub(crate) async fn acquire(&self, key: &str, cancel: &CancellationToken) -> Option<FetchPermit<'_>> {
        let lock = Arc::clone(&self.in_flight.entry(key.to_string()).or_default());

        let guard = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            guard = lock.lock_owned() => Some(guard),
        };

        let permit = FetchPermit {
            cache: self,
            key: key.to_string(),
            guard,
        };
        // On cancellation the permit is still dropped here, which cleans up
        // the in-flight entry if nobody else is waiting on it.
        permit.guard.is_some().then_some(permit)
    }
}

/// Exclusive right to fetch one key. Released on drop.
#[derive(Debug)]
pub(crate) struct FetchPermit<'a> {
    cache: &'a KeyCache,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for FetchPermit<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the table itself still references the mutex: no holder, no waiter.
        self.cache
            .in_flight
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}
