// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Short-lived, process-local discovery caches.
//!
//! Some discovery calls return data that rarely changes (route tables in the
//! control plane account, hosted zone ids). Steps keep those results in a
//! [`TtlCache`] keyed by the reconciliation generation and the cluster id, so
//! repeated passes for the same generation skip the cloud round trip.
//!
//! Caches only save latency. Every step behaves the same with an empty cache,
//! and a new generation of the watched object never sees old entries.

use crate::context::ClusterIdentity;
use crate::metrics::record_cache_lookup;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// Cache key: `(generation, cluster id)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Generation of the watched object
    pub generation: i64,
    /// Cluster id
    pub id: String,
}

impl From<&ClusterIdentity> for CacheKey {
    fn from(identity: &ClusterIdentity) -> Self {
        Self {
            generation: identity.generation,
            id: identity.id.clone(),
        }
    }
}

/// Thread-safe cache whose entries expire after a fixed TTL.
///
/// Shared between concurrent passes of different clusters through an `Arc`.
#[derive(Debug)]
pub struct TtlCache<V> {
    name: &'static str,
    ttl: Duration,
    entries: DashMap<CacheKey, (Instant, V)>,
}

impl<V: Clone> TtlCache<V> {
    /// Create an empty cache. `name` labels the cache metrics.
    #[must_use]
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            ttl,
            entries: DashMap::new(),
        }
    }

    /// Lifetime of an entry.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached value for `key`, if present and not expired.
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        let ttl = self.ttl;
        // The shard guard must be released before an expired entry is removed.
        let cached = self.entries.get(key).map(|entry| {
            let (inserted, value) = entry.value();
            (inserted.elapsed() < ttl).then(|| value.clone())
        });

        let value = match cached {
            Some(Some(value)) => Some(value),
            Some(None) => {
                self.entries
                    .remove_if(key, |_, (inserted, _)| inserted.elapsed() >= ttl);
                None
            }
            None => None,
        };

        record_cache_lookup(self.name, value.is_some());
        debug!(
            cache = self.name,
            cluster = %key.id,
            generation = key.generation,
            hit = value.is_some(),
            "Cache lookup"
        );
        value
    }

    /// Store `value` for `key`, replacing any previous entry.
    ///
    /// Expired entries of other keys are dropped on the way.
    pub fn set(&self, key: CacheKey, value: V) {
        let ttl = self.ttl;
        self.entries
            .retain(|_, (inserted, _)| inserted.elapsed() < ttl);
        self.entries.insert(key, (Instant::now(), value));
    }

    /// Number of entries, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod cache_tests;
