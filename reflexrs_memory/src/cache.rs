//! In-process read-through cache for single-pattern lookups.
//!
//! Entries expire after a fixed TTL and the least recently used entry is
//! evicted once the cache is full. Readers share a read lock; recency is
//! tracked with a logical clock stored in each entry so a hit never needs the
//! write lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use reflexrs_core::CacheConfig;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// `hits / (hits + misses)`, 0 before any lookup.
    pub hit_ratio: f64,
}

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
    last_access: AtomicU64,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

pub struct QueryCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    capacity: usize,
    ttl: Duration,
    clock: AtomicU64,
    /// Bumped by every write so readers can detect a racing update.
    generation: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V: Clone> QueryCache<V> {
    #[must_use]
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::with_capacity(capacity.min(4096))),
            capacity,
            ttl,
            clock: AtomicU64::new(0),
            generation: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.capacity, config.ttl())
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let entries = self.entries.read();
        match entries.get(key) {
            Some(entry) if !entry.is_expired(Instant::now()) => {
                entry.last_access.store(self.tick(), Ordering::Relaxed);
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value.clone())
            }
            _ => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn set(&self, key: impl Into<String>, value: V) {
        let mut entries = self.entries.write();
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.insert_locked(&mut entries, key.into(), value);
    }

    /// Current write generation, taken before a backend read.
    pub fn snapshot(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Insert `value` only if no write has happened since `snapshot`.
    ///
    /// Returns whether the value was stored.
    pub fn set_if_unchanged(&self, key: impl Into<String>, value: V, snapshot: u64) -> bool {
        let mut entries = self.entries.write();
        if self.generation.load(Ordering::Acquire) != snapshot {
            return false;
        }
        self.insert_locked(&mut entries, key.into(), value);
        true
    }

    /// Return the cached value or compute, store and return it.
    ///
    /// Concurrent callers for the same missing key run `compute` at most once;
    /// the others observe the stored value.
    pub fn get_or_insert_with<F>(&self, key: &str, compute: F) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(value) = self.get(key) {
            return value;
        }

        let mut entries = self.entries.write();
        if let Some(entry) = entries.get(key) {
            if !entry.is_expired(Instant::now()) {
                entry.last_access.store(self.tick(), Ordering::Relaxed);
                return entry.value.clone();
            }
        }

        let value = compute();
        self.insert_locked(&mut entries, key.to_string(), value.clone());
        value
    }

    pub fn invalidate(&self, key: &str) {
        let mut entries = self.entries.write();
        self.generation.fetch_add(1, Ordering::AcqRel);
        entries.remove(key);
    }

    /// Drop every entry and reset the hit/miss counters.
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        self.generation.fetch_add(1, Ordering::AcqRel);
        entries.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    /// Remove expired entries. Returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        let now = Instant::now();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    /// Number of entries that have not expired yet.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .values()
            .filter(|entry| !entry.is_expired(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        CacheStats {
            hits,
            misses,
            hit_ratio: if total == 0 {
                0.0
            } else {
                hits as f64 / total as f64
            },
        }
    }

    fn insert_locked(&self, entries: &mut HashMap<String, CacheEntry<V>>, key: String, value: V) {
        if self.capacity == 0 {
            return;
        }

        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            let now = Instant::now();
            let before = entries.len();
            entries.retain(|_, entry| !entry.is_expired(now));
            if entries.len() < before {
                debug!("Purged {} expired cache entries", before - entries.len());
            }

            if entries.len() >= self.capacity {
                let victim = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.last_access.load(Ordering::Relaxed))
                    .map(|(k, _)| k.clone());
                if let Some(victim) = victim {
                    debug!("Evicting least recently used cache entry {victim}");
                    entries.remove(&victim);
                }
            }
        }

        entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: Instant::now() + self.ttl,
                last_access: AtomicU64::new(self.tick()),
            },
        );
    }
}
