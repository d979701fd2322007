//! Cache Store Module
//!
//! Main cache engine combining an ordered LRU map with TTL expiration.

use std::time::Duration;

use lru::LruCache;
use serde::Serialize;
use tokio::time::Instant;
use tracing::debug;

use crate::cache::{CacheEntry, CacheStats};

// == Entry Snapshot ==
/// Read-only view of one resident entry, used for inspection.
#[derive(Debug, Clone, Serialize)]
pub struct EntrySnapshot {
    pub key: String,
    pub age_ms: u64,
    pub ttl_remaining_ms: u64,
    pub expired: bool,
}

// == Cache Store ==
/// Bounded key-value store with per-entry TTL and LRU eviction.
///
/// The store itself is not synchronized; share it as [`SharedCache`]
/// so every operation runs under one lock.
///
/// [`SharedCache`]: crate::cache::SharedCache
#[derive(Debug)]
pub struct CacheStore<V> {
    /// Entries ordered from most to least recently used
    entries: LruCache<String, CacheEntry<V>>,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    max_entries: usize,
    /// TTL for entries written without an explicit one
    default_ttl: Duration,
    /// Minimum spacing between expiry sweeps triggered by `set`
    sweep_interval: Duration,
    last_sweep: Instant,
}

impl<V: Clone> CacheStore<V> {
    // == Constructor ==
    /// Creates a new CacheStore with specified capacity and default TTL.
    ///
    /// # Arguments
    /// * `max_entries` - Maximum number of entries the cache can hold
    /// * `default_ttl` - TTL for entries written without an explicit one
    pub fn new(max_entries: usize, default_ttl: Duration) -> Self {
        Self {
            entries: LruCache::unbounded(),
            stats: CacheStats::new(),
            max_entries,
            default_ttl,
            sweep_interval: Duration::from_secs(60),
            last_sweep: Instant::now(),
        }
    }

    /// Overrides how often `set` sweeps expired entries.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    // == Set ==
    /// Stores a value with optional TTL.
    ///
    /// Overwriting an existing key resets its TTL and recency without
    /// evicting anything. Inserting a new key into a full cache evicts the
    /// least recently used entries first.
    pub fn set(&mut self, key: String, value: V, ttl: Option<Duration>) {
        self.maybe_sweep();
        self.stats.record_set();

        if self.max_entries == 0 {
            return;
        }

        if !self.entries.contains(&key) {
            while self.entries.len() >= self.max_entries {
                match self.entries.pop_lru() {
                    Some((evicted, _)) => {
                        debug!(key = %evicted, "Evicted least recently used entry");
                        self.stats.record_eviction();
                    }
                    None => break,
                }
            }
        }

        let entry = CacheEntry::new(value, ttl.unwrap_or(self.default_ttl));
        // put() moves an existing key to the most recently used position
        self.entries.put(key, entry);
        self.stats.set_total_entries(self.entries.len());
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// A hit promotes the key to most recently used. An expired entry is
    /// removed and counted as a miss.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let expired = match self.entries.peek(key) {
            Some(entry) => entry.is_expired(),
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        if expired {
            self.entries.pop(key);
            self.stats.set_total_entries(self.entries.len());
            self.stats.record_miss();
            return None;
        }

        let value = self.entries.get(key).map(|entry| entry.value.clone());
        self.stats.record_hit();
        value
    }

    // == Peek ==
    /// Reads a live value without touching recency or counters.
    pub fn peek(&self, key: &str) -> Option<&V> {
        self.entries
            .peek(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| &entry.value)
    }

    // == Delete ==
    /// Removes an entry by key, returning whether it was present.
    pub fn delete(&mut self, key: &str) -> bool {
        let removed = self.entries.pop(key).is_some();
        self.stats.set_total_entries(self.entries.len());
        removed
    }

    // == Clear ==
    /// Drops every entry. Counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.stats.set_total_entries(0);
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    // == Snapshot ==
    /// Lists resident entries from most to least recently used.
    pub fn snapshot(&self) -> Vec<EntrySnapshot> {
        self.entries
            .iter()
            .map(|(key, entry)| EntrySnapshot {
                key: key.clone(),
                age_ms: entry.age().as_millis() as u64,
                ttl_remaining_ms: entry.ttl_remaining().as_millis() as u64,
                expired: entry.is_expired(),
            })
            .collect()
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = Instant::now();
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.entries.pop(key);
        }

        self.last_sweep = now;
        self.stats.set_total_entries(self.entries.len());
        expired_keys.len()
    }

    fn maybe_sweep(&mut self) {
        if self.last_sweep.elapsed() >= self.sweep_interval {
            let removed = self.cleanup_expired();
            if removed > 0 {
                debug!(removed, "Swept expired entries during set");
            }
        }
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }
}
