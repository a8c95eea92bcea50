// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Fingerprint -> cache key record cache
//!
//! Losing an entry here only costs recomputation, never a wrong key, as long
//! as key derivation stays deterministic.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{CacheEntryMetadata, CacheKeyRecord};
use crate::config::{ExpirationMode, KeyCacheConfig};
use crate::query::QueryExpr;

/// A materialized key together with the inputs it was derived from.
///
/// Both trees and the salt are kept so a fingerprint hit can be confirmed by
/// structural equality before the record is reused. The canonical key text
/// depends on the original tree as well as the parameter-extracted one, so
/// both must match.
#[derive(Debug)]
pub struct KeyCacheEntry {
    pub record: Arc<CacheKeyRecord>,
    /// Parameter-extracted tree
    pub expression: QueryExpr,
    /// Tree as written, parameters unresolved
    pub original: QueryExpr,
    pub salt: String,
}

impl KeyCacheEntry {
    pub fn matches(&self, expression: &QueryExpr, original: &QueryExpr, salt: &str) -> bool {
        self.salt == salt && &self.expression == expression && &self.original == original
    }
}

/// Storage for materialized keys.
///
/// Implementations must be safe for concurrent use; callers never lock.
pub trait KeyCache: Send + Sync {
    /// Look up an entry; a hit refreshes its expiration window
    fn get(&self, fingerprint: &str) -> Option<Arc<KeyCacheEntry>>;

    fn put(&self, fingerprint: String, entry: Arc<KeyCacheEntry>);

    fn remove(&self, fingerprint: &str) -> bool;

    fn clear(&self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Key cache statistics
#[derive(Debug, Default, Clone)]
pub struct KeyCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub current_entries: usize,
}

impl KeyCacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
struct KeyCacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    insertions: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

/// Metadata sits behind its own mutex so hits only need the map's read lock
#[derive(Debug)]
struct SlidingEntry {
    value: Arc<KeyCacheEntry>,
    metadata: Mutex<CacheEntryMetadata>,
}

/// In-memory key cache with sliding expiration and an entry bound
pub struct SlidingKeyCache {
    entries: RwLock<HashMap<String, SlidingEntry>>,
    sliding_expiration: Duration,
    max_entries: usize,
    counters: KeyCacheCounters,
}

impl SlidingKeyCache {
    pub fn new(sliding_expiration: Duration, max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            sliding_expiration,
            max_entries: max_entries.max(1),
            counters: KeyCacheCounters::default(),
        }
    }

    pub fn from_config(config: &KeyCacheConfig) -> Self {
        Self::new(config.sliding_expiration, config.max_entries)
    }

    pub fn sliding_expiration(&self) -> Duration {
        self.sliding_expiration
    }

    pub fn stats(&self) -> KeyCacheStats {
        KeyCacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            insertions: self.counters.insertions.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            expirations: self.counters.expirations.load(Ordering::Relaxed),
            current_entries: self.entries.read().len(),
        }
    }

    pub(crate) fn get_at(&self, fingerprint: &str, now: Instant) -> Option<Arc<KeyCacheEntry>> {
        {
            let entries = self.entries.read();
            match entries.get(fingerprint) {
                Some(entry) => {
                    let mut metadata = entry.metadata.lock();
                    if !metadata.is_expired_at(now) {
                        metadata.touch(now);
                        self.counters.hits.fetch_add(1, Ordering::Relaxed);
                        return Some(entry.value.clone());
                    }
                }
                None => {
                    self.counters.misses.fetch_add(1, Ordering::Relaxed);
                    return None;
                }
            }
        }

        // Expired: re-check under the write lock, another caller may have
        // replaced the entry in between
        let mut entries = self.entries.write();
        let expired = entries
            .get_mut(fingerprint)
            .map(|entry| entry.metadata.get_mut().is_expired_at(now))
            .unwrap_or(false);
        if expired {
            entries.remove(fingerprint);
            self.counters.expirations.fetch_add(1, Ordering::Relaxed);
        }
        drop(entries);

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub(crate) fn put_at(&self, fingerprint: String, value: Arc<KeyCacheEntry>, now: Instant) {
        let mut entries = self.entries.write();

        if !entries.contains_key(&fingerprint) && entries.len() >= self.max_entries {
            let before = entries.len();
            entries.retain(|_, entry| !entry.metadata.get_mut().is_expired_at(now));
            let expired = before - entries.len();

            let mut evicted = 0;
            while entries.len() >= self.max_entries {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.metadata.lock().last_accessed)
                    .map(|(key, _)| key.clone());
                match oldest {
                    Some(key) => {
                        entries.remove(&key);
                        evicted += 1;
                    }
                    None => break,
                }
            }

            self.counters
                .expirations
                .fetch_add(expired as u64, Ordering::Relaxed);
            self.counters.evictions.fetch_add(evicted, Ordering::Relaxed);
        }

        entries.insert(
            fingerprint,
            SlidingEntry {
                value,
                metadata: Mutex::new(CacheEntryMetadata::new(
                    ExpirationMode::Sliding(self.sliding_expiration),
                    now,
                )),
            },
        );
        drop(entries);

        self.counters.insertions.fetch_add(1, Ordering::Relaxed);
    }

    /// Drop every entry idle for longer than the sliding window
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    pub(crate) fn purge_expired_at(&self, now: Instant) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.metadata.get_mut().is_expired_at(now));
        let purged = before - entries.len();
        drop(entries);

        if purged > 0 {
            self.counters
                .expirations
                .fetch_add(purged as u64, Ordering::Relaxed);
            log::debug!("Purged {} expired cache keys", purged);
        }
        purged
    }
}

impl Default for SlidingKeyCache {
    fn default() -> Self {
        Self::from_config(&KeyCacheConfig::default())
    }
}

impl KeyCache for SlidingKeyCache {
    fn get(&self, fingerprint: &str) -> Option<Arc<KeyCacheEntry>> {
        self.get_at(fingerprint, Instant::now())
    }

    fn put(&self, fingerprint: String, entry: Arc<KeyCacheEntry>) {
        self.put_at(fingerprint, entry, Instant::now())
    }

    fn remove(&self, fingerprint: &str) -> bool {
        self.entries.write().remove(fingerprint).is_some()
    }

    fn clear(&self) {
        self.entries.write().clear();
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::source;
    use std::collections::BTreeSet;

    fn entry(name: &str) -> Arc<KeyCacheEntry> {
        Arc::new(KeyCacheEntry {
            record: Arc::new(CacheKeyRecord {
                key: name.to_string(),
                key_hash: name.to_uppercase(),
                data_sources: BTreeSet::from([name.to_string()]),
            }),
            expression: source(name),
            original: source(name),
            salt: String::new(),
        })
    }

    #[test]
    fn test_access_extends_sliding_window() {
        let cache = SlidingKeyCache::new(Duration::from_secs(60), 10);
        let start = Instant::now();

        cache.put_at("fp".to_string(), entry("Orders"), start);
        assert!(cache.get_at("fp", start + Duration::from_secs(50)).is_some());
        // 100s after insertion but only 50s after the last access
        assert!(cache.get_at("fp", start + Duration::from_secs(100)).is_some());
        // Idle for longer than the window
        assert!(cache.get_at("fp", start + Duration::from_secs(161)).is_none());
        assert_eq!(cache.len(), 0);

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.expirations, 1);
    }

    #[test]
    fn test_evicts_least_recently_accessed() {
        let cache = SlidingKeyCache::new(Duration::from_secs(600), 2);
        let start = Instant::now();

        cache.put_at("a".to_string(), entry("A"), start);
        cache.put_at("b".to_string(), entry("B"), start + Duration::from_secs(1));
        // Touch "a" so "b" becomes the eviction candidate
        assert!(cache.get_at("a", start + Duration::from_secs(2)).is_some());
        cache.put_at("c".to_string(), entry("C"), start + Duration::from_secs(3));

        assert_eq!(cache.len(), 2);
        assert!(cache.get_at("a", start + Duration::from_secs(4)).is_some());
        assert!(cache.get_at("b", start + Duration::from_secs(4)).is_none());
        assert!(cache.get_at("c", start + Duration::from_secs(4)).is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_expired_entries_make_room_first() {
        let cache = SlidingKeyCache::new(Duration::from_secs(10), 2);
        let start = Instant::now();

        cache.put_at("old".to_string(), entry("Old"), start);
        cache.put_at("recent".to_string(), entry("Recent"), start + Duration::from_secs(15));
        cache.put_at("new".to_string(), entry("New"), start + Duration::from_secs(16));

        let stats = cache.stats();
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.evictions, 0);
        assert!(cache.get_at("recent", start + Duration::from_secs(17)).is_some());
    }

    #[test]
    fn test_purge_and_clear() {
        let cache = SlidingKeyCache::new(Duration::from_secs(10), 10);
        let start = Instant::now();
        cache.put_at("a".to_string(), entry("A"), start);
        cache.put_at("b".to_string(), entry("B"), start + Duration::from_secs(8));

        assert_eq!(cache.purge_expired_at(start + Duration::from_secs(12)), 1);
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
        assert!(!cache.remove("b"));
    }

    #[test]
    fn test_hits_only_take_read_lock() {
        let cache = SlidingKeyCache::new(Duration::from_secs(60), 10);
        let start = Instant::now();
        cache.put_at("fp".to_string(), entry("Orders"), start);

        // A writer-only lookup would block forever here
        let held = cache.entries.read_recursive();
        assert!(cache.get_at("fp", start + Duration::from_secs(1)).is_some());
        assert!(cache.get_at("missing", start + Duration::from_secs(1)).is_none());
        drop(held);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_entry_match_requires_both_trees() {
        let entry = entry("Orders");
        assert!(entry.matches(&source("Orders"), &source("Orders"), ""));
        assert!(!entry.matches(&source("Orders"), &source("Customers"), ""));
        assert!(!entry.matches(&source("Orders"), &source("Orders"), "salt"));
    }
}
