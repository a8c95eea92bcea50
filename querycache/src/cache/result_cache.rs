// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query result caching implementation
//!
//! Results are stored under their cache key hash and tagged with the data
//! sources of the key record. The tag index and the entries live under one
//! lock so an invalidation can never miss an entry that is being inserted.
//!
//! Each data source carries a generation counter bumped on invalidation. A
//! caller snapshots the generations before running a query and inserts with
//! [`ResultCache::insert_if_current`], which rejects the result if any of its
//! sources were invalidated in the meantime.

use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use super::CacheEntryMetadata;
use crate::config::{ExpirationMode, ResultCacheConfig};
use crate::query::QueryResult;

#[derive(Debug)]
struct ResultEntry {
    result: Arc<QueryResult>,
    data_sources: BTreeSet<String>,
    metadata: CacheEntryMetadata,
}

#[derive(Debug, Default)]
struct ResultCacheState {
    entries: HashMap<String, ResultEntry>,
    /// data source -> key hashes of results tagged with it
    tag_index: HashMap<String, HashSet<String>>,
    generations: HashMap<String, u64>,
    /// Bumped by `clear`
    epoch: u64,
}

impl ResultCacheState {
    fn remove_entry(&mut self, key_hash: &str) -> Option<ResultEntry> {
        let entry = self.entries.remove(key_hash)?;
        for data_source in &entry.data_sources {
            if let Some(keys) = self.tag_index.get_mut(data_source) {
                keys.remove(key_hash);
                if keys.is_empty() {
                    self.tag_index.remove(data_source);
                }
            }
        }
        Some(entry)
    }

    fn generation(&self, data_source: &str) -> u64 {
        self.generations.get(data_source).copied().unwrap_or(0)
    }

    fn is_current(&self, snapshot: &GenerationSnapshot) -> bool {
        snapshot.epoch == self.epoch
            && snapshot
                .generations
                .iter()
                .all(|(name, generation)| self.generation(name) == *generation)
    }
}

/// Data source generations observed before a query ran
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationSnapshot {
    epoch: u64,
    generations: Vec<(String, u64)>,
}

/// Result cache statistics
#[derive(Debug, Default, Clone)]
pub struct ResultCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
    pub stale_rejections: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub invalidations: u64,
    pub current_entries: usize,
}

impl ResultCacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Result cache keyed by cache key hash
pub struct ResultCache {
    state: RwLock<ResultCacheState>,
    max_entries: usize,
    stats: RwLock<ResultCacheStats>,
}

impl ResultCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            state: RwLock::new(ResultCacheState::default()),
            max_entries: max_entries.max(1),
            stats: RwLock::new(ResultCacheStats::default()),
        }
    }

    pub fn from_config(config: &ResultCacheConfig) -> Self {
        Self::new(config.max_entries)
    }

    /// Get a cached result if present and not expired
    pub fn get(&self, key_hash: &str) -> Option<Arc<QueryResult>> {
        self.get_at(key_hash, Instant::now())
    }

    pub(crate) fn get_at(&self, key_hash: &str, now: Instant) -> Option<Arc<QueryResult>> {
        let mut state = self.state.write();

        let expired = match state.entries.get_mut(key_hash) {
            Some(entry) if !entry.metadata.is_expired_at(now) => {
                entry.metadata.touch(now);
                let result = entry.result.clone();
                drop(state);
                self.stats.write().hits += 1;
                return Some(result);
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            state.remove_entry(key_hash);
        }
        drop(state);

        let mut stats = self.stats.write();
        stats.misses += 1;
        if expired {
            stats.expirations += 1;
        }
        None
    }

    /// Capture the current generations of `data_sources`
    pub fn snapshot(&self, data_sources: &BTreeSet<String>) -> GenerationSnapshot {
        let state = self.state.read();
        GenerationSnapshot {
            epoch: state.epoch,
            generations: data_sources
                .iter()
                .map(|name| (name.clone(), state.generation(name)))
                .collect(),
        }
    }

    /// Insert a result unconditionally
    pub fn insert(
        &self,
        key_hash: &str,
        data_sources: &BTreeSet<String>,
        result: Arc<QueryResult>,
        expiration: ExpirationMode,
    ) {
        let mut state = self.state.write();
        self.insert_locked(&mut state, key_hash, data_sources, result, expiration, Instant::now());
    }

    /// Insert a result unless one of its data sources was invalidated (or
    /// the cache cleared) since `snapshot` was taken. Returns whether the
    /// result was stored.
    pub fn insert_if_current(
        &self,
        key_hash: &str,
        data_sources: &BTreeSet<String>,
        result: Arc<QueryResult>,
        expiration: ExpirationMode,
        snapshot: &GenerationSnapshot,
    ) -> bool {
        let mut state = self.state.write();
        if !state.is_current(snapshot) {
            drop(state);
            self.stats.write().stale_rejections += 1;
            log::debug!("Rejected stale result for {}", key_hash);
            return false;
        }
        self.insert_locked(&mut state, key_hash, data_sources, result, expiration, Instant::now());
        true
    }

    fn insert_locked(
        &self,
        state: &mut ResultCacheState,
        key_hash: &str,
        data_sources: &BTreeSet<String>,
        result: Arc<QueryResult>,
        expiration: ExpirationMode,
        now: Instant,
    ) {
        // Replacing an entry must drop its old tags first
        state.remove_entry(key_hash);

        let (expired, evicted) = self.evict_if_needed(state, now);

        for data_source in data_sources {
            state
                .tag_index
                .entry(data_source.clone())
                .or_default()
                .insert(key_hash.to_string());
        }
        state.entries.insert(
            key_hash.to_string(),
            ResultEntry {
                result,
                data_sources: data_sources.clone(),
                metadata: CacheEntryMetadata::new(expiration, now),
            },
        );

        let mut stats = self.stats.write();
        stats.insertions += 1;
        stats.expirations += expired;
        stats.evictions += evicted;
    }

    fn evict_if_needed(&self, state: &mut ResultCacheState, now: Instant) -> (u64, u64) {
        if state.entries.len() < self.max_entries {
            return (0, 0);
        }

        let expired_keys: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.metadata.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired_keys {
            state.remove_entry(key);
        }

        let mut evicted = 0;
        while state.entries.len() >= self.max_entries {
            let oldest = state
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.metadata.last_accessed)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    state.remove_entry(&key);
                    evicted += 1;
                }
                None => break,
            }
        }

        (expired_keys.len() as u64, evicted)
    }

    /// Remove every result tagged with any of `data_sources` and bump their
    /// generations. Returns the removed key hashes, sorted.
    pub fn invalidate_data_sources<S: AsRef<str>>(&self, data_sources: &[S]) -> Vec<String> {
        let mut state = self.state.write();

        let mut affected = BTreeSet::new();
        for data_source in data_sources {
            let name = data_source.as_ref();
            *state.generations.entry(name.to_string()).or_insert(0) += 1;
            if let Some(keys) = state.tag_index.get(name) {
                affected.extend(keys.iter().cloned());
            }
        }

        let removed: Vec<String> = affected
            .into_iter()
            .filter(|key| state.remove_entry(key).is_some())
            .collect();
        drop(state);

        self.stats.write().invalidations += removed.len() as u64;
        removed
    }

    /// Key hashes currently tagged with `data_source`
    pub fn keys_for(&self, data_source: &str) -> BTreeSet<String> {
        self.state
            .read()
            .tag_index
            .get(data_source)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn remove(&self, key_hash: &str) -> bool {
        self.state.write().remove_entry(key_hash).is_some()
    }

    /// Drop every result; in-flight inserts taken before the clear are rejected
    pub fn clear(&self) -> usize {
        let mut state = self.state.write();
        let removed = state.entries.len();
        state.entries.clear();
        state.tag_index.clear();
        state.epoch += 1;
        removed
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> ResultCacheStats {
        let mut stats = self.stats.read().clone();
        stats.current_entries = self.len();
        stats
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::from_config(&ResultCacheConfig::default())
    }
}
