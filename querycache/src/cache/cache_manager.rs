// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Central cache management and coordination

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use super::{
    CacheKeyProvider, CacheKeyRecord, GenerationSnapshot, InvalidationEvent, InvalidationManager,
    InvalidationResult, InvalidationStats, ResultCache, ResultCacheStats,
};
use crate::config::{CacheConfig, ExpirationMode};
use crate::error::{CacheError, CacheResult};
use crate::query::{CacheableQuery, QueryResult};

/// Per-call caching options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CachePolicy {
    /// Overrides the configured default expiration
    pub expiration: Option<ExpirationMode>,
    /// Forces otherwise identical queries into distinct entries
    pub salt: String,
}

impl CachePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn absolute(ttl: Duration) -> Self {
        Self::new().with_expiration(ExpirationMode::Absolute(ttl))
    }

    pub fn sliding(window: Duration) -> Self {
        Self::new().with_expiration(ExpirationMode::Sliding(window))
    }

    pub fn with_expiration(mut self, expiration: ExpirationMode) -> Self {
        self.expiration = Some(expiration);
        self
    }

    pub fn with_salt(mut self, salt: impl Into<String>) -> Self {
        self.salt = salt.into();
        self
    }
}

/// Snapshot of all cache statistics
#[derive(Debug, Clone)]
pub struct CacheManagerStats {
    pub key_cache_entries: usize,
    pub results: ResultCacheStats,
    pub invalidation: InvalidationStats,
}

/// Coordinates key derivation, the result cache and invalidation
pub struct CacheManager {
    config: CacheConfig,
    key_provider: CacheKeyProvider,
    results: Arc<ResultCache>,
    invalidation: InvalidationManager,
}

impl CacheManager {
    pub fn new(config: CacheConfig, key_provider: CacheKeyProvider) -> Self {
        let results = Arc::new(ResultCache::from_config(&config.result_cache));
        let invalidation =
            InvalidationManager::new(results.clone(), config.invalidation_history_size);

        Self {
            config,
            key_provider,
            results,
            invalidation,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn key_provider(&self) -> &CacheKeyProvider {
        &self.key_provider
    }

    pub fn results(&self) -> &Arc<ResultCache> {
        &self.results
    }

    /// Derive the cache key of `query` under `policy`
    pub fn cache_key(
        &self,
        query: &dyn CacheableQuery,
        policy: &CachePolicy,
    ) -> CacheResult<Arc<CacheKeyRecord>> {
        self.key_provider.get_cache_key_for(query, &policy.salt)
    }

    /// Return the cached result of `query`, or run `execute` and cache what
    /// it returns.
    ///
    /// Errors from `execute` are returned as-is and nothing is cached. When
    /// caching is disabled `execute` always runs and no key is derived.
    pub fn get_or_execute<F, E>(
        &self,
        query: &dyn CacheableQuery,
        policy: &CachePolicy,
        execute: F,
    ) -> Result<Arc<QueryResult>, E>
    where
        F: FnOnce() -> Result<QueryResult, E>,
        E: From<CacheError>,
    {
        if !self.config.enabled {
            return execute().map(Arc::new);
        }

        let record = self.cache_key(query, policy)?;

        if let Some(result) = self.results.get(&record.key_hash) {
            log::debug!("Result cache hit for {}", record.key_hash);
            return Ok(result);
        }

        let snapshot = self.snapshot(&record);
        let result = Arc::new(execute()?);

        let stored = self.results.insert_if_current(
            &record.key_hash,
            &record.data_sources,
            result.clone(),
            self.expiration_for(policy),
            &snapshot,
        );
        if !stored {
            log::debug!(
                "Data sources of {} changed during execution; result not cached",
                record.key_hash
            );
        }

        Ok(result)
    }

    /// Look up a cached result by key record
    pub fn lookup(&self, record: &CacheKeyRecord) -> Option<Arc<QueryResult>> {
        if !self.config.enabled {
            return None;
        }
        self.results.get(&record.key_hash)
    }

    /// Capture the generations of `record`'s data sources; take this before
    /// running the query and hand it to [`store`](Self::store)
    pub fn snapshot(&self, record: &CacheKeyRecord) -> GenerationSnapshot {
        self.results.snapshot(&record.data_sources)
    }

    /// Store a result under `record`, tagged with its data sources.
    ///
    /// Rejected, returning `false`, when any of those sources was
    /// invalidated (or the cache cleared) after `snapshot` was taken.
    pub fn store(
        &self,
        record: &CacheKeyRecord,
        result: QueryResult,
        policy: &CachePolicy,
        snapshot: &GenerationSnapshot,
    ) -> bool {
        if !self.config.enabled {
            return false;
        }
        self.results.insert_if_current(
            &record.key_hash,
            &record.data_sources,
            Arc::new(result),
            self.expiration_for(policy),
            snapshot,
        )
    }

    /// Invalidate every cached result depending on any of `data_sources`
    pub fn invalidate<S: AsRef<str>>(&self, data_sources: &[S]) -> InvalidationResult {
        self.invalidation.invalidate(data_sources)
    }

    pub fn handle_event(&self, event: InvalidationEvent) -> InvalidationResult {
        self.invalidation.handle_event(event)
    }

    pub fn invalidation(&self) -> &InvalidationManager {
        &self.invalidation
    }

    /// Key hashes of cached results depending on any of `data_sources`
    pub fn dependent_keys<S: AsRef<str>>(&self, data_sources: &[S]) -> BTreeSet<String> {
        data_sources
            .iter()
            .flat_map(|name| self.results.keys_for(name.as_ref()))
            .collect()
    }

    /// Drop all cached results and materialized keys
    pub fn clear(&self) {
        self.invalidation.handle_event(InvalidationEvent::ClearAll);
        self.key_provider.key_cache().clear();
    }

    pub fn stats(&self) -> CacheManagerStats {
        CacheManagerStats {
            key_cache_entries: self.key_provider.key_cache().len(),
            results: self.results.stats(),
            invalidation: self.invalidation.stats(),
        }
    }

    fn expiration_for(&self, policy: &CachePolicy) -> ExpirationMode {
        policy
            .expiration
            .unwrap_or(self.config.result_cache.default_expiration)
    }
}
