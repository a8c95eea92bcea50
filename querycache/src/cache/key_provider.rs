// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cache key derivation for queries
//!
//! Deriving a key runs in two stages. A cheap fingerprint, built from the
//! structural hashes of the original and the parameter-extracted tree plus
//! each parameter's name and value hash, probes the key cache. Only on a miss is the full
//! canonical text rendered, hashed and tagged with the query's data sources.

use std::fmt::Write;
use std::sync::Arc;

use super::key_cache::{KeyCache, KeyCacheEntry};
use super::CacheKeyRecord;
use crate::error::CacheResult;
use crate::hash::{hash_code, CacheKeyHashProvider};
use crate::query::{describe, print_plan, CacheableQuery, ParameterValues, QueryExpr};

/// Materializes cache keys for queries
#[derive(Clone)]
pub struct CacheKeyProvider {
    hash_provider: Arc<dyn CacheKeyHashProvider>,
    key_cache: Arc<dyn KeyCache>,
}

impl CacheKeyProvider {
    pub fn new(hash_provider: Arc<dyn CacheKeyHashProvider>, key_cache: Arc<dyn KeyCache>) -> Self {
        Self {
            hash_provider,
            key_cache,
        }
    }

    pub fn key_cache(&self) -> &Arc<dyn KeyCache> {
        &self.key_cache
    }

    pub fn hash_provider(&self) -> &Arc<dyn CacheKeyHashProvider> {
        &self.hash_provider
    }

    /// Derive the cache key of `query` using its own expression tree
    pub fn get_cache_key_for(
        &self,
        query: &dyn CacheableQuery,
        salt: &str,
    ) -> CacheResult<Arc<CacheKeyRecord>> {
        self.get_cache_key(query, query.expression(), salt)
    }

    /// Derive the cache key of `expression` as compiled by `query`'s engine.
    ///
    /// `salt` forces otherwise identical queries into distinct entries.
    /// Fails if the engine capability is missing or a parameter is unbound;
    /// no partial key is ever returned.
    pub fn get_cache_key(
        &self,
        query: &dyn CacheableQuery,
        expression: &QueryExpr,
        salt: &str,
    ) -> CacheResult<Arc<CacheKeyRecord>> {
        let compiler = query.compiler()?;
        let mut context = compiler.create_query_context()?;
        let extracted = compiler.extract_parameters(expression, &mut context)?;

        let fingerprint =
            self.fingerprint(expression, &extracted, &context.parameter_values, salt);

        if let Some(entry) = self.key_cache.get(&fingerprint) {
            if entry.matches(&extracted, expression, salt) {
                log::debug!("Cache key hit for fingerprint {}", fingerprint);
                return Ok(entry.record.clone());
            }
            log::warn!(
                "Fingerprint {} collided with a different query; rebuilding its cache key",
                fingerprint
            );
        }

        let debug_view = describe(expression);
        let key = format!(
            "{};{};{}",
            print_plan(&extracted),
            debug_view.debug_view,
            salt
        );
        let key_hash = self.hash_provider.compute_hash(&key);

        let record = Arc::new(CacheKeyRecord {
            key,
            key_hash,
            data_sources: debug_view.data_sources,
        });

        log::debug!(
            "Materialized cache key {} for fingerprint {} (data sources: {:?})",
            record.key_hash,
            fingerprint,
            record.data_sources
        );

        self.key_cache.put(
            fingerprint,
            Arc::new(KeyCacheEntry {
                record: record.clone(),
                expression: extracted,
                original: expression.clone(),
                salt: salt.to_string(),
            }),
        );

        Ok(record)
    }

    /// Cheap lookup key: both tree hashes, then `name=valuehash;` per
    /// parameter in discovery order, then the salt
    fn fingerprint(
        &self,
        original: &QueryExpr,
        extracted: &QueryExpr,
        parameters: &ParameterValues,
        salt: &str,
    ) -> String {
        let mut expression_key = format!("{};{};", hash_code(original), hash_code(extracted));
        for (name, value) in parameters.iter() {
            if value.is_null() {
                let _ = write!(expression_key, "{}=;", name);
            } else {
                let _ = write!(expression_key, "{}={};", name, hash_code(value));
            }
        }
        let _ = write!(expression_key, "salt={};", salt);

        self.hash_provider.compute_hash(&expression_key)
    }
}
