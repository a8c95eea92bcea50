// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Registration of the cache services
//!
//! The hash provider and key cache are injected once, when the services are
//! built. Building fails with a configuration error if either is missing,
//! so a misconfigured host is detected at startup rather than on the first
//! query.
//!
//! # Example
//!
//! ```rust,ignore
//! use querycache::{CacheServicesBuilder, CachePolicy, Query, source};
//!
//! let services = CacheServicesBuilder::with_defaults().build()?;
//! let manager = services.cache_manager();
//!
//! let query = Query::new(source("Orders"));
//! let result = manager.get_or_execute(&query, &CachePolicy::new(), || run(&query))?;
//! ```

use std::sync::Arc;

use crate::cache::{CacheKeyProvider, CacheManager, KeyCache, SlidingKeyCache};
use crate::config::CacheConfig;
use crate::error::{CacheError, CacheResult};
use crate::hash::{CacheKeyHashProvider, XxHashProvider};

/// Collects the services the cache depends on
#[derive(Default)]
pub struct CacheServicesBuilder {
    hash_provider: Option<Arc<dyn CacheKeyHashProvider>>,
    key_cache: Option<Arc<dyn KeyCache>>,
    /// Create a `SlidingKeyCache` from the config when none is registered
    default_key_cache: bool,
    config: CacheConfig,
}

impl CacheServicesBuilder {
    /// An empty builder; both services must be registered before `build`
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder with the xxHash provider and a sliding key cache sized from
    /// the configuration
    pub fn with_defaults() -> Self {
        Self {
            default_key_cache: true,
            ..Self::new()
        }
        .hash_provider(Arc::new(XxHashProvider::new()))
    }

    pub fn hash_provider(mut self, hash_provider: Arc<dyn CacheKeyHashProvider>) -> Self {
        self.hash_provider = Some(hash_provider);
        self
    }

    pub fn key_cache(mut self, key_cache: Arc<dyn KeyCache>) -> Self {
        self.key_cache = Some(key_cache);
        self
    }

    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate the configuration and wire the services together.
    ///
    /// A builder from [`with_defaults`](Self::with_defaults) creates its key
    /// cache here so it follows the final configuration.
    pub fn build(self) -> CacheResult<CacheServices> {
        self.config.validate()?;

        let hash_provider = self.hash_provider.ok_or_else(|| {
            CacheError::Configuration("cache key hash provider not registered".to_string())
        })?;

        let key_cache = match self.key_cache {
            Some(key_cache) => key_cache,
            None if self.default_key_cache => {
                Arc::new(SlidingKeyCache::from_config(&self.config.key_cache)) as Arc<dyn KeyCache>
            }
            None => {
                return Err(CacheError::Configuration(
                    "key cache not registered".to_string(),
                ))
            }
        };

        log::info!(
            "Cache services initialized (enabled: {}, key window: {:?})",
            self.config.enabled,
            self.config.key_cache.sliding_expiration
        );

        let key_provider = CacheKeyProvider::new(hash_provider, key_cache);
        let cache_manager = Arc::new(CacheManager::new(self.config, key_provider.clone()));

        Ok(CacheServices {
            key_provider,
            cache_manager,
        })
    }
}

/// The wired cache services, shared by every query of a host
#[derive(Clone)]
pub struct CacheServices {
    key_provider: CacheKeyProvider,
    cache_manager: Arc<CacheManager>,
}

impl CacheServices {
    pub fn key_provider(&self) -> &CacheKeyProvider {
        &self.key_provider
    }

    pub fn cache_manager(&self) -> Arc<CacheManager> {
        self.cache_manager.clone()
    }
}
