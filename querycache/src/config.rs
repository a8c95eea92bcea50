// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cache configuration and policies

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{CacheError, CacheResult};

/// Default sliding window for materialized cache keys (7 minutes)
pub const DEFAULT_KEY_SLIDING_EXPIRATION: Duration = Duration::from_secs(7 * 60);

/// Global cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable/disable result caching entirely
    pub enabled: bool,

    /// Key cache (fingerprint -> cache key record)
    pub key_cache: KeyCacheConfig,

    /// Result cache (key hash -> query result)
    pub result_cache: ResultCacheConfig,

    /// Number of invalidation events kept for inspection
    pub invalidation_history_size: usize,
}

/// Configuration for the key cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyCacheConfig {
    /// Entries unaccessed for this long are evicted
    pub sliding_expiration: Duration,

    /// Maximum number of materialized keys
    pub max_entries: usize,
}

/// Configuration for the result cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultCacheConfig {
    /// Maximum number of cached result sets
    pub max_entries: usize,

    /// Expiration applied when a call does not specify one
    pub default_expiration: ExpirationMode,
}

/// Expiration policy for a cached result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExpirationMode {
    /// Lives until evicted or invalidated
    #[default]
    Never,
    /// Expires a fixed duration after insertion
    Absolute(Duration),
    /// Expires after being unaccessed for the duration
    Sliding(Duration),
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            key_cache: KeyCacheConfig::default(),
            result_cache: ResultCacheConfig::default(),
            invalidation_history_size: 100,
        }
    }
}

impl Default for KeyCacheConfig {
    fn default() -> Self {
        Self {
            sliding_expiration: DEFAULT_KEY_SLIDING_EXPIRATION,
            max_entries: 10_000,
        }
    }
}

impl Default for ResultCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 5_000,
            default_expiration: ExpirationMode::Absolute(Duration::from_secs(1800)), // 30 minutes
        }
    }
}

impl ExpirationMode {
    pub fn is_expired(&self, created_at_age: Duration, idle: Duration) -> bool {
        match self {
            ExpirationMode::Never => false,
            ExpirationMode::Absolute(ttl) => created_at_age > *ttl,
            ExpirationMode::Sliding(window) => idle > *window,
        }
    }
}

impl CacheConfig {
    /// Create configuration for read-heavy workloads where queries repeat a lot
    pub fn read_optimized() -> Self {
        Self {
            key_cache: KeyCacheConfig {
                max_entries: 50_000,
                ..KeyCacheConfig::default()
            },
            result_cache: ResultCacheConfig {
                max_entries: 20_000,
                default_expiration: ExpirationMode::Sliding(Duration::from_secs(3600)), // 1 hour
            },
            ..Self::default()
        }
    }

    /// Create configuration for memory-constrained environments
    pub fn memory_constrained() -> Self {
        let mut config = Self::default();
        config.key_cache.max_entries = 1_000;
        config.key_cache.sliding_expiration = Duration::from_secs(120);
        config.result_cache.max_entries = 500;
        config.invalidation_history_size = 20;
        config
    }

    /// Parse a JSON configuration document
    pub fn from_json_str(json: &str) -> CacheResult<Self> {
        let config: CacheConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> CacheResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        log::debug!("Loaded cache configuration from {}", path.as_ref().display());
        Self::from_json_str(&contents)
    }

    /// Validate the configuration
    pub fn validate(&self) -> CacheResult<()> {
        if self.key_cache.sliding_expiration.is_zero() {
            return Err(CacheError::Configuration(
                "key_cache.sliding_expiration must be greater than zero".to_string(),
            ));
        }

        if self.key_cache.max_entries == 0 || self.result_cache.max_entries == 0 {
            return Err(CacheError::Configuration(
                "Caches must have max_entries > 0".to_string(),
            ));
        }

        match self.result_cache.default_expiration {
            ExpirationMode::Absolute(d) | ExpirationMode::Sliding(d) if d.is_zero() => {
                Err(CacheError::Configuration(
                    "result_cache.default_expiration must be greater than zero".to_string(),
                ))
            }
            _ => Ok(()),
        }
    }
}
