// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cache key derivation, result caching and invalidation
//!
//! This module provides:
//! - Cache key records and the key provider that materializes them
//! - A sliding-expiration key cache keyed by query fingerprint
//! - A result cache tagged by data source
//! - Invalidation events and the manager coordinating everything

pub mod cache_manager;
pub mod invalidation;
pub mod key;
pub mod key_cache;
pub mod key_provider;
pub mod result_cache;

pub use cache_manager::{CacheManager, CachePolicy, CacheManagerStats};
pub use invalidation::{
    InvalidationEvent, InvalidationManager, InvalidationResult, InvalidationStats,
};
pub use key::CacheKeyRecord;
pub use key_cache::{KeyCache, KeyCacheEntry, KeyCacheStats, SlidingKeyCache};
pub use key_provider::CacheKeyProvider;
pub use result_cache::{GenerationSnapshot, ResultCache, ResultCacheStats};

use std::time::Instant;

use crate::config::ExpirationMode;

/// Cache entry metadata
#[derive(Debug, Clone)]
pub struct CacheEntryMetadata {
    pub created_at: Instant,
    pub last_accessed: Instant,
    pub access_count: u64,
    pub expiration: ExpirationMode,
}

impl CacheEntryMetadata {
    pub fn new(expiration: ExpirationMode, now: Instant) -> Self {
        Self {
            created_at: now,
            last_accessed: now,
            access_count: 0,
            expiration,
        }
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expiration.is_expired(
            now.saturating_duration_since(self.created_at),
            now.saturating_duration_since(self.last_accessed),
        )
    }

    /// Record an access; refreshes a sliding window
    pub fn touch(&mut self, now: Instant) {
        if now > self.last_accessed {
            self.last_accessed = now;
        }
        self.access_count += 1;
    }
}
