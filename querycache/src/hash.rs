// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Hash providers for cache keys

use std::hash::{Hash, Hasher};
use xxhash_rust::xxh64::{xxh64, Xxh64};

/// Turns arbitrary text into a short, stable hash string.
///
/// Implementations must be pure and deterministic for the lifetime of the
/// process. Cryptographic strength is not required, but the output must not
/// be a trivially colliding checksum since it becomes the result cache key.
pub trait CacheKeyHashProvider: Send + Sync {
    fn compute_hash(&self, data: &str) -> String;
}

/// xxHash64 (seed 0) rendered as upper-case hex
#[derive(Debug, Clone, Copy, Default)]
pub struct XxHashProvider;

impl XxHashProvider {
    pub fn new() -> Self {
        Self
    }
}

impl CacheKeyHashProvider for XxHashProvider {
    fn compute_hash(&self, data: &str) -> String {
        format!("{:X}", xxh64(data.as_bytes(), 0))
    }
}

/// Structural hash code of a value.
///
/// Streams the value's `Hash` impl through xxHash64 (seed 0), so the result
/// does not depend on the standard library's hasher choice.
pub fn hash_code<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = Xxh64::new(0);
    value.hash(&mut hasher);
    hasher.finish()
}
