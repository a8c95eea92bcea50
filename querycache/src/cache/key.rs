// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cache key records

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The materialized key of a query
///
/// `key_hash` is a pure function of `key`. `data_sources` lists every data
/// source whose mutation must invalidate results stored under `key_hash`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKeyRecord {
    /// Canonical query text
    pub key: String,
    /// Hash of `key`; the result cache key
    pub key_hash: String,
    /// Invalidation tags
    pub data_sources: BTreeSet<String>,
}

impl CacheKeyRecord {
    pub fn depends_on(&self, data_source: &str) -> bool {
        self.data_sources.contains(data_source)
    }

    pub fn depends_on_any<'a, I>(&self, data_sources: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        data_sources.into_iter().any(|name| self.depends_on(name))
    }
}
