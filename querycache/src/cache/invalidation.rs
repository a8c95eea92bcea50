// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cache invalidation events and coordination

use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::result_cache::ResultCache;

/// Events that can trigger cache invalidation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidationEvent {
    /// Rows of a data source were inserted, updated or deleted
    DataUpdate {
        data_source: String,
        affected_rows: u64,
    },

    /// The shape of a data source changed
    SchemaChange { data_source: String },

    /// Explicit invalidation of several data sources
    Manual {
        data_sources: Vec<String>,
        reason: String,
    },

    /// Drop every cached result
    ClearAll,
}

impl InvalidationEvent {
    pub fn data_update(data_source: impl Into<String>, affected_rows: u64) -> Self {
        InvalidationEvent::DataUpdate {
            data_source: data_source.into(),
            affected_rows,
        }
    }

    pub fn manual<I, S>(data_sources: I, reason: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        InvalidationEvent::Manual {
            data_sources: data_sources.into_iter().map(Into::into).collect(),
            reason: reason.into(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            InvalidationEvent::DataUpdate { .. } => "DataUpdate",
            InvalidationEvent::SchemaChange { .. } => "SchemaChange",
            InvalidationEvent::Manual { .. } => "Manual",
            InvalidationEvent::ClearAll => "ClearAll",
        }
    }
}

/// Result of invalidation operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationResult {
    /// Key hashes of the removed results (empty for `ClearAll`)
    pub invalidated_keys: Vec<String>,
    pub entries_invalidated: usize,
    pub duration: Duration,
}

#[derive(Debug, Default, Clone)]
pub struct InvalidationStats {
    pub total_events: u64,
    pub total_invalidations: u64,
    pub data_update_events: u64,
    pub schema_change_events: u64,
    pub manual_events: u64,
    pub clear_events: u64,
    /// Events that matched no cached result
    pub empty_events: u64,
}

/// Applies invalidation events to a result cache and keeps a bounded history
pub struct InvalidationManager {
    results: Arc<ResultCache>,
    event_history: RwLock<VecDeque<(InvalidationEvent, InvalidationResult, Instant)>>,
    max_history_size: usize,
    stats: RwLock<InvalidationStats>,
}

impl InvalidationManager {
    pub fn new(results: Arc<ResultCache>, max_history_size: usize) -> Self {
        Self {
            results,
            event_history: RwLock::new(VecDeque::new()),
            max_history_size,
            stats: RwLock::new(InvalidationStats::default()),
        }
    }

    /// Handle invalidation event
    pub fn handle_event(&self, event: InvalidationEvent) -> InvalidationResult {
        let start_time = Instant::now();

        let (invalidated_keys, entries_invalidated) = match &event {
            InvalidationEvent::DataUpdate { data_source, .. }
            | InvalidationEvent::SchemaChange { data_source } => {
                let keys = self.results.invalidate_data_sources(&[data_source.as_str()]);
                let count = keys.len();
                (keys, count)
            }
            InvalidationEvent::Manual { data_sources, .. } => {
                let keys = self.results.invalidate_data_sources(data_sources);
                let count = keys.len();
                (keys, count)
            }
            InvalidationEvent::ClearAll => (Vec::new(), self.results.clear()),
        };

        let result = InvalidationResult {
            invalidated_keys,
            entries_invalidated,
            duration: start_time.elapsed(),
        };

        log::info!(
            "{} invalidation removed {} cached result(s)",
            event.kind(),
            result.entries_invalidated
        );

        {
            let mut stats = self.stats.write();
            stats.total_events += 1;
            stats.total_invalidations += result.entries_invalidated as u64;
            match &event {
                InvalidationEvent::DataUpdate { .. } => stats.data_update_events += 1,
                InvalidationEvent::SchemaChange { .. } => stats.schema_change_events += 1,
                InvalidationEvent::Manual { .. } => stats.manual_events += 1,
                InvalidationEvent::ClearAll => stats.clear_events += 1,
            }
            if result.entries_invalidated == 0 {
                stats.empty_events += 1;
            }
        }

        self.record_event_result(event, result.clone());
        result
    }

    /// Invalidate every result depending on any of `data_sources`
    pub fn invalidate<S: AsRef<str>>(&self, data_sources: &[S]) -> InvalidationResult {
        self.handle_event(InvalidationEvent::manual(
            data_sources.iter().map(|s| s.as_ref().to_string()),
            "invalidate",
        ))
    }

    pub fn stats(&self) -> InvalidationStats {
        self.stats.read().clone()
    }

    /// Most recent events first
    pub fn recent_events(
        &self,
        limit: usize,
    ) -> Vec<(InvalidationEvent, InvalidationResult, Instant)> {
        let history = self.event_history.read();
        history.iter().rev().take(limit).cloned().collect()
    }

    fn record_event_result(&self, event: InvalidationEvent, result: InvalidationResult) {
        if self.max_history_size == 0 {
            return;
        }

        let mut history = self.event_history.write();
        while history.len() >= self.max_history_size {
            history.pop_front();
        }
        history.push_back((event, result, Instant::now()));
    }
}
