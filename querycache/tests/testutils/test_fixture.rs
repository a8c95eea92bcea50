//! Isolated cache services for integration tests
//!
//! Each fixture owns its own key cache and result cache, so tests can run
//! in parallel without sharing entries.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use querycache::{
    CacheConfig, CacheError, CacheManager, CachePolicy, CacheServices, CacheServicesBuilder,
    Query, QueryResult, Value,
};

/// Error type of the fake engine
#[derive(Debug, PartialEq)]
pub enum EngineError {
    Cache(CacheError),
    Failed(String),
}

impl From<CacheError> for EngineError {
    fn from(err: CacheError) -> Self {
        EngineError::Cache(err)
    }
}

pub struct CacheFixture {
    services: CacheServices,
    executions: AtomicUsize,
}

impl CacheFixture {
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    pub fn with_config(config: CacheConfig) -> Self {
        super::init_logging();
        let services = CacheServicesBuilder::with_defaults()
            .config(config)
            .build()
            .expect("Failed to build cache services");
        Self {
            services,
            executions: AtomicUsize::new(0),
        }
    }

    pub fn services(&self) -> &CacheServices {
        &self.services
    }

    pub fn manager(&self) -> Arc<CacheManager> {
        self.services.cache_manager()
    }

    /// How many times the fake engine actually ran
    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }

    /// Run `query` through the cache; the fake engine returns `rows` single
    /// integer rows
    pub fn run(&self, query: &Query, rows: i64) -> Result<Arc<QueryResult>, EngineError> {
        self.manager()
            .get_or_execute(query, &CachePolicy::new(), || Ok(self.execute(rows)))
    }

    /// Engine body with an execution counter
    pub fn execute(&self, rows: i64) -> QueryResult {
        self.executions.fetch_add(1, Ordering::SeqCst);
        QueryResult::new(
            vec!["n".to_string()],
            (0..rows).map(|n| vec![Value::Integer(n)]).collect(),
        )
    }
}
