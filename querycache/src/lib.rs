// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! QueryCache - second-level caching of query results
//!
//! QueryCache sits between an application and its query engine. It derives a
//! stable cache key for every query, stores results under that key and drops
//! them again when the data they were read from changes.
//!
//! # Features
//!
//! - **Deterministic keys**: Canonical text of the parameter-extracted plan,
//!   the original expression and a caller-supplied salt, hashed with xxHash64
//! - **Cheap repeat lookups**: Materialized keys are cached by fingerprint
//!   with a sliding expiration
//! - **Data source tracking**: Every key carries the set of tables it reads,
//!   including those referenced from joins, subqueries and includes
//! - **Race-free invalidation**: Results computed across an invalidation of
//!   their data sources are never cached
//!
//! # Usage
//!
//! ```rust,ignore
//! use querycache::{col, param, source, CachePolicy, CacheServicesBuilder, Query};
//!
//! let services = CacheServicesBuilder::with_defaults().build()?;
//! let manager = services.cache_manager();
//!
//! let query = Query::new(source("Orders").filter(col("CustomerId").eq(param("customerId"))))
//!     .bind("customerId", 42);
//! let orders = manager.get_or_execute(&query, &CachePolicy::new(), || engine.run(&query))?;
//!
//! // After writing to Orders
//! manager.invalidate(&["Orders"]);
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod hash;
pub mod query;
pub mod services;

pub use cache::{
    CacheKeyProvider, CacheKeyRecord, CacheManager, CacheManagerStats, CachePolicy,
    GenerationSnapshot, InvalidationEvent, InvalidationResult, KeyCache, ResultCache,
    SlidingKeyCache,
};
pub use config::{CacheConfig, ExpirationMode};
pub use error::{CacheError, CacheResult};
pub use hash::{CacheKeyHashProvider, XxHashProvider};
pub use query::{
    col, exists, func, lit, param, qualified_col, source, CacheableQuery, ParameterValues, Query,
    QueryCompiler, QueryContext, QueryExpr, QueryResult, ScalarExpr, Value,
};
pub use services::{CacheServices, CacheServicesBuilder};

/// QueryCache version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// QueryCache crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
