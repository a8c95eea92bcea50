//! Tests for cache key derivation through the public API
//!
//! Covers key determinism, salt and parameter sensitivity, data source
//! tracking and the errors surfaced for incompatible queries.

#[path = "testutils/mod.rs"]
mod testutils;

use std::sync::Arc;

use querycache::query::{QueryCompiler, QueryExpr};
use querycache::{
    col, lit, param, source, CacheError, CacheKeyProvider, CacheResult, CacheServicesBuilder,
    CacheableQuery, KeyCache, Query, SlidingKeyCache, XxHashProvider,
};
use testutils::queries::{expensive_products, orders_for_customer, orders_with_customers};

fn provider() -> CacheKeyProvider {
    testutils::init_logging();
    CacheServicesBuilder::with_defaults()
        .build()
        .expect("Failed to build cache services")
        .key_provider()
        .clone()
}

/// A query handed over by an engine without compiled-plan support
struct ForeignQuery {
    expression: QueryExpr,
}

impl CacheableQuery for ForeignQuery {
    fn compiler(&self) -> CacheResult<&dyn QueryCompiler> {
        Err(CacheError::HostIncompatible(
            "query was not produced by a compiling engine".to_string(),
        ))
    }

    fn expression(&self) -> &QueryExpr {
        &self.expression
    }
}

#[test]
fn test_same_query_same_key() {
    let provider = provider();

    let first = provider.get_cache_key_for(&orders_for_customer(42), "").unwrap();
    let second = provider.get_cache_key_for(&orders_for_customer(42), "").unwrap();

    assert_eq!(first.key, second.key);
    assert_eq!(first.key_hash, second.key_hash);
    assert_eq!(first.data_sources, second.data_sources);
}

#[test]
fn test_keys_match_across_independent_providers() {
    let a = provider().get_cache_key_for(&expensive_products(9.5, 20), "").unwrap();
    let b = provider().get_cache_key_for(&expensive_products(9.5, 20), "").unwrap();

    assert_eq!(a.key_hash, b.key_hash);
}

#[test]
fn test_salt_separates_keys() {
    let provider = provider();
    let query = orders_for_customer(42);

    let plain = provider.get_cache_key_for(&query, "").unwrap();
    let salted = provider.get_cache_key_for(&query, "tenant-7").unwrap();

    assert_ne!(plain.key_hash, salted.key_hash);
    assert!(salted.key.ends_with(";tenant-7"));
    assert_eq!(plain.data_sources, salted.data_sources);
    assert_eq!(provider.key_cache().len(), 2);
}

#[test]
fn test_parameter_values_separate_keys() {
    let provider = provider();

    let k42 = provider.get_cache_key_for(&orders_for_customer(42), "").unwrap();
    let k99 = provider.get_cache_key_for(&orders_for_customer(99), "").unwrap();

    assert_ne!(k42.key_hash, k99.key_hash);
    assert!(k42.key.contains("42"));
    assert!(k99.key.contains("99"));

    let expected: Vec<&str> = vec!["Orders"];
    assert_eq!(k42.data_sources.iter().map(String::as_str).collect::<Vec<_>>(), expected);
    assert_eq!(k99.data_sources.iter().map(String::as_str).collect::<Vec<_>>(), expected);
}

#[test]
fn test_float_parameters_are_distinguished() {
    let provider = provider();

    let low = provider.get_cache_key_for(&expensive_products(9.5, 20), "").unwrap();
    let high = provider.get_cache_key_for(&expensive_products(9.75, 20), "").unwrap();
    let fewer = provider.get_cache_key_for(&expensive_products(9.5, 10), "").unwrap();

    assert_ne!(low.key_hash, high.key_hash);
    assert_ne!(low.key_hash, fewer.key_hash);
}

#[test]
fn test_literal_and_parameter_forms_share_plan_text() {
    let provider = provider();

    let parameterized = provider.get_cache_key_for(&orders_for_customer(42), "").unwrap();
    let literal = provider
        .get_cache_key_for(
            &Query::new(source("Orders").filter(col("CustomerId").eq(lit(42)))),
            "",
        )
        .unwrap();

    // The debug view of the original expression still tells them apart
    assert_ne!(parameterized.key_hash, literal.key_hash);
    let plan = |key: &str| key.split(';').next().map(str::to_string);
    assert_eq!(plan(&parameterized.key), plan(&literal.key));
}

#[test]
fn test_key_cache_is_transparent() {
    let provider = provider();
    let query = orders_with_customers();

    let before = provider.get_cache_key_for(&query, "").unwrap();
    provider.key_cache().clear();
    assert!(provider.key_cache().is_empty());
    let after = provider.get_cache_key_for(&query, "").unwrap();

    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(before.as_ref(), after.as_ref());
}

#[test]
fn test_parameter_position_does_not_share_keys() {
    let provider = provider();
    let p_first = Query::new(
        source("Orders").filter(col("A").eq(param("p")).and(col("B").eq(lit(5)))),
    )
    .bind("p", 5);
    let p_second = Query::new(
        source("Orders").filter(col("A").eq(lit(5)).and(col("B").eq(param("p")))),
    )
    .bind("p", 5);

    let first = provider.get_cache_key_for(&p_first, "").unwrap();
    let warm = provider.get_cache_key_for(&p_second, "").unwrap();
    provider.key_cache().clear();
    let cold = provider.get_cache_key_for(&p_second, "").unwrap();

    assert_eq!(warm.key_hash, cold.key_hash);
    assert_eq!(warm.key, cold.key);
    assert_ne!(first.key_hash, warm.key_hash);
}

#[test]
fn test_custom_key_cache_is_used() {
    testutils::init_logging();
    let key_cache = Arc::new(SlidingKeyCache::new(std::time::Duration::from_secs(5), 2));
    let services = CacheServicesBuilder::new()
        .hash_provider(Arc::new(XxHashProvider::new()))
        .key_cache(key_cache.clone())
        .build()
        .unwrap();

    for customer in 0..5 {
        services
            .key_provider()
            .get_cache_key_for(&orders_for_customer(customer), "")
            .unwrap();
    }

    assert_eq!(key_cache.len(), 2);
    assert_eq!(key_cache.stats().evictions, 3);
}

#[test]
fn test_join_tracks_both_sources() {
    let record = provider().get_cache_key_for(&orders_with_customers(), "").unwrap();

    assert!(record.depends_on("Orders"));
    assert!(record.depends_on("Customers"));
    assert_eq!(record.data_sources.len(), 2);
    assert!(!record.depends_on("Products"));
}

#[test]
fn test_explicit_expression_uses_query_bindings() {
    let provider = provider();
    let query = orders_for_customer(42);
    let narrowed = query.expression().clone().take(lit(1));

    let whole = provider.get_cache_key(&query, query.expression(), "").unwrap();
    let first = provider.get_cache_key(&query, &narrowed, "").unwrap();

    assert_ne!(whole.key_hash, first.key_hash);
    assert!(first.key.contains("(CustomerId = 42)"));
}

#[test]
fn test_incompatible_query_fails() {
    let query = ForeignQuery {
        expression: source("Orders"),
    };

    let err = provider().get_cache_key_for(&query, "").unwrap_err();
    assert!(matches!(err, CacheError::HostIncompatible(_)));
}

#[test]
fn test_unbound_parameter_fails_without_caching() {
    let provider = provider();
    let query = Query::new(source("Orders").filter(col("Id").eq(param("id"))));

    let err = provider.get_cache_key_for(&query, "").unwrap_err();
    assert_eq!(err, CacheError::UnboundParameter("id".to_string()));
    assert!(provider.key_cache().is_empty());
}
