// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query model consumed by the cache
//!
//! This module provides:
//! - Expression trees for relational queries
//! - Runtime values for literals and parameters
//! - Deterministic printers used to build canonical key text
//! - Data source collection for invalidation tags
//! - The compiled-query capability a host engine implements

pub mod compiler;
pub mod expr;
pub mod printer;
pub mod value;
pub mod visitor;

pub use compiler::{
    CacheableQuery, ParameterBindings, ParameterValues, Query, QueryCompiler, QueryContext,
};
pub use expr::{
    col, exists, func, lit, param, qualified_col, source, BinaryOperator, JoinKind, Projection,
    QueryExpr, ScalarExpr, SetOperator, SortKey, UnaryOperator,
};
pub use printer::{print_inline, print_plan, print_scalar};
pub use value::Value;
pub use visitor::{describe, DataSourceCollector, ExpressionDebugView, QueryVisitor};

use serde::{Deserialize, Serialize};

/// A materialized result set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
