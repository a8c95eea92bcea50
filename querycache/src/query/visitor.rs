// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Read-only traversal of query trees and data source collection

use std::collections::BTreeSet;

use super::expr::{QueryExpr, ScalarExpr};
use super::printer::print_inline;

/// Pre-order visitor over both query and scalar nodes.
///
/// The default `walk_*` methods visit children in declaration order
/// (left before right, input before the node's own expressions), so every
/// implementor sees nodes in the same stable order for a given tree.
pub trait QueryVisitor {
    fn visit_query(&mut self, expr: &QueryExpr) {
        self.walk_query(expr);
    }

    fn visit_scalar(&mut self, expr: &ScalarExpr) {
        self.walk_scalar(expr);
    }

    fn walk_query(&mut self, expr: &QueryExpr) {
        match expr {
            QueryExpr::Source { .. } => {}
            QueryExpr::Filter { input, predicate } => {
                self.visit_query(input);
                self.visit_scalar(predicate);
            }
            QueryExpr::Project { input, columns } => {
                self.visit_query(input);
                for column in columns {
                    self.visit_scalar(&column.expr);
                }
            }
            QueryExpr::Join {
                left, right, on, ..
            } => {
                self.visit_query(left);
                self.visit_query(right);
                if let Some(on) = on {
                    self.visit_scalar(on);
                }
            }
            QueryExpr::Aggregate {
                input,
                group_by,
                aggregates,
            } => {
                self.visit_query(input);
                for expr in group_by {
                    self.visit_scalar(expr);
                }
                for aggregate in aggregates {
                    self.visit_scalar(&aggregate.expr);
                }
            }
            QueryExpr::Sort { input, keys } => {
                self.visit_query(input);
                for key in keys {
                    self.visit_scalar(&key.expr);
                }
            }
            QueryExpr::Limit { input, skip, take } => {
                self.visit_query(input);
                if let Some(skip) = skip {
                    self.visit_scalar(skip);
                }
                if let Some(take) = take {
                    self.visit_scalar(take);
                }
            }
            QueryExpr::Distinct { input } => self.visit_query(input),
            QueryExpr::SetOperation { left, right, .. } => {
                self.visit_query(left);
                self.visit_query(right);
            }
            QueryExpr::Include { input, .. } => self.visit_query(input),
        }
    }

    fn walk_scalar(&mut self, expr: &ScalarExpr) {
        match expr {
            ScalarExpr::Column { .. } | ScalarExpr::Literal(_) | ScalarExpr::Parameter(_) => {}
            ScalarExpr::Binary { left, right, .. } => {
                self.visit_scalar(left);
                self.visit_scalar(right);
            }
            ScalarExpr::Unary { expr, .. } | ScalarExpr::IsNull { expr, .. } => {
                self.visit_scalar(expr)
            }
            ScalarExpr::Function { args, .. } => {
                for arg in args {
                    self.visit_scalar(arg);
                }
            }
            ScalarExpr::InList { expr, list, .. } => {
                self.visit_scalar(expr);
                for item in list {
                    self.visit_scalar(item);
                }
            }
            ScalarExpr::InSubquery { expr, subquery, .. } => {
                self.visit_scalar(expr);
                self.visit_query(subquery);
            }
            ScalarExpr::Exists { subquery, .. } | ScalarExpr::Subquery(subquery) => {
                self.visit_query(subquery)
            }
        }
    }
}

/// Collects every data source a query reads, including joined sources,
/// sub-query sources and eager-loaded navigation targets
#[derive(Debug, Default)]
pub struct DataSourceCollector {
    data_sources: BTreeSet<String>,
}

impl DataSourceCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collect(expr: &QueryExpr) -> BTreeSet<String> {
        let mut collector = Self::new();
        collector.visit_query(expr);
        collector.data_sources
    }
}

impl QueryVisitor for DataSourceCollector {
    fn visit_query(&mut self, expr: &QueryExpr) {
        match expr {
            QueryExpr::Source { name, .. } => {
                self.data_sources.insert(name.clone());
            }
            QueryExpr::Include { target, .. } => {
                self.data_sources.insert(target.clone());
            }
            _ => {}
        }
        self.walk_query(expr);
    }
}

/// Debug view of an expression tree together with the data sources it reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionDebugView {
    pub debug_view: String,
    pub data_sources: BTreeSet<String>,
}

/// Describe a query tree: its inline rendering and its data sources
pub fn describe(expr: &QueryExpr) -> ExpressionDebugView {
    ExpressionDebugView {
        debug_view: print_inline(expr),
        data_sources: DataSourceCollector::collect(expr),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::expr::{col, exists, lit, qualified_col, source};

    fn names(set: &BTreeSet<String>) -> Vec<&str> {
        set.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_single_source() {
        let q = source("Orders").filter(col("Id").gt(lit(1)));
        assert_eq!(names(&DataSourceCollector::collect(&q)), vec!["Orders"]);
    }

    #[test]
    fn test_join_and_subquery_sources() {
        let blocked = source("BlockedCustomers").project(vec![col("CustomerId")]);
        let q = source("Orders")
            .alias("o")
            .inner_join(
                source("Customers").alias("c"),
                qualified_col("o", "CustomerId").eq(qualified_col("c", "Id")),
            )
            .filter(
                qualified_col("c", "Id")
                    .in_subquery(blocked)
                    .not()
                    .and(exists(source("Payments"))),
            )
            .include("Items", "OrderItems");

        assert_eq!(
            names(&DataSourceCollector::collect(&q)),
            vec!["BlockedCustomers", "Customers", "OrderItems", "Orders", "Payments"]
        );
    }

    #[test]
    fn test_self_join_deduplicates() {
        let q = source("Employees")
            .alias("e")
            .inner_join(
                source("Employees").alias("m"),
                qualified_col("e", "ManagerId").eq(qualified_col("m", "Id")),
            );
        let view = describe(&q);
        assert_eq!(names(&view.data_sources), vec!["Employees"]);
        assert!(view.debug_view.starts_with("Source(Employees AS e).Join[INNER]"));
    }
}
