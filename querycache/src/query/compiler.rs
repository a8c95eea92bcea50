// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Compiled-query capability exposed by the host query engine
//!
//! The key provider never inspects engine internals. An engine (or an
//! adapter in front of it) implements [`QueryCompiler`] to expose exactly two
//! things: a fresh [`QueryContext`], and parameter extraction that resolves
//! the runtime values bound to an expression tree.
//!
//! [`ParameterBindings`] is the in-crate compiler used by [`Query`].

use std::collections::HashMap;

use crate::error::{CacheError, CacheResult};

use super::expr::{Projection, QueryExpr, ScalarExpr, SortKey};
use super::value::Value;

/// Runtime parameter values in the order they were discovered
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterValues {
    values: Vec<(String, Value)>,
}

impl ParameterValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value; the first occurrence of a name wins
    pub fn add(&mut self, name: &str, value: Value) -> bool {
        if self.get(name).is_some() {
            return false;
        }
        self.values.push((name.to_string(), value));
        true
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Per-execution state created by the compiler
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    pub parameter_values: ParameterValues,
}

/// Compiled-plan capability of a host query engine
pub trait QueryCompiler: Send + Sync {
    /// Create the context that receives runtime parameter values
    fn create_query_context(&self) -> CacheResult<QueryContext>;

    /// Resolve the parameters bound to `expression`.
    ///
    /// Returns a copy of the tree with every parameter replaced by its value
    /// as a literal (never a placeholder form), and records each parameter's
    /// name and value in `context` in stable traversal order.
    fn extract_parameters(
        &self,
        expression: &QueryExpr,
        context: &mut QueryContext,
    ) -> CacheResult<QueryExpr>;
}

/// A query the key provider can derive a cache key for
pub trait CacheableQuery {
    /// The engine capability behind this query.
    ///
    /// Fails with `CacheError::HostIncompatible` when the query does not come
    /// from an engine that exposes one.
    fn compiler(&self) -> CacheResult<&dyn QueryCompiler>;

    /// The query's expression tree
    fn expression(&self) -> &QueryExpr;
}

/// Named runtime values for a query's parameters
#[derive(Debug, Clone, Default)]
pub struct ParameterBindings {
    values: HashMap<String, Value>,
}

impl ParameterBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl QueryCompiler for ParameterBindings {
    fn create_query_context(&self) -> CacheResult<QueryContext> {
        Ok(QueryContext::default())
    }

    fn extract_parameters(
        &self,
        expression: &QueryExpr,
        context: &mut QueryContext,
    ) -> CacheResult<QueryExpr> {
        let mut inliner = ParameterInliner {
            bindings: self,
            context,
        };
        inliner.fold_query(expression)
    }
}

/// Rewrites a tree with parameters replaced by their bound literals.
///
/// Children are folded in the same order `QueryVisitor` walks them, so the
/// recorded parameter order is stable for a given tree.
struct ParameterInliner<'a> {
    bindings: &'a ParameterBindings,
    context: &'a mut QueryContext,
}

impl ParameterInliner<'_> {
    fn fold_boxed(&mut self, expr: &QueryExpr) -> CacheResult<Box<QueryExpr>> {
        Ok(Box::new(self.fold_query(expr)?))
    }

    fn fold_scalar_boxed(&mut self, expr: &ScalarExpr) -> CacheResult<Box<ScalarExpr>> {
        Ok(Box::new(self.fold_scalar(expr)?))
    }

    fn fold_optional(&mut self, expr: &Option<ScalarExpr>) -> CacheResult<Option<ScalarExpr>> {
        expr.as_ref().map(|e| self.fold_scalar(e)).transpose()
    }

    fn fold_list(&mut self, exprs: &[ScalarExpr]) -> CacheResult<Vec<ScalarExpr>> {
        exprs.iter().map(|e| self.fold_scalar(e)).collect()
    }

    fn fold_projections(&mut self, columns: &[Projection]) -> CacheResult<Vec<Projection>> {
        columns
            .iter()
            .map(|p| {
                Ok(Projection {
                    expr: self.fold_scalar(&p.expr)?,
                    alias: p.alias.clone(),
                })
            })
            .collect()
    }

    fn fold_query(&mut self, expr: &QueryExpr) -> CacheResult<QueryExpr> {
        let folded = match expr {
            QueryExpr::Source { .. } => expr.clone(),
            QueryExpr::Filter { input, predicate } => QueryExpr::Filter {
                input: self.fold_boxed(input)?,
                predicate: self.fold_scalar(predicate)?,
            },
            QueryExpr::Project { input, columns } => QueryExpr::Project {
                input: self.fold_boxed(input)?,
                columns: self.fold_projections(columns)?,
            },
            QueryExpr::Join {
                kind,
                left,
                right,
                on,
            } => QueryExpr::Join {
                kind: *kind,
                left: self.fold_boxed(left)?,
                right: self.fold_boxed(right)?,
                on: self.fold_optional(on)?,
            },
            QueryExpr::Aggregate {
                input,
                group_by,
                aggregates,
            } => QueryExpr::Aggregate {
                input: self.fold_boxed(input)?,
                group_by: self.fold_list(group_by)?,
                aggregates: self.fold_projections(aggregates)?,
            },
            QueryExpr::Sort { input, keys } => {
                let input = self.fold_boxed(input)?;
                let keys = keys
                    .iter()
                    .map(|k| {
                        Ok(SortKey {
                            expr: self.fold_scalar(&k.expr)?,
                            descending: k.descending,
                        })
                    })
                    .collect::<CacheResult<Vec<_>>>()?;
                QueryExpr::Sort { input, keys }
            }
            QueryExpr::Limit { input, skip, take } => QueryExpr::Limit {
                input: self.fold_boxed(input)?,
                skip: self.fold_optional(skip)?,
                take: self.fold_optional(take)?,
            },
            QueryExpr::Distinct { input } => QueryExpr::Distinct {
                input: self.fold_boxed(input)?,
            },
            QueryExpr::SetOperation { op, left, right } => QueryExpr::SetOperation {
                op: *op,
                left: self.fold_boxed(left)?,
                right: self.fold_boxed(right)?,
            },
            QueryExpr::Include {
                input,
                navigation,
                target,
            } => QueryExpr::Include {
                input: self.fold_boxed(input)?,
                navigation: navigation.clone(),
                target: target.clone(),
            },
        };
        Ok(folded)
    }

    fn fold_scalar(&mut self, expr: &ScalarExpr) -> CacheResult<ScalarExpr> {
        let folded = match expr {
            ScalarExpr::Column { .. } | ScalarExpr::Literal(_) => expr.clone(),
            ScalarExpr::Parameter(name) => {
                let value = self
                    .bindings
                    .get(name)
                    .ok_or_else(|| CacheError::UnboundParameter(name.clone()))?;
                self.context.parameter_values.add(name, value.clone());
                ScalarExpr::Literal(value.clone())
            }
            ScalarExpr::Binary { left, op, right } => ScalarExpr::Binary {
                left: self.fold_scalar_boxed(left)?,
                op: *op,
                right: self.fold_scalar_boxed(right)?,
            },
            ScalarExpr::Unary { op, expr } => ScalarExpr::Unary {
                op: *op,
                expr: self.fold_scalar_boxed(expr)?,
            },
            ScalarExpr::Function { name, args } => ScalarExpr::Function {
                name: name.clone(),
                args: self.fold_list(args)?,
            },
            ScalarExpr::IsNull { expr, negated } => ScalarExpr::IsNull {
                expr: self.fold_scalar_boxed(expr)?,
                negated: *negated,
            },
            ScalarExpr::InList {
                expr,
                list,
                negated,
            } => ScalarExpr::InList {
                expr: self.fold_scalar_boxed(expr)?,
                list: self.fold_list(list)?,
                negated: *negated,
            },
            ScalarExpr::InSubquery {
                expr,
                subquery,
                negated,
            } => ScalarExpr::InSubquery {
                expr: self.fold_scalar_boxed(expr)?,
                subquery: self.fold_boxed(subquery)?,
                negated: *negated,
            },
            ScalarExpr::Exists { subquery, negated } => ScalarExpr::Exists {
                subquery: self.fold_boxed(subquery)?,
                negated: *negated,
            },
            ScalarExpr::Subquery(subquery) => ScalarExpr::Subquery(self.fold_boxed(subquery)?),
        };
        Ok(folded)
    }
}

/// An expression tree together with its runtime parameter bindings
#[derive(Debug, Clone)]
pub struct Query {
    expression: QueryExpr,
    bindings: ParameterBindings,
}

impl Query {
    pub fn new(expression: QueryExpr) -> Self {
        Self {
            expression,
            bindings: ParameterBindings::new(),
        }
    }

    /// Bind a value to a named parameter
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.bindings.bind(name, value);
        self
    }

    pub fn bindings(&self) -> &ParameterBindings {
        &self.bindings
    }
}

impl CacheableQuery for Query {
    fn compiler(&self) -> CacheResult<&dyn QueryCompiler> {
        Ok(&self.bindings)
    }

    fn expression(&self) -> &QueryExpr {
        &self.expression
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::expr::{col, lit, param, source};

    fn extract(query: &Query) -> CacheResult<(QueryExpr, QueryContext)> {
        let compiler = query.compiler()?;
        let mut context = compiler.create_query_context()?;
        let extracted = compiler.extract_parameters(query.expression(), &mut context)?;
        Ok((extracted, context))
    }

    #[test]
    fn test_parameters_are_inlined_as_literals() {
        let query = Query::new(
            source("Orders")
                .filter(col("CustomerId").eq(param("customerId")))
                .take(param("limit")),
        )
        .bind("customerId", 42)
        .bind("limit", 10);

        let (extracted, context) = extract(&query).unwrap();

        assert_eq!(
            extracted,
            source("Orders")
                .filter(col("CustomerId").eq(lit(42)))
                .take(lit(10))
        );

        let order: Vec<&str> = context.parameter_values.iter().map(|(n, _)| n).collect();
        assert_eq!(order, vec!["customerId", "limit"]);
    }

    #[test]
    fn test_repeated_parameter_recorded_once() {
        let query = Query::new(
            source("Orders").filter(
                col("BuyerId")
                    .eq(param("id"))
                    .or(col("SellerId").eq(param("id"))),
            ),
        )
        .bind("id", 7);

        let (_, context) = extract(&query).unwrap();
        assert_eq!(context.parameter_values.len(), 1);
        assert_eq!(
            context.parameter_values.get("id"),
            Some(&Value::Integer(7))
        );
    }

    #[test]
    fn test_unbound_parameter_fails() {
        let query = Query::new(source("Orders").filter(col("Id").eq(param("missing"))));
        let err = extract(&query).unwrap_err();
        assert_eq!(err, CacheError::UnboundParameter("missing".to_string()));
    }

    #[test]
    fn test_original_tree_is_untouched() {
        let expr = source("Orders").filter(col("Id").eq(param("id")));
        let query = Query::new(expr.clone()).bind("id", 1);
        let _ = extract(&query).unwrap();
        assert_eq!(query.expression(), &expr);
    }
}
