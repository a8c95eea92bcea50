// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Deterministic text renderings of query trees
//!
//! Two forms are produced:
//! - `print_plan`: an indented operator tree, one node per line
//! - `print_inline`: a compact method-chain form on a single line
//!
//! Both render literals through `Value`'s `Display`, which never prints two
//! distinct values the same way, and quote identifiers that could otherwise
//! be confused with syntax. Sub-queries inside scalar expressions always use
//! the inline form.

use std::borrow::Cow;
use std::fmt::Write;

use super::expr::{Projection, QueryExpr, ScalarExpr, SortKey};

const INDENT: &str = "  ";

/// Render the indented operator tree
pub fn print_plan(expr: &QueryExpr) -> String {
    let mut out = String::new();
    write_plan_node(&mut out, expr, 0);
    out
}

/// Render the compact single-line form
pub fn print_inline(expr: &QueryExpr) -> String {
    let mut out = String::new();
    write_inline(&mut out, expr);
    out
}

/// Render a scalar expression
pub fn print_scalar(expr: &ScalarExpr) -> String {
    let mut out = String::new();
    write_scalar(&mut out, expr);
    out
}

fn ident(name: &str) -> Cow<'_, str> {
    let plain = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());

    if plain {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("\"{}\"", name.replace('"', "\"\"")))
    }
}

fn write_source(out: &mut String, name: &str, alias: &Option<String>) {
    out.push_str(&ident(name));
    if let Some(alias) = alias {
        let _ = write!(out, " AS {}", ident(alias));
    }
}

fn write_plan_node(out: &mut String, expr: &QueryExpr, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }

    match expr {
        QueryExpr::Source { name, alias } => {
            out.push_str("Source: ");
            write_source(out, name, alias);
            out.push('\n');
        }
        QueryExpr::Filter { input, predicate } => {
            out.push_str("Filter: ");
            write_scalar(out, predicate);
            out.push('\n');
            write_plan_node(out, input, depth + 1);
        }
        QueryExpr::Project { input, columns } => {
            out.push_str("Project: ");
            write_projections(out, columns);
            out.push('\n');
            write_plan_node(out, input, depth + 1);
        }
        QueryExpr::Join {
            kind,
            left,
            right,
            on,
        } => {
            let _ = write!(out, "Join: {}", kind.as_str());
            if let Some(on) = on {
                out.push_str(" ON ");
                write_scalar(out, on);
            }
            out.push('\n');
            write_plan_node(out, left, depth + 1);
            write_plan_node(out, right, depth + 1);
        }
        QueryExpr::Aggregate {
            input,
            group_by,
            aggregates,
        } => {
            out.push_str("Aggregate: group_by=[");
            write_scalar_list(out, group_by);
            out.push_str("] aggregates=[");
            write_projections(out, aggregates);
            out.push_str("]\n");
            write_plan_node(out, input, depth + 1);
        }
        QueryExpr::Sort { input, keys } => {
            out.push_str("Sort: ");
            write_sort_keys(out, keys);
            out.push('\n');
            write_plan_node(out, input, depth + 1);
        }
        QueryExpr::Limit { input, skip, take } => {
            out.push_str("Limit:");
            if let Some(skip) = skip {
                out.push_str(" skip=");
                write_scalar(out, skip);
            }
            if let Some(take) = take {
                out.push_str(" take=");
                write_scalar(out, take);
            }
            out.push('\n');
            write_plan_node(out, input, depth + 1);
        }
        QueryExpr::Distinct { input } => {
            out.push_str("Distinct\n");
            write_plan_node(out, input, depth + 1);
        }
        QueryExpr::SetOperation { op, left, right } => {
            let _ = writeln!(out, "SetOperation: {}", op.as_str());
            write_plan_node(out, left, depth + 1);
            write_plan_node(out, right, depth + 1);
        }
        QueryExpr::Include {
            input,
            navigation,
            target,
        } => {
            let _ = writeln!(out, "Include: {} -> {}", ident(navigation), ident(target));
            write_plan_node(out, input, depth + 1);
        }
    }
}

fn write_inline(out: &mut String, expr: &QueryExpr) {
    match expr {
        QueryExpr::Source { name, alias } => {
            out.push_str("Source(");
            write_source(out, name, alias);
            out.push(')');
        }
        QueryExpr::Filter { input, predicate } => {
            write_inline(out, input);
            out.push_str(".Filter(");
            write_scalar(out, predicate);
            out.push(')');
        }
        QueryExpr::Project { input, columns } => {
            write_inline(out, input);
            out.push_str(".Project(");
            write_projections(out, columns);
            out.push(')');
        }
        QueryExpr::Join {
            kind,
            left,
            right,
            on,
        } => {
            write_inline(out, left);
            let _ = write!(out, ".Join[{}](", kind.as_str());
            write_inline(out, right);
            if let Some(on) = on {
                out.push_str(", ");
                write_scalar(out, on);
            }
            out.push(')');
        }
        QueryExpr::Aggregate {
            input,
            group_by,
            aggregates,
        } => {
            write_inline(out, input);
            out.push_str(".Aggregate([");
            write_scalar_list(out, group_by);
            out.push_str("], [");
            write_projections(out, aggregates);
            out.push_str("])");
        }
        QueryExpr::Sort { input, keys } => {
            write_inline(out, input);
            out.push_str(".Sort(");
            write_sort_keys(out, keys);
            out.push(')');
        }
        QueryExpr::Limit { input, skip, take } => {
            write_inline(out, input);
            if let Some(skip) = skip {
                out.push_str(".Skip(");
                write_scalar(out, skip);
                out.push(')');
            }
            if let Some(take) = take {
                out.push_str(".Take(");
                write_scalar(out, take);
                out.push(')');
            }
        }
        QueryExpr::Distinct { input } => {
            write_inline(out, input);
            out.push_str(".Distinct()");
        }
        QueryExpr::SetOperation { op, left, right } => {
            write_inline(out, left);
            let _ = write!(out, ".{}(", op.as_str());
            write_inline(out, right);
            out.push(')');
        }
        QueryExpr::Include {
            input,
            navigation,
            target,
        } => {
            write_inline(out, input);
            let _ = write!(out, ".Include({} -> {})", ident(navigation), ident(target));
        }
    }
}

fn write_scalar(out: &mut String, expr: &ScalarExpr) {
    match expr {
        ScalarExpr::Column { relation, name } => {
            if let Some(relation) = relation {
                out.push_str(&ident(relation));
                out.push('.');
            }
            out.push_str(&ident(name));
        }
        ScalarExpr::Literal(value) => {
            let _ = write!(out, "{}", value);
        }
        ScalarExpr::Parameter(name) => {
            out.push('@');
            out.push_str(&ident(name));
        }
        ScalarExpr::Binary { left, op, right } => {
            out.push('(');
            write_scalar(out, left);
            let _ = write!(out, " {} ", op.as_str());
            write_scalar(out, right);
            out.push(')');
        }
        ScalarExpr::Unary { op, expr } => {
            let _ = write!(out, "{}(", op.as_str());
            write_scalar(out, expr);
            out.push(')');
        }
        ScalarExpr::Function { name, args } => {
            out.push_str(&ident(name));
            out.push('(');
            write_scalar_list(out, args);
            out.push(')');
        }
        ScalarExpr::IsNull { expr, negated } => {
            out.push('(');
            write_scalar(out, expr);
            out.push_str(if *negated { " IS NOT NULL)" } else { " IS NULL)" });
        }
        ScalarExpr::InList {
            expr,
            list,
            negated,
        } => {
            out.push('(');
            write_scalar(out, expr);
            out.push_str(if *negated { " NOT IN (" } else { " IN (" });
            write_scalar_list(out, list);
            out.push_str("))");
        }
        ScalarExpr::InSubquery {
            expr,
            subquery,
            negated,
        } => {
            out.push('(');
            write_scalar(out, expr);
            out.push_str(if *negated { " NOT IN {" } else { " IN {" });
            write_inline(out, subquery);
            out.push_str("})");
        }
        ScalarExpr::Exists { subquery, negated } => {
            out.push_str(if *negated { "NOT EXISTS {" } else { "EXISTS {" });
            write_inline(out, subquery);
            out.push('}');
        }
        ScalarExpr::Subquery(subquery) => {
            out.push('{');
            write_inline(out, subquery);
            out.push('}');
        }
    }
}

fn write_scalar_list(out: &mut String, exprs: &[ScalarExpr]) {
    for (i, expr) in exprs.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_scalar(out, expr);
    }
}

fn write_projections(out: &mut String, columns: &[Projection]) {
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_scalar(out, &column.expr);
        if let Some(alias) = &column.alias {
            let _ = write!(out, " AS {}", ident(alias));
        }
    }
}

fn write_sort_keys(out: &mut String, keys: &[SortKey]) {
    for (i, key) in keys.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_scalar(out, &key.expr);
        out.push_str(if key.descending { " DESC" } else { " ASC" });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::expr::{col, lit, param, qualified_col, source};

    #[test]
    fn test_plan_is_indented() {
        let q = source("Orders")
            .alias("o")
            .filter(qualified_col("o", "CustomerId").eq(lit(42)))
            .take(lit(10));

        assert_eq!(
            print_plan(&q),
            "Limit: take=10\n  Filter: (o.CustomerId = 42)\n    Source: Orders AS o\n"
        );
    }

    #[test]
    fn test_inline_form() {
        let q = source("Orders")
            .filter(col("CustomerId").eq(param("customerId")))
            .include("Customer", "Customers");

        assert_eq!(
            print_inline(&q),
            "Source(Orders).Filter((CustomerId = @customerId)).Include(Customer -> Customers)"
        );
    }

    #[test]
    fn test_identifiers_are_quoted_when_needed() {
        assert_eq!(print_scalar(&col("plain_name")), "plain_name");
        assert_eq!(print_scalar(&col("a = b")), "\"a = b\"");
        assert_eq!(print_scalar(&col("1st")), "\"1st\"");
        assert_eq!(print_scalar(&col("say \"hi\"")), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_string_literal_differs_from_identifier() {
        let by_literal = print_scalar(&col("Name").eq(lit("Status")));
        let by_column = print_scalar(&col("Name").eq(col("Status")));
        assert_ne!(by_literal, by_column);
    }
}
