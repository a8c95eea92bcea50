// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query expression trees
//!
//! A query is a tree of relational operators (`QueryExpr`) whose predicates,
//! projections and ordering keys are scalar expressions (`ScalarExpr`).
//! Scalar expressions may themselves contain sub-queries.
//!
//! Both trees derive `Eq` and `Hash` structurally: two trees are equal only
//! when every node, name and literal matches. The key provider relies on
//! this to decide whether two queries share a cache key.

use serde::{Deserialize, Serialize};

use super::value::Value;

/// Relational operator node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryExpr {
    /// Read all rows of a named data source (table / entity set)
    Source {
        name: String,
        alias: Option<String>,
    },

    /// Keep rows matching a predicate
    Filter {
        input: Box<QueryExpr>,
        predicate: ScalarExpr,
    },

    /// Compute output columns
    Project {
        input: Box<QueryExpr>,
        columns: Vec<Projection>,
    },

    /// Combine two inputs
    Join {
        kind: JoinKind,
        left: Box<QueryExpr>,
        right: Box<QueryExpr>,
        on: Option<ScalarExpr>,
    },

    /// Group and aggregate
    Aggregate {
        input: Box<QueryExpr>,
        group_by: Vec<ScalarExpr>,
        aggregates: Vec<Projection>,
    },

    /// Order rows
    Sort {
        input: Box<QueryExpr>,
        keys: Vec<SortKey>,
    },

    /// Skip / take rows; bounds are expressions so they can be parameters
    Limit {
        input: Box<QueryExpr>,
        skip: Option<ScalarExpr>,
        take: Option<ScalarExpr>,
    },

    /// Remove duplicate rows
    Distinct { input: Box<QueryExpr> },

    /// Set operation over two inputs
    SetOperation {
        op: SetOperator,
        left: Box<QueryExpr>,
        right: Box<QueryExpr>,
    },

    /// Eager-load a related data source through a navigation
    Include {
        input: Box<QueryExpr>,
        navigation: String,
        target: String,
    },
}

/// Scalar expression node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarExpr {
    Column {
        relation: Option<String>,
        name: String,
    },
    Literal(Value),
    /// Runtime parameter, resolved from the query's bindings
    Parameter(String),
    Binary {
        left: Box<ScalarExpr>,
        op: BinaryOperator,
        right: Box<ScalarExpr>,
    },
    Unary {
        op: UnaryOperator,
        expr: Box<ScalarExpr>,
    },
    Function {
        name: String,
        args: Vec<ScalarExpr>,
    },
    IsNull {
        expr: Box<ScalarExpr>,
        negated: bool,
    },
    InList {
        expr: Box<ScalarExpr>,
        list: Vec<ScalarExpr>,
        negated: bool,
    },
    InSubquery {
        expr: Box<ScalarExpr>,
        subquery: Box<QueryExpr>,
        negated: bool,
    },
    Exists {
        subquery: Box<QueryExpr>,
        negated: bool,
    },
    Subquery(Box<QueryExpr>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Projection {
    pub expr: ScalarExpr,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortKey {
    pub expr: ScalarExpr,
    pub descending: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SetOperator {
    Union,
    UnionAll,
    Intersect,
    Except,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOperator {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    Like,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOperator {
    Not,
    Negate,
}

impl JoinKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER",
            JoinKind::Left => "LEFT",
            JoinKind::Right => "RIGHT",
            JoinKind::Full => "FULL",
            JoinKind::Cross => "CROSS",
        }
    }
}

impl SetOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            SetOperator::Union => "UNION",
            SetOperator::UnionAll => "UNION ALL",
            SetOperator::Intersect => "INTERSECT",
            SetOperator::Except => "EXCEPT",
        }
    }
}

impl BinaryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOperator::Eq => "=",
            BinaryOperator::NotEq => "<>",
            BinaryOperator::Lt => "<",
            BinaryOperator::LtEq => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::GtEq => ">=",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Like => "LIKE",
        }
    }
}

impl UnaryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOperator::Not => "NOT",
            UnaryOperator::Negate => "-",
        }
    }
}

// Builder helpers

/// Start a query from a named data source
pub fn source(name: impl Into<String>) -> QueryExpr {
    QueryExpr::Source {
        name: name.into(),
        alias: None,
    }
}

/// Unqualified column reference
pub fn col(name: impl Into<String>) -> ScalarExpr {
    ScalarExpr::Column {
        relation: None,
        name: name.into(),
    }
}

/// Column reference qualified by a source alias
pub fn qualified_col(relation: impl Into<String>, name: impl Into<String>) -> ScalarExpr {
    ScalarExpr::Column {
        relation: Some(relation.into()),
        name: name.into(),
    }
}

pub fn lit(value: impl Into<Value>) -> ScalarExpr {
    ScalarExpr::Literal(value.into())
}

pub fn param(name: impl Into<String>) -> ScalarExpr {
    ScalarExpr::Parameter(name.into())
}

pub fn func(name: impl Into<String>, args: Vec<ScalarExpr>) -> ScalarExpr {
    ScalarExpr::Function {
        name: name.into(),
        args,
    }
}

pub fn exists(subquery: QueryExpr) -> ScalarExpr {
    ScalarExpr::Exists {
        subquery: Box::new(subquery),
        negated: false,
    }
}

impl QueryExpr {
    /// Give a `Source` node an alias; other nodes are returned unchanged
    pub fn alias(self, alias: impl Into<String>) -> Self {
        match self {
            QueryExpr::Source { name, .. } => QueryExpr::Source {
                name,
                alias: Some(alias.into()),
            },
            other => other,
        }
    }

    pub fn filter(self, predicate: ScalarExpr) -> Self {
        QueryExpr::Filter {
            input: Box::new(self),
            predicate,
        }
    }

    pub fn project(self, columns: Vec<ScalarExpr>) -> Self {
        QueryExpr::Project {
            input: Box::new(self),
            columns: columns
                .into_iter()
                .map(|expr| Projection { expr, alias: None })
                .collect(),
        }
    }

    pub fn join(self, kind: JoinKind, right: QueryExpr, on: Option<ScalarExpr>) -> Self {
        QueryExpr::Join {
            kind,
            left: Box::new(self),
            right: Box::new(right),
            on,
        }
    }

    pub fn inner_join(self, right: QueryExpr, on: ScalarExpr) -> Self {
        self.join(JoinKind::Inner, right, Some(on))
    }

    pub fn aggregate(self, group_by: Vec<ScalarExpr>, aggregates: Vec<Projection>) -> Self {
        QueryExpr::Aggregate {
            input: Box::new(self),
            group_by,
            aggregates,
        }
    }

    pub fn order_by(self, expr: ScalarExpr, descending: bool) -> Self {
        match self {
            QueryExpr::Sort { input, mut keys } => {
                keys.push(SortKey { expr, descending });
                QueryExpr::Sort { input, keys }
            }
            other => QueryExpr::Sort {
                input: Box::new(other),
                keys: vec![SortKey { expr, descending }],
            },
        }
    }

    pub fn limit(self, skip: Option<ScalarExpr>, take: Option<ScalarExpr>) -> Self {
        QueryExpr::Limit {
            input: Box::new(self),
            skip,
            take,
        }
    }

    pub fn take(self, take: ScalarExpr) -> Self {
        self.limit(None, Some(take))
    }

    pub fn distinct(self) -> Self {
        QueryExpr::Distinct {
            input: Box::new(self),
        }
    }

    pub fn set_operation(self, op: SetOperator, right: QueryExpr) -> Self {
        QueryExpr::SetOperation {
            op,
            left: Box::new(self),
            right: Box::new(right),
        }
    }

    pub fn union(self, right: QueryExpr) -> Self {
        self.set_operation(SetOperator::Union, right)
    }

    pub fn include(self, navigation: impl Into<String>, target: impl Into<String>) -> Self {
        QueryExpr::Include {
            input: Box::new(self),
            navigation: navigation.into(),
            target: target.into(),
        }
    }
}

impl ScalarExpr {
    fn binary(self, op: BinaryOperator, right: ScalarExpr) -> Self {
        ScalarExpr::Binary {
            left: Box::new(self),
            op,
            right: Box::new(right),
        }
    }

    pub fn eq(self, right: ScalarExpr) -> Self {
        self.binary(BinaryOperator::Eq, right)
    }

    pub fn not_eq(self, right: ScalarExpr) -> Self {
        self.binary(BinaryOperator::NotEq, right)
    }

    pub fn lt(self, right: ScalarExpr) -> Self {
        self.binary(BinaryOperator::Lt, right)
    }

    pub fn gt(self, right: ScalarExpr) -> Self {
        self.binary(BinaryOperator::Gt, right)
    }

    pub fn gt_eq(self, right: ScalarExpr) -> Self {
        self.binary(BinaryOperator::GtEq, right)
    }

    pub fn and(self, right: ScalarExpr) -> Self {
        self.binary(BinaryOperator::And, right)
    }

    pub fn or(self, right: ScalarExpr) -> Self {
        self.binary(BinaryOperator::Or, right)
    }

    pub fn like(self, pattern: ScalarExpr) -> Self {
        self.binary(BinaryOperator::Like, pattern)
    }

    pub fn not(self) -> Self {
        ScalarExpr::Unary {
            op: UnaryOperator::Not,
            expr: Box::new(self),
        }
    }

    pub fn is_null(self) -> Self {
        ScalarExpr::IsNull {
            expr: Box::new(self),
            negated: false,
        }
    }

    pub fn in_list(self, list: Vec<ScalarExpr>) -> Self {
        ScalarExpr::InList {
            expr: Box::new(self),
            list,
            negated: false,
        }
    }

    pub fn in_subquery(self, subquery: QueryExpr) -> Self {
        ScalarExpr::InSubquery {
            expr: Box::new(self),
            subquery: Box::new(subquery),
            negated: false,
        }
    }

    pub fn alias(self, alias: impl Into<String>) -> Projection {
        Projection {
            expr: self,
            alias: Some(alias.into()),
        }
    }
}
