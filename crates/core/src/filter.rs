// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filter expressions over member maps
//!
//! A filter is a comma-separated list of predicates, AND-combined:
//!
//! ```text
//! enabled=1,weight>15,mysql.replication_delay<20,!maintenance
//! ```
//!
//! Each predicate is `path OP value` (`=`, `==`, `!=`, `>`, `>=`, `<`,
//! `<=`), a bare `path` ("exists"), or `!path` ("absent"). Comparison is
//! numeric when both sides read as integers, string otherwise.

use crate::path::get_path;
use crate::value::MemberMap;
use thiserror::Error;

/// Errors from compiling a filter expression
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("empty predicate in filter expression")]
    EmptyPredicate,
    #[error("missing comparison value in predicate: {0}")]
    MissingValue(String),
    #[error("malformed predicate: {0}")]
    Malformed(String),
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Op {
    fn apply<T: PartialOrd>(self, lhs: &T, rhs: &T) -> bool {
        match self {
            Op::Eq => lhs == rhs,
            Op::Ne => lhs != rhs,
            Op::Gt => lhs > rhs,
            Op::Ge => lhs >= rhs,
            Op::Lt => lhs < rhs,
            Op::Le => lhs <= rhs,
        }
    }
}

#[derive(Debug, Clone)]
enum Predicate {
    Compare { path: String, op: Op, value: String },
    Exists { path: String },
    Absent { path: String },
}

impl Predicate {
    fn matches(&self, map: &MemberMap) -> bool {
        match self {
            Predicate::Exists { path } => get_path(map, path).is_some(),
            Predicate::Absent { path } => get_path(map, path).is_none(),
            Predicate::Compare { path, op, value } => {
                // A missing left side never satisfies a comparison
                let Some(actual) = get_path(map, path) else {
                    return false;
                };
                match (actual.as_int(), value.trim().parse::<i64>().ok()) {
                    (Some(lhs), Some(rhs)) => op.apply(&lhs, &rhs),
                    _ => op.apply(&actual.render(), value),
                }
            }
        }
    }
}

/// A compiled filter expression
#[derive(Debug, Clone, Default)]
pub struct Filter {
    predicates: Vec<Predicate>,
}

impl Filter {
    /// Compile a filter expression. Spaces are ignored; the empty
    /// expression matches everything. Predicates that do not fit the
    /// grammar are rejected.
    pub fn parse(expr: &str) -> Result<Self, FilterError> {
        let expr: String = expr.chars().filter(|c| !c.is_whitespace()).collect();
        if expr.is_empty() {
            return Ok(Self::default());
        }
        let predicates = expr
            .split(',')
            .map(parse_predicate)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { predicates })
    }

    /// A filter that matches every map.
    pub fn match_all() -> Self {
        Self::default()
    }

    /// Apply the filter. All predicates must hold.
    pub fn matches(&self, map: &MemberMap) -> bool {
        self.predicates.iter().all(|p| p.matches(map))
    }
}

const OP_CHARS: &[char] = &['=', '!', '<', '>'];

fn parse_predicate(part: &str) -> Result<Predicate, FilterError> {
    if part.is_empty() {
        return Err(FilterError::EmptyPredicate);
    }
    if let Some(path) = part.strip_prefix('!') {
        if path.is_empty() || path.contains(OP_CHARS) {
            return Err(FilterError::Malformed(part.to_string()));
        }
        return Ok(Predicate::Absent {
            path: path.to_string(),
        });
    }
    let Some(idx) = part.find(OP_CHARS) else {
        return Ok(Predicate::Exists {
            path: part.to_string(),
        });
    };
    let (path, rest) = part.split_at(idx);
    if path.is_empty() {
        return Err(FilterError::Malformed(part.to_string()));
    }
    let (op, value) = split_operator(rest).ok_or_else(|| FilterError::Malformed(part.to_string()))?;
    if value.is_empty() {
        return Err(FilterError::MissingValue(part.to_string()));
    }
    if value.contains(OP_CHARS) {
        return Err(FilterError::Malformed(part.to_string()));
    }
    Ok(Predicate::Compare {
        path: path.to_string(),
        op,
        value: value.to_string(),
    })
}

fn split_operator(rest: &str) -> Option<(Op, &str)> {
    for (token, op) in [
        ("==", Op::Eq),
        ("!=", Op::Ne),
        (">=", Op::Ge),
        ("<=", Op::Le),
        ("=", Op::Eq),
        (">", Op::Gt),
        ("<", Op::Lt),
    ] {
        if let Some(value) = rest.strip_prefix(token) {
            return Some((op, value));
        }
    }
    None
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;
