// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Member Map value model

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A member's advertised configuration: a nested string-keyed map.
///
/// Insertion order is preserved for stable serialization; equality
/// ignores it.
pub type MemberMap = IndexMap<String, Value>;

/// A value stored in a [`MemberMap`].
///
/// Payloads are dynamically typed: scalars, ordered sequences of values,
/// or nested maps. The untagged representation matches the JSON wire
/// form (`true`, `42`, `"text"`, `[..]`, `{..}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<Value>),
    Map(MemberMap),
}

impl Value {
    /// Coerce to an integer where the value has a natural integer
    /// reading: integers verbatim, booleans as 0/1, strings via parse.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Str(s) => s.trim().parse().ok(),
            Value::List(_) | Value::Map(_) => None,
        }
    }

    /// Canonical string rendering used for string comparison.
    pub fn render(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            Value::Int(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            // Containers compare by their JSON form
            other => serde_json::to_string(other).unwrap_or_default(),
        }
    }

    /// Borrow the nested map, if this value is one.
    pub fn as_map(&self) -> Option<&MemberMap> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<MemberMap> for Value {
    fn from(m: MemberMap) -> Self {
        Value::Map(m)
    }
}

impl From<Vec<Value>> for Value {
    fn from(l: Vec<Value>) -> Self {
        Value::List(l)
    }
}

#[cfg(test)]
#[path = "value_tests.rs"]
mod tests;
