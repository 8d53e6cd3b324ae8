// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::member_map;
use serde_json::json;

#[test]
fn equality_ignores_key_order() {
    let a = member_map(json!({"x": 1, "y": 2}));
    let mut b = MemberMap::new();
    b.insert("y".to_string(), Value::Int(2));
    b.insert("x".to_string(), Value::Int(1));
    assert_eq!(a, b);
}

#[test]
fn as_int_coercions() {
    assert_eq!(Value::Int(20).as_int(), Some(20));
    assert_eq!(Value::from("20").as_int(), Some(20));
    assert_eq!(Value::from(" 20 ").as_int(), Some(20));
    assert_eq!(Value::Bool(true).as_int(), Some(1));
    assert_eq!(Value::Bool(false).as_int(), Some(0));
    assert_eq!(Value::from("master").as_int(), None);
    assert_eq!(Value::List(vec![]).as_int(), None);
}

#[test]
fn render_scalars() {
    assert_eq!(Value::from("master").render(), "master");
    assert_eq!(Value::Int(-3).render(), "-3");
    assert_eq!(Value::Bool(true).render(), "true");
}

#[test]
fn deserializes_untagged_scalars() {
    let map = member_map(json!({"s": "1", "n": 1, "b": true}));
    assert_eq!(map.get("s"), Some(&Value::from("1")));
    assert_eq!(map.get("n"), Some(&Value::Int(1)));
    assert_eq!(map.get("b"), Some(&Value::Bool(true)));
}

#[test]
fn nested_maps_and_lists() {
    let map = member_map(json!({"db": {"ports": [5432, 5433]}}));
    let db = map.get("db").and_then(Value::as_map).unwrap();
    assert_eq!(
        db.get("ports"),
        Some(&Value::List(vec![Value::Int(5432), Value::Int(5433)]))
    );
}
