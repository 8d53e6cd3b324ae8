// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Helpers for building member maps in tests

use crate::value::MemberMap;

/// Build a [`MemberMap`] from a `serde_json::json!` literal.
///
/// Panics on non-map input; for test construction only.
#[allow(clippy::panic)]
pub fn member_map(value: serde_json::Value) -> MemberMap {
    match serde_json::from_value(value) {
        Ok(map) => map,
        Err(e) => panic!("not a member map: {e}"),
    }
}
