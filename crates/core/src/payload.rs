// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tolerant JSON codec for member node payloads

use crate::value::{MemberMap, Value};

/// Serialize a member map to its JSON payload.
///
/// Serialization of a string-keyed map cannot ordinarily fail; if it
/// does, the error is logged and an empty map payload is returned so a
/// single bad entry cannot take an agent down.
pub fn encode(map: &MemberMap) -> Vec<u8> {
    match serde_json::to_vec(map) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "cannot serialize member map");
            b"{}".to_vec()
        }
    }
}

/// Deserialize a member node payload.
///
/// Empty, malformed, or non-map payloads decode to the empty map: a
/// corrupt member must not crash the snapshot.
pub fn decode(data: &[u8]) -> MemberMap {
    if data.is_empty() {
        return MemberMap::new();
    }
    match serde_json::from_slice::<Value>(data) {
        Ok(Value::Map(map)) => map,
        Ok(_) => {
            tracing::warn!("payload is not a map, treating as empty");
            MemberMap::new()
        }
        Err(e) => {
            tracing::warn!(error = %e, "cannot deserialize payload, treating as empty");
            MemberMap::new()
        }
    }
}

#[cfg(test)]
#[path = "payload_tests.rs"]
mod tests;
