// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dotted-path access into nested member maps

use crate::value::{MemberMap, Value};

/// Fetch the value at a dotted path, `None` if any component is missing
/// or a non-map value is traversed.
pub fn get_path<'a>(map: &'a MemberMap, path: &str) -> Option<&'a Value> {
    let mut components = path.split('.');
    let first = components.next()?;
    let mut current = map.get(first)?;
    for component in components {
        current = current.as_map()?.get(component)?;
    }
    Some(current)
}

/// Set the value at a dotted path, creating intermediate maps as needed.
/// A non-map intermediate is replaced by a map.
pub fn set_path(map: &mut MemberMap, path: &str, value: Value) {
    let mut components: Vec<&str> = path.split('.').collect();
    let leaf = match components.pop() {
        Some(leaf) => leaf,
        None => return,
    };
    let mut current = map;
    for component in components {
        let slot = current
            .entry(component.to_string())
            .or_insert_with(|| Value::Map(MemberMap::new()));
        if !matches!(slot, Value::Map(_)) {
            *slot = Value::Map(MemberMap::new());
        }
        let Value::Map(next) = slot else { return };
        current = next;
    }
    current.insert(leaf.to_string(), value);
}

/// Remove the value at a dotted path. Returns whether anything was
/// removed. Intermediate maps left empty are kept.
pub fn unset_path(map: &mut MemberMap, path: &str) -> bool {
    let mut components: Vec<&str> = path.split('.').collect();
    let leaf = match components.pop() {
        Some(leaf) => leaf,
        None => return false,
    };
    let mut current = map;
    for component in components {
        current = match current.get_mut(component).and_then(|v| match v {
            Value::Map(m) => Some(m),
            _ => None,
        }) {
            Some(m) => m,
            None => return false,
        };
    }
    current.shift_remove(leaf).is_some()
}

/// Project a map onto a set of dotted paths. Paths that resolve appear
/// under their full dotted name; missing paths are omitted.
pub fn select_fields(map: &MemberMap, fields: &[String]) -> MemberMap {
    let mut selected = MemberMap::new();
    for field in fields {
        if let Some(value) = get_path(map, field) {
            selected.insert(field.clone(), value.clone());
        }
    }
    selected
}

#[cfg(test)]
#[path = "path_tests.rs"]
mod tests;
