// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PHP file sink (write-only)
//!
//! Renders `<?php return <literal>;` for direct inclusion by PHP
//! consumers. There is no reader; the coordination tree is the source
//! of truth for this format.

use crate::atomic::write_atomic;
use crate::conf::{Conf, ConfError};
use std::path::{Path, PathBuf};
use zkfarm_core::{MemberMap, Value};

const INDENT: &str = "    ";

pub struct PhpConf {
    path: PathBuf,
}

impl PhpConf {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Conf for PhpConf {
    fn read(&self) -> Result<Option<MemberMap>, ConfError> {
        Err(ConfError::ReadUnsupported("php"))
    }

    fn write(&self, map: &MemberMap) -> Result<(), ConfError> {
        let literal = render_map(map, 0)?;
        write_atomic(&self.path, format!("<?php return {literal};").as_bytes())
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\0' => quoted.push_str("\\\0"),
            '\n' => quoted.push_str("\\n"),
            '\\' => quoted.push_str("\\\\"),
            other => quoted.push(other),
        }
    }
    quoted
}

fn render(value: &Value, lvl: usize) -> Result<String, ConfError> {
    match value {
        Value::Int(n) => Ok(n.to_string()),
        Value::Str(s) => Ok(format!("\"{}\"", quote(s))),
        Value::Bool(true) => Ok("true".to_string()),
        Value::Bool(false) => Ok("false".to_string()),
        Value::Map(map) => render_map(map, lvl),
        Value::List(items) => {
            let body = items
                .iter()
                .map(|item| render(item, 0))
                .collect::<Result<Vec<_>, _>>()?
                .join(",");
            Ok(format!("array({body})"))
        }
    }
}

fn render_map(map: &MemberMap, lvl: usize) -> Result<String, ConfError> {
    let indent = INDENT.repeat(lvl);
    let body = map
        .iter()
        .map(|(key, val)| {
            Ok(format!(
                "{}{}\"{}\" => {}",
                indent,
                INDENT,
                quote(key),
                render(val, lvl + 1)?
            ))
        })
        .collect::<Result<Vec<_>, ConfError>>()?
        .join(",\n");
    Ok(format!("array\n{indent}(\n{body}\n{indent})"))
}

#[cfg(test)]
#[path = "php_tests.rs"]
mod tests;
