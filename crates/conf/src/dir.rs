// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Directory tree sink
//!
//! Nested maps become subdirectories, scalars become files whose
//! trimmed contents are the value. Unix "invisible" entries are left
//! alone. Leaves are replaced atomically and only when changed.

use crate::atomic::write_atomic;
use crate::conf::{Conf, ConfError};
use std::path::{Path, PathBuf};
use zkfarm_core::{MemberMap, Value};

pub struct DirConf {
    path: PathBuf,
}

impl DirConf {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Conf for DirConf {
    fn read(&self) -> Result<Option<MemberMap>, ConfError> {
        if !self.path.exists() {
            return Ok(None);
        }
        Ok(Some(parse(&self.path)?))
    }

    fn write(&self, map: &MemberMap) -> Result<(), ConfError> {
        std::fs::create_dir_all(&self.path)?;
        dump(map, &self.path)
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

fn parse(dir: &Path) -> Result<MemberMap, ConfError> {
    let mut names: Vec<String> = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let name = entry?.file_name();
        if let Some(name) = name.to_str() {
            if !name.starts_with('.') {
                names.push(name.to_string());
            }
        }
    }
    names.sort();

    let mut map = MemberMap::new();
    for name in names {
        let entry_path = dir.join(&name);
        if entry_path.is_dir() {
            map.insert(name, Value::Map(parse(&entry_path)?));
        } else {
            match std::fs::read_to_string(&entry_path) {
                Ok(text) => {
                    map.insert(name, Value::Str(text.trim().to_string()));
                }
                // Skip leaves that are not valid UTF-8
                Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                    tracing::warn!(path = %entry_path.display(), "skipping non-utf8 entry");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
    Ok(map)
}

fn dump(map: &MemberMap, dir: &Path) -> Result<(), ConfError> {
    for (key, val) in map {
        let entry_path = dir.join(key);
        match val {
            Value::Str(s) => write_leaf(&entry_path, s)?,
            Value::Int(n) => write_leaf(&entry_path, &n.to_string())?,
            Value::Bool(b) => write_leaf(&entry_path, &b.to_string())?,
            Value::Map(nested) => {
                if entry_path.is_file() {
                    std::fs::remove_file(&entry_path)?;
                }
                if !entry_path.is_dir() {
                    std::fs::create_dir(&entry_path)?;
                }
                dump(nested, &entry_path)?;
            }
            Value::List(_) => {
                return Err(ConfError::Unrepresentable {
                    what: format!("sequence at `{key}`"),
                    format: "directory",
                })
            }
        }
    }

    // Prune entries that vanished from the map, leaving dot-entries alone
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let keep = match name.to_str() {
            Some(name) => name.starts_with('.') || map.contains_key(name),
            None => false,
        };
        if keep {
            continue;
        }
        let entry_path = entry.path();
        if entry_path.is_dir() {
            std::fs::remove_dir_all(&entry_path)?;
        } else {
            std::fs::remove_file(&entry_path)?;
        }
    }
    Ok(())
}

fn write_leaf(path: &Path, text: &str) -> Result<(), ConfError> {
    if path.is_dir() {
        std::fs::remove_dir_all(path)?;
    } else if path.exists() {
        if let Ok(current) = std::fs::read_to_string(path) {
            if current == text {
                return Ok(());
            }
        }
    }
    write_atomic(path, text.as_bytes())
}

#[cfg(test)]
#[path = "dir_tests.rs"]
mod tests;
