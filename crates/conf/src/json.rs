// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON file sink

use crate::atomic::write_atomic;
use crate::conf::{Conf, ConfError};
use std::path::{Path, PathBuf};
use zkfarm_core::MemberMap;

pub struct JsonConf {
    path: PathBuf,
}

impl JsonConf {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Conf for JsonConf {
    fn read(&self) -> Result<Option<MemberMap>, ConfError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&self.path)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    fn write(&self, map: &MemberMap) -> Result<(), ConfError> {
        // Unreadable current content is overwritten rather than compared
        if self.read().ok().flatten().as_ref() == Some(map) {
            return Ok(());
        }
        write_atomic(&self.path, &serde_json::to_vec(map)?)
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
#[path = "json_tests.rs"]
mod tests;
