// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! YAML file sink

use crate::atomic::write_atomic;
use crate::conf::{Conf, ConfError};
use std::path::{Path, PathBuf};
use zkfarm_core::MemberMap;

pub struct YamlConf {
    path: PathBuf,
}

impl YamlConf {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Conf for YamlConf {
    fn read(&self) -> Result<Option<MemberMap>, ConfError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&self.path)?;
        Ok(Some(serde_yaml::from_slice(&bytes)?))
    }

    fn write(&self, map: &MemberMap) -> Result<(), ConfError> {
        if self.read().ok().flatten().as_ref() == Some(map) {
            return Ok(());
        }
        write_atomic(&self.path, serde_yaml::to_string(map)?.as_bytes())
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
#[path = "yaml_tests.rs"]
mod tests;
