// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The sink contract and format selection

use crate::dir::DirConf;
use crate::json::JsonConf;
use crate::php::PhpConf;
use crate::yaml::YamlConf;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use zkfarm_core::MemberMap;

/// Errors from reading or writing a configuration artifact
#[derive(Debug, Error)]
pub enum ConfError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("cannot parse json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cannot parse yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("reading {0} configurations is not implemented")]
    ReadUnsupported(&'static str),
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("cannot detect file format of {}", .0.display())]
    UnknownFormat(PathBuf),
    #[error("cannot represent {what} in a {format} configuration")]
    Unrepresentable {
        what: String,
        format: &'static str,
    },
}

/// A local configuration artifact.
///
/// `read` yields `None` when the artifact does not exist yet. `write`
/// is a no-op when the proposed content equals the current content, so
/// feeding a sink its own output never touches the storage.
pub trait Conf: Send {
    fn read(&self) -> Result<Option<MemberMap>, ConfError>;
    fn write(&self, map: &MemberMap) -> Result<(), ConfError>;
    fn path(&self) -> &Path;
}

/// Supported artifact formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
    Php,
    Dir,
}

impl FromStr for Format {
    type Err = ConfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Format::Json),
            "yaml" => Ok(Format::Yaml),
            "php" => Ok(Format::Php),
            "dir" => Ok(Format::Dir),
            other => Err(ConfError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Any of the supported sinks, selected at runtime
pub enum AnyConf {
    Json(JsonConf),
    Yaml(YamlConf),
    Php(PhpConf),
    Dir(DirConf),
}

impl Conf for AnyConf {
    fn read(&self) -> Result<Option<MemberMap>, ConfError> {
        match self {
            AnyConf::Json(c) => c.read(),
            AnyConf::Yaml(c) => c.read(),
            AnyConf::Php(c) => c.read(),
            AnyConf::Dir(c) => c.read(),
        }
    }

    fn write(&self, map: &MemberMap) -> Result<(), ConfError> {
        match self {
            AnyConf::Json(c) => c.write(map),
            AnyConf::Yaml(c) => c.write(map),
            AnyConf::Php(c) => c.write(map),
            AnyConf::Dir(c) => c.write(map),
        }
    }

    fn path(&self) -> &Path {
        match self {
            AnyConf::Json(c) => c.path(),
            AnyConf::Yaml(c) => c.path(),
            AnyConf::Php(c) => c.path(),
            AnyConf::Dir(c) => c.path(),
        }
    }
}

/// Open an artifact, selecting the sink by explicit format when given,
/// otherwise by extension or by being a directory. An undetectable
/// format is a configuration error.
pub fn open(path: impl Into<PathBuf>, format: Option<Format>) -> Result<AnyConf, ConfError> {
    let path = path.into();
    let format = match format {
        Some(format) => format,
        None => detect(&path)?,
    };
    Ok(match format {
        Format::Json => AnyConf::Json(JsonConf::new(path)),
        Format::Yaml => AnyConf::Yaml(YamlConf::new(path)),
        Format::Php => AnyConf::Php(PhpConf::new(path)),
        Format::Dir => AnyConf::Dir(DirConf::new(path)),
    })
}

fn detect(path: &Path) -> Result<Format, ConfError> {
    if path.is_dir() {
        return Ok(Format::Dir);
    }
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Ok(Format::Json),
        Some("yaml") => Ok(Format::Yaml),
        Some("php") => Ok(Format::Php),
        _ => Err(ConfError::UnknownFormat(path.to_path_buf())),
    }
}

#[cfg(test)]
#[path = "conf_tests.rs"]
mod tests;
