// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! zkfarm-conf: local configuration artifacts
//!
//! A configuration artifact is either a single file (JSON, YAML, or
//! write-only PHP) or a directory tree where each leaf file holds one
//! scalar. All writes are idempotent and atomic against readers.

mod atomic;
mod dir;
mod json;
mod php;
mod yaml;

mod conf;

#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use conf::{open, AnyConf, Conf, ConfError, Format};
pub use dir::DirConf;
pub use json::JsonConf;
pub use php::PhpConf;
pub use yaml::YamlConf;

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeConf;
