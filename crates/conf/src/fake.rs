// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory sink double for tests

use crate::conf::{Conf, ConfError};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use zkfarm_core::MemberMap;

#[derive(Default)]
struct FakeConfState {
    content: Option<MemberMap>,
    writes: Vec<MemberMap>,
    fail_reads: bool,
}

/// A sink whose reads are canned and whose writes are recorded.
///
/// Clones share state, so a test can keep a handle after handing the
/// fake to an agent.
#[derive(Clone, Default)]
pub struct FakeConf {
    path: PathBuf,
    state: Arc<Mutex<FakeConfState>>,
}

impl FakeConf {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: Arc::default(),
        }
    }

    /// Set what subsequent `read` calls return.
    pub fn set_content(&self, content: Option<MemberMap>) {
        self.state.lock().content = content;
    }

    /// Make subsequent `read` calls fail with an I/O error.
    pub fn fail_reads(&self, fail: bool) {
        self.state.lock().fail_reads = fail;
    }

    /// All maps written so far, oldest first.
    pub fn writes(&self) -> Vec<MemberMap> {
        self.state.lock().writes.clone()
    }

    pub fn write_count(&self) -> usize {
        self.state.lock().writes.len()
    }

    /// Forget recorded writes, keeping the canned content.
    pub fn clear_writes(&self) {
        self.state.lock().writes.clear();
    }
}

impl Conf for FakeConf {
    fn read(&self) -> Result<Option<MemberMap>, ConfError> {
        let state = self.state.lock();
        if state.fail_reads {
            return Err(ConfError::Io(std::io::Error::other("injected read failure")));
        }
        Ok(state.content.clone())
    }

    fn write(&self, map: &MemberMap) -> Result<(), ConfError> {
        let mut state = self.state.lock();
        state.writes.push(map.clone());
        state.content = Some(map.clone());
        Ok(())
    }

    fn path(&self) -> &Path {
        &self.path
    }
}
