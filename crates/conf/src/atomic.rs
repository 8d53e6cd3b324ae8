// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic file replacement
//!
//! Writes go to a temp file in the destination directory, get the mode
//! the process umask would give a plainly-created file, and are renamed
//! into place. Readers never observe a partial file; the temp file is
//! unlinked if anything fails before the rename.

use crate::conf::ConfError;
use nix::sys::stat::{umask, Mode};
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

/// Replace `path` with `bytes`, atomically.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ConfError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::Builder::new()
        .prefix(".zkfarm-")
        .tempfile_in(dir)?;

    // Read the process umask without disturbing it
    let current = umask(Mode::empty());
    umask(current);
    let mode = 0o666 & !current.bits();
    tmp.as_file()
        .set_permissions(std::fs::Permissions::from_mode(mode.into()))?;

    tmp.write_all(bytes)?;
    tmp.persist(path).map_err(|e| ConfError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
#[path = "atomic_tests.rs"]
mod tests;
