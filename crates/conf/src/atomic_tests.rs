// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn replaces_existing_content() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out");
    write_atomic(&path, b"first").unwrap();
    write_atomic(&path, b"second").unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), b"second");
}

#[test]
fn leaves_no_temp_files_behind() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out");
    write_atomic(&path, b"content").unwrap();
    let entries: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(entries, vec![std::ffi::OsString::from("out")]);
}
