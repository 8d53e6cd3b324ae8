// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use zkfarm_core::test_support::member_map;

#[yare::parameterized(
    json = { "farm.json", Format::Json },
    yaml = { "farm.yaml", Format::Yaml },
    php  = { "farm.php",  Format::Php },
)]
fn detects_format_by_extension(name: &str, expected: Format) {
    let dir = tempfile::tempdir().unwrap();
    let conf = open(dir.path().join(name), None).unwrap();
    let found = match conf {
        AnyConf::Json(_) => Format::Json,
        AnyConf::Yaml(_) => Format::Yaml,
        AnyConf::Php(_) => Format::Php,
        AnyConf::Dir(_) => Format::Dir,
    };
    assert_eq!(found, expected);
}

#[test]
fn detects_directories() {
    let dir = tempfile::tempdir().unwrap();
    let conf = open(dir.path(), None).unwrap();
    assert!(matches!(conf, AnyConf::Dir(_)));
}

#[test]
fn explicit_format_overrides_extension() {
    let dir = tempfile::tempdir().unwrap();
    let conf = open(dir.path().join("farm.json"), Some(Format::Yaml)).unwrap();
    assert!(matches!(conf, AnyConf::Yaml(_)));
}

#[test]
fn unknown_extension_is_a_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = open(dir.path().join("farm.ini"), None);
    assert!(matches!(result, Err(ConfError::UnknownFormat(_))));
}

#[test]
fn format_parses_from_str() {
    assert_eq!("json".parse::<Format>().unwrap(), Format::Json);
    assert_eq!("yaml".parse::<Format>().unwrap(), Format::Yaml);
    assert_eq!("php".parse::<Format>().unwrap(), Format::Php);
    assert_eq!("dir".parse::<Format>().unwrap(), Format::Dir);
    assert!("toml".parse::<Format>().is_err());
}

#[test]
fn any_conf_delegates_to_the_selected_sink() {
    let dir = tempfile::tempdir().unwrap();
    let conf = open(dir.path().join("farm.json"), None).unwrap();
    let map = member_map(json!({"enabled": "1"}));
    conf.write(&map).unwrap();
    assert_eq!(conf.read().unwrap(), Some(map));
}
