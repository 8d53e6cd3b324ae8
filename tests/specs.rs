// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end scenarios: real JSON artifacts on disk, an in-memory
//! coordination service, and the full agent wiring in between.

use serde_json::json;
use similar_asserts::assert_eq;
use std::os::unix::fs::MetadataExt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use zkfarm_adapters::{Coordinator, FakeObserver, MemoryCoordinator, OPEN_ACL_UNSAFE};
use zkfarm_conf::{Conf, JsonConf};
use zkfarm_core::test_support::member_map;
use zkfarm_core::{payload, Filter, MemberMap};
use zkfarm_engine::bus::PRIORITY_NORMAL;
use zkfarm_engine::{bridge_session, EventBus, Exporter, FarmEvent, Fsm, Joiner, Membership};

const TIMEOUT: Duration = Duration::from_millis(100);
const FARM: &str = "/services/db";
const NODE: &str = "/services/db/1.1.1.1";

fn add_member(zk: &MemoryCoordinator, id: &str, payload: serde_json::Value) {
    zk.ensure_path(FARM, OPEN_ACL_UNSAFE).unwrap();
    zk.create(
        &format!("{FARM}/{id}"),
        &serde_json::to_vec(&payload).unwrap(),
        OPEN_ACL_UNSAFE,
        false,
    )
    .unwrap();
}

fn read_json(path: &Path) -> MemberMap {
    serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}

fn exporter_fixture(
    zk: &MemoryCoordinator,
    dir: &Path,
    filter: &str,
) -> (JsonConf, Fsm<Exporter<MemoryCoordinator, JsonConf>>) {
    let conf = JsonConf::new(dir.join("snapshot.json"));
    let bus = Arc::new(EventBus::new());
    bridge_session(zk, &bus);
    let exporter = Exporter::new(
        zk.clone(),
        JsonConf::new(dir.join("snapshot.json")),
        FARM,
        Arc::clone(&bus),
        Filter::parse(filter).unwrap(),
    );
    (conf, Fsm::new(bus, exporter))
}

struct JoinerFixture {
    zk: MemoryCoordinator,
    observer: FakeObserver,
    bus: Arc<EventBus>,
    fsm: Fsm<Joiner<MemoryCoordinator, JsonConf, FakeObserver>>,
    artifact: std::path::PathBuf,
}

fn joiner_fixture(dir: &Path, membership: Membership, content: serde_json::Value) -> JoinerFixture {
    let artifact = dir.join("farm.json");
    std::fs::write(&artifact, serde_json::to_vec(&content).unwrap()).unwrap();
    let zk = MemoryCoordinator::new();
    let observer = FakeObserver::new();
    let bus = Arc::new(EventBus::new());
    bridge_session(&zk, &bus);
    let joiner = Joiner::new(
        zk.clone(),
        JsonConf::new(&artifact),
        FARM,
        membership,
        observer.clone(),
        Arc::clone(&bus),
    );
    let fsm = Fsm::new(Arc::clone(&bus), joiner);
    JoinerFixture {
        zk,
        observer,
        bus,
        fsm,
        artifact,
    }
}

fn member() -> Membership {
    Membership::Member {
        id: "1.1.1.1".to_string(),
        hostname: "zk-test".to_string(),
    }
}

#[test]
fn exporting_an_empty_farm_writes_an_empty_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let zk = MemoryCoordinator::new();
    let (conf, mut fsm) = exporter_fixture(&zk, dir.path(), "");
    fsm.step(Some(2), TIMEOUT).unwrap();
    assert_eq!(std::fs::read(conf.path()).unwrap(), b"{}".to_vec());
}

#[test]
fn exporting_a_farm_with_one_member() {
    let dir = tempfile::tempdir().unwrap();
    let zk = MemoryCoordinator::new();
    add_member(&zk, "1.1.1.1", json!({"enabled": "1"}));
    let (conf, mut fsm) = exporter_fixture(&zk, dir.path(), "");
    fsm.step(Some(2), TIMEOUT).unwrap();
    assert_eq!(
        read_json(conf.path()),
        member_map(json!({"1.1.1.1": {"enabled": "1"}}))
    );
}

#[test]
fn exporting_with_a_filter_keeps_matching_members() {
    let dir = tempfile::tempdir().unwrap();
    let zk = MemoryCoordinator::new();
    add_member(&zk, "1.1.1.1", json!({"enabled": 0, "weight": 20}));
    add_member(&zk, "2.2.2.2", json!({"enabled": 1, "weight": 20}));
    add_member(&zk, "3.3.3.3", json!({"enabled": 1, "weight": 10}));
    add_member(&zk, "4.4.4.4", json!({"enabled": 1, "weight": 30}));
    let (conf, mut fsm) = exporter_fixture(&zk, dir.path(), "enabled=1,weight>15");
    fsm.step(Some(2), TIMEOUT).unwrap();
    assert_eq!(
        read_json(conf.path()),
        member_map(json!({
            "2.2.2.2": {"enabled": 1, "weight": 20},
            "4.4.4.4": {"enabled": 1, "weight": 30},
        }))
    );
}

#[test]
fn joining_creates_an_ephemeral_member_node() {
    let dir = tempfile::tempdir().unwrap();
    let mut fx = joiner_fixture(dir.path(), member(), json!({"enabled": "1"}));
    fx.fsm.step(Some(3), TIMEOUT).unwrap();

    assert_eq!(
        payload::decode(&fx.zk.data(NODE).unwrap()),
        member_map(json!({"enabled": "1", "hostname": "zk-test"}))
    );
    assert_eq!(fx.zk.ephemeral_owner(NODE), Some(fx.zk.session_id()));
    // The artifact gained the hostname field
    assert_eq!(
        read_json(&fx.artifact),
        member_map(json!({"enabled": "1", "hostname": "zk-test"}))
    );
}

#[test]
fn local_edit_after_reconnect_reaches_the_node_without_a_local_rewrite() {
    let dir = tempfile::tempdir().unwrap();
    let mut fx = joiner_fixture(dir.path(), member(), json!({"enabled": "1"}));
    fx.fsm.step(Some(3), TIMEOUT).unwrap();

    fx.zk.expire_session();
    fx.fsm.step(Some(5), TIMEOUT).unwrap();

    // Operator edits the artifact; the filesystem observer reports it
    std::fs::write(
        &fx.artifact,
        serde_json::to_vec(&json!({"enabled": "0", "hostname": "zk-test"})).unwrap(),
    )
    .unwrap();
    let before = std::fs::metadata(&fx.artifact).unwrap().ino();
    fx.observer.emit_path(&fx.artifact);
    fx.fsm.step(Some(3), TIMEOUT).unwrap();

    assert_eq!(
        payload::decode(&fx.zk.data(NODE).unwrap()),
        member_map(json!({"enabled": "0", "hostname": "zk-test"}))
    );
    // No remote-to-local update happened: the artifact was never rewritten
    assert_eq!(std::fs::metadata(&fx.artifact).unwrap().ino(), before);
}

#[test]
fn echo_suppression_never_rolls_back_a_newer_local_edit() {
    let dir = tempfile::tempdir().unwrap();
    let mut fx = joiner_fixture(
        dir.path(),
        member(),
        json!({"enabled": "1", "hostname": "zk-test", "counter": 1000}),
    );
    fx.fsm.step(Some(3), TIMEOUT).unwrap();

    std::fs::write(
        &fx.artifact,
        serde_json::to_vec(&json!({"enabled": "1", "hostname": "zk-test", "counter": 1001}))
            .unwrap(),
    )
    .unwrap();
    fx.observer.emit_path(&fx.artifact);
    fx.fsm.step(Some(1), TIMEOUT).unwrap();

    // A second local edit lands while the echo of 1001 is still queued
    std::fs::write(
        &fx.artifact,
        serde_json::to_vec(&json!({"enabled": "1", "hostname": "zk-test", "counter": 1002}))
            .unwrap(),
    )
    .unwrap();
    let before = std::fs::metadata(&fx.artifact).unwrap().ino();
    fx.observer.emit_path(&fx.artifact);
    fx.fsm.step(Some(4), TIMEOUT).unwrap();

    assert_eq!(
        payload::decode(&fx.zk.data(NODE).unwrap()),
        member_map(json!({"enabled": "1", "hostname": "zk-test", "counter": 1002}))
    );
    // The echo was discarded instead of being written over the artifact
    assert_eq!(std::fs::metadata(&fx.artifact).unwrap().ino(), before);
}

#[test]
fn common_mode_adopts_remote_changes_after_reconnect() {
    let dir = tempfile::tempdir().unwrap();
    let mut fx = joiner_fixture(dir.path(), Membership::Common, json!({"enabled": "1"}));
    fx.fsm.step(Some(3), TIMEOUT).unwrap();

    fx.zk.expire_session();
    fx.zk
        .set(
            "/services/db/common",
            &serde_json::to_vec(&json!({"enabled": "22"})).unwrap(),
        )
        .unwrap();
    fx.fsm.step(Some(6), TIMEOUT).unwrap();

    assert_eq!(read_json(&fx.artifact), member_map(json!({"enabled": "22"})));
    assert_eq!(
        payload::decode(&fx.zk.data("/services/db/common").unwrap()),
        member_map(json!({"enabled": "22"}))
    );
}

#[test]
fn joiner_and_exporter_converge_through_the_same_service() {
    let dir = tempfile::tempdir().unwrap();
    let zk = MemoryCoordinator::new();

    // One host joins
    let artifact = dir.path().join("farm.json");
    std::fs::write(
        &artifact,
        serde_json::to_vec(&json!({"enabled": "1"})).unwrap(),
    )
    .unwrap();
    let joiner_bus = Arc::new(EventBus::new());
    let joiner = Joiner::new(
        zk.clone(),
        JsonConf::new(&artifact),
        FARM,
        member(),
        FakeObserver::new(),
        Arc::clone(&joiner_bus),
    );
    let mut joiner_fsm = Fsm::new(joiner_bus, joiner);
    joiner_fsm.step(Some(3), TIMEOUT).unwrap();

    // A consumer renders the farm
    let (conf, mut exporter_fsm) = exporter_fixture(&zk, dir.path(), "");
    exporter_fsm.step(Some(2), TIMEOUT).unwrap();
    assert_eq!(
        read_json(conf.path()),
        member_map(json!({"1.1.1.1": {"enabled": "1", "hostname": "zk-test"}}))
    );
}

#[test]
fn filesystem_events_drive_the_joiner_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let mut fx = joiner_fixture(dir.path(), member(), json!({"enabled": "1"}));
    fx.fsm.step(Some(3), TIMEOUT).unwrap();
    assert!(fx.bus.is_empty());

    // Unrelated sibling files do not wake the joiner
    fx.observer.emit_path(dir.path().parent().unwrap().join("other"));
    assert!(fx.bus.is_empty());

    std::fs::write(
        &fx.artifact,
        serde_json::to_vec(&json!({"enabled": "0", "hostname": "zk-test"})).unwrap(),
    )
    .unwrap();
    fx.observer.emit_path(&fx.artifact);
    assert_eq!(
        fx.bus.pop(TIMEOUT),
        Some((PRIORITY_NORMAL, FarmEvent::LocalModified))
    );
}
