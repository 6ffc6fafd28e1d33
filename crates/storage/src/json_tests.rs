// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use pex_core::test_support::record;
use pex_core::FakeClock;
use std::time::Duration;
use tempfile::tempdir;

fn store_with(nodes: Vec<NodeRecord>) -> (tempfile::TempDir, JsonStore<FakeClock>, FakeClock) {
    let dir = tempdir().unwrap();
    let clock = FakeClock::new();
    let store = JsonStore::create(dir.path().join("nodes.json"), nodes, clock.clone()).unwrap();
    (dir, store, clock)
}

fn state_of(store: &JsonStore<FakeClock>, id: u64) -> NodeRecord {
    store.all_nodes().unwrap().into_iter().find(|n| n.id == id).unwrap()
}

#[test]
fn open_missing_file_fails() {
    let dir = tempdir().unwrap();
    let err = JsonStore::open(dir.path().join("missing.json")).err().unwrap();
    assert!(matches!(err, StoreError::Io { .. }));
}

#[test]
fn open_malformed_file_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nodes.json");
    std::fs::write(&path, "{ not json").unwrap();
    let err = JsonStore::open(&path).err().unwrap();
    assert!(matches!(err, StoreError::Malformed { .. }));
}

#[test]
fn eligible_nodes_filters_and_orders() {
    let mut finished_ok = record(4, None);
    finished_ok.state = NodeState::Finished;
    let mut finished_err = record(5, Some(1));
    finished_err.state = NodeState::Finished;
    finished_err.error = Some("exit".to_string());
    let mut running = record(6, None);
    running.state = NodeState::Running;

    let (_dir, store, _) = store_with(vec![
        record(2, Some(1)),
        finished_ok,
        record(1, None),
        finished_err,
        running,
    ]);

    let ids: Vec<u64> = store.eligible_nodes().unwrap().iter().map(|n| n.id.get()).collect();
    assert_eq!(ids, vec![1, 2, 5]);
}

#[test]
fn mark_running_then_finished_stamps_times() {
    let (_dir, store, clock) = store_with(vec![record(1, None)]);

    store.mark_running(NodeId::new(1)).unwrap();
    let node = state_of(&store, 1);
    assert_eq!(node.state, NodeState::Running);
    assert_eq!(node.started_at_ms, Some(1_000_000));

    clock.advance(Duration::from_secs(2));
    store.mark_finished(NodeId::new(1), Some("script missing")).unwrap();
    let node = state_of(&store, 1);
    assert_eq!(node.state, NodeState::Finished);
    assert_eq!(node.finished_at_ms, Some(1_002_000));
    assert_eq!(node.error.as_deref(), Some("script missing"));
    assert!(node.is_eligible());
}

#[test]
fn mark_finished_clears_previous_error_on_success() {
    let mut failed = record(1, None);
    failed.state = NodeState::Finished;
    failed.error = Some("boom".to_string());
    let (_dir, store, _) = store_with(vec![failed]);

    store.mark_finished(NodeId::new(1), None).unwrap();
    assert!(state_of(&store, 1).error.is_none());
    assert!(store.eligible_nodes().unwrap().is_empty());
}

#[test]
fn marking_unknown_node_is_not_found() {
    let (_dir, store, _) = store_with(vec![record(1, None)]);
    let err = store.mark_running(NodeId::new(99)).unwrap_err();
    assert!(matches!(err, StoreError::NotFound(id) if id == 99));
}

#[test]
fn revert_running_returns_rows_to_waiting() {
    let (_dir, store, _) = store_with(vec![record(1, None), record(2, None), record(3, None)]);
    store.mark_running(NodeId::new(1)).unwrap();
    store.mark_running(NodeId::new(2)).unwrap();

    assert_eq!(store.revert_running().unwrap(), 2);

    for id in [1, 2] {
        let node = state_of(&store, id);
        assert_eq!(node.state, NodeState::Waiting);
        assert!(node.started_at_ms.is_none());
    }
    assert_eq!(store.revert_running().unwrap(), 0);
}

#[test]
fn changes_survive_reopen() {
    let (dir, store, _) = store_with(vec![record(1, None)]);
    store.mark_running(NodeId::new(1)).unwrap();
    drop(store);

    let reopened = JsonStore::open(dir.path().join("nodes.json")).unwrap();
    let node = reopened.all_nodes().unwrap().remove(0);
    assert_eq!(node.state, NodeState::Running);
    assert!(!dir.path().join("nodes.json.tmp").exists());
}

#[test]
fn leftover_temp_file_is_replaced_on_save() {
    let (dir, store, _) = store_with(vec![record(1, None), record(2, None)]);
    let tmp = dir.path().join("nodes.json.tmp");
    std::fs::write(&tmp, "{\"nodes\": [trunc").unwrap();

    store.mark_running(NodeId::new(2)).unwrap();

    assert!(!tmp.exists());
    let reopened = JsonStore::open(dir.path().join("nodes.json")).unwrap();
    assert_eq!(reopened.all_nodes().unwrap().len(), 2);
    assert_eq!(state_of(&store, 2).state, NodeState::Running);
}

#[test]
fn write_synced_truncates_existing_content() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("table.json.tmp");
    std::fs::write(&path, "a much longer previous body").unwrap();

    write_synced(&path, b"{}").unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
}
