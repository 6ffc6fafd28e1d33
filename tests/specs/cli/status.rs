// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `pex status` specs

use crate::prelude::*;

#[test]
fn status_without_store_fails() {
    let temp = Project::empty();
    temp.pex().args(&["status"]).fails().stderr_has("cannot open record store");
}

#[test]
fn status_lists_nodes() {
    let temp = Project::empty();
    let script = temp.recording_script("true");
    temp.nodes(vec![temp.node(1, None, &["a.txt"], &script), temp.node(2, Some(1), &[], &script)]);

    let out = temp.pex().args(&["status"]).passes().stdout_has("Scheduler: not running").stdout();
    let rows: Vec<&str> = out.lines().filter(|l| l.contains("WAITING")).collect();
    assert_eq!(rows.len(), 2, "{out}");
}

#[test]
fn status_json_is_the_node_table() {
    let temp = Project::empty();
    let script = temp.recording_script("true");
    temp.nodes(vec![temp.node(1, None, &[], &script), temp.node(2, Some(1), &[], &script)]);

    let out = temp.pex().args(&["status", "--format", "json"]).passes().stdout();
    let nodes: Value = serde_json::from_str(&out).unwrap();
    let ids: Vec<u64> = nodes.as_array().unwrap().iter().filter_map(|n| n["id"].as_u64()).collect();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn store_flag_overrides_default_location() {
    let temp = Project::empty();
    let script = temp.recording_script("true");
    temp.nodes(vec![temp.node(9, None, &[], &script)]);
    let moved = temp.path().join("elsewhere.json");
    std::fs::rename(temp.state_path().join("nodes.json"), &moved).unwrap();

    temp.pex()
        .args(&["status", "--store", moved.to_str().unwrap()])
        .passes()
        .stdout_has("WAITING");
}
