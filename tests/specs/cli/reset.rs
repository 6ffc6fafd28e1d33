// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `pex reset` specs

use crate::prelude::*;

fn running_node(temp: &Project, id: u64) -> Value {
    let mut node = temp.node(id, None, &[], "true\n");
    node["state"] = json!("RUNNING");
    node
}

#[test]
fn reset_reverts_running_nodes() {
    let temp = Project::empty();
    temp.nodes(vec![running_node(&temp, 1), running_node(&temp, 2)]);

    temp.pex().args(&["reset"]).passes().stdout_has("Reverted 2 node(s)");

    assert_eq!(temp.node_state(1), "WAITING");
    assert_eq!(temp.node_state(2), "WAITING");
}

#[test]
fn reset_refuses_while_marker_exists() {
    let temp = Project::empty();
    temp.nodes(vec![running_node(&temp, 1)]);
    std::fs::write(temp.marker_path(), "1").unwrap();

    let run = temp.pex().args(&["reset"]).fails();
    assert_eq!(run.code(), Some(2));
    assert_eq!(temp.node_state(1), "RUNNING");
}

#[test]
fn forced_reset_removes_marker() {
    let temp = Project::empty();
    temp.nodes(vec![running_node(&temp, 1)]);
    std::fs::write(temp.marker_path(), "1").unwrap();

    temp.pex().args(&["reset", "--force"]).passes();

    assert!(!temp.marker_path().exists());
    assert_eq!(temp.node_state(1), "WAITING");
}
