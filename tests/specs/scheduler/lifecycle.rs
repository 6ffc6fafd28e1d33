// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Liveness marker, stop and interrupt specs

use crate::prelude::*;
use std::process::Child;

fn wait_exit(child: &mut Child) -> Option<i32> {
    let mut code = None;
    let exited = wait_for(SPEC_WAIT_MAX_MS, || match child.try_wait() {
        Ok(Some(status)) => {
            code = status.code();
            true
        }
        _ => false,
    });
    if !exited {
        let _ = child.kill();
        panic!("pex did not exit");
    }
    code
}

/// Start a run whose only node blocks in its first file.
fn blocked_run(temp: &Project) -> Child {
    let script = temp.recording_script("exec sleep 30");
    temp.nodes(vec![temp.node(1, None, &["a.txt"], &script), temp.node(2, None, &["a.txt"], &script)]);
    let child = temp.pex().args(&["--kill-on-stop"]).spawn();
    let running = wait_for(SPEC_WAIT_MAX_MS, || temp.launched().len() == 2);
    assert!(running, "both nodes should launch");
    child
}

#[test]
fn existing_marker_aborts_startup() {
    let temp = Project::empty();
    let script = temp.recording_script("true");
    temp.nodes(vec![temp.node(1, None, &["a.txt"], &script)]);
    std::fs::write(temp.marker_path(), "1").unwrap();

    let run = temp.pex().fails().stderr_has("already exists");
    assert_eq!(run.code(), Some(2));
    assert!(temp.launched().is_empty());
    assert!(temp.marker_path().exists());
}

#[test]
fn marker_is_removed_when_idle() {
    let temp = Project::empty();
    let script = temp.recording_script("true");
    temp.nodes(vec![temp.node(1, None, &["a.txt"], &script)]);

    temp.pex().passes();

    assert!(!temp.marker_path().exists());
}

#[test]
fn empty_tree_completes_immediately() {
    let temp = Project::empty();
    temp.nodes(Vec::new());

    temp.pex().passes().stdout_has("0 finished");
    assert!(!temp.marker_path().exists());
}

#[test]
fn removing_marker_stops_and_reverts() {
    let temp = Project::empty();
    let mut child = blocked_run(&temp);
    assert_eq!(temp.node_state(1), "RUNNING");
    assert_eq!(temp.node_state(2), "RUNNING");

    std::fs::remove_file(temp.marker_path()).unwrap();

    assert_eq!(wait_exit(&mut child), Some(0));
    assert_eq!(temp.node_state(1), "WAITING");
    assert_eq!(temp.node_state(2), "WAITING");
}

#[test]
fn interrupt_shuts_down_and_reverts() {
    let temp = Project::empty();
    let mut child = blocked_run(&temp);

    let status = std::process::Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());

    assert_eq!(wait_exit(&mut child), Some(130));
    assert!(!temp.marker_path().exists());
    assert_eq!(temp.node_state(1), "WAITING");
    assert_eq!(temp.node_state(2), "WAITING");
}
