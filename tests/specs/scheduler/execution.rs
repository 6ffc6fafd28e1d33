// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end tree execution specs

use crate::prelude::*;

#[test]
fn children_run_after_parent_succeeds() {
    let temp = Project::empty();
    let script = temp.recording_script("cat ${input_file} > ${output_dir}/${input_name}.out");
    temp.nodes(vec![
        temp.node(1, None, &["a.txt", "b.txt"], &script),
        temp.node(2, Some(1), &["x.txt"], &script),
        temp.node(3, Some(1), &["y.txt"], &script),
    ]);

    temp.pex().passes().stdout_has("3 finished (0 failed), 0 waiting");

    let mut launched = temp.launched();
    assert_eq!(&launched[..2], &["1:a.txt", "1:b.txt"]);
    launched.sort();
    assert_eq!(launched, vec!["1:a.txt", "1:b.txt", "2:x.txt", "3:y.txt"]);
    for id in 1..=3 {
        assert_eq!(temp.node_state(id), "FINISHED");
    }
    let out = std::fs::read_to_string(temp.path().join("out/1/b.txt.out")).unwrap();
    assert_eq!(out, "data b.txt\n");
}

#[test]
fn failed_parent_leaves_children_waiting() {
    let temp = Project::empty();
    let script = temp.recording_script("true");
    let mut parent = temp.node(1, None, &["a.txt"], &script);
    parent["script"] = json!(temp.path().join("scripts/missing.sh"));
    temp.nodes(vec![parent, temp.node(2, Some(1), &["x.txt"], &script)]);

    temp.pex().passes().stdout_has("1 finished (1 failed), 1 waiting");

    assert!(temp.launched().is_empty());
    let table = temp.node_table();
    assert_eq!(table[0]["state"], "FINISHED");
    assert!(table[0]["error"].as_str().unwrap().contains("cannot read script"));
    assert_eq!(table[1]["state"], "WAITING");
}

#[test]
fn failed_node_is_retried_on_next_run() {
    let temp = Project::empty();
    let script = temp.recording_script("true");
    let mut parent = temp.node(1, None, &["a.txt"], &script);
    let real_script = parent["script"].clone();
    parent["script"] = json!(temp.path().join("scripts/later.sh"));
    temp.nodes(vec![parent, temp.node(2, Some(1), &["x.txt"], &script)]);

    temp.pex().passes();
    assert!(temp.launched().is_empty());

    std::fs::copy(real_script.as_str().unwrap(), temp.path().join("scripts/later.sh")).unwrap();
    temp.pex().passes().stdout_has("2 finished (0 failed)");

    assert_eq!(temp.launched(), vec!["1:a.txt", "2:x.txt"]);
    assert!(temp.node_table()[0]["error"].is_null());
}

#[test]
fn finished_nodes_are_not_rerun() {
    let temp = Project::empty();
    let script = temp.recording_script("true");
    temp.nodes(vec![temp.node(1, None, &["a.txt"], &script)]);

    temp.pex().passes();
    temp.pex().passes();

    assert_eq!(temp.launched(), vec!["1:a.txt"]);
}

#[test]
fn non_zero_exit_is_not_a_failure() {
    let temp = Project::empty();
    let script = temp.recording_script("exit 4");
    temp.nodes(vec![temp.node(1, None, &["a.txt"], &script), temp.node(2, Some(1), &["x.txt"], &script)]);

    temp.pex().passes().stdout_has("2 finished (0 failed)");
    assert_eq!(temp.launched(), vec!["1:a.txt", "2:x.txt"]);
}

#[test]
fn concurrency_cap_serializes_roots() {
    let temp = Project::empty();
    let log = temp.path().join("spans.log");
    let script = format!(
        "echo start >> '{0}'\nsleep 0.2\necho end >> '{0}'\n",
        log.display()
    );
    temp.nodes(vec![
        temp.node(1, None, &["a.txt"], &script),
        temp.node(2, None, &["a.txt"], &script),
        temp.node(3, None, &["a.txt"], &script),
    ]);

    temp.pex().args(&["1"]).passes();

    let spans = std::fs::read_to_string(&log).unwrap();
    let spans: Vec<&str> = spans.lines().collect();
    assert_eq!(spans, vec!["start", "end", "start", "end", "start", "end"]);
}

#[test]
fn node_log_records_activity() {
    let temp = Project::empty();
    let script = temp.recording_script("echo processed ${input_name}");
    temp.nodes(vec![temp.node(1, None, &["a.txt"], &script)]);

    temp.pex().passes();

    let log = std::fs::read_to_string(temp.state_path().join("logs/node/1.log")).unwrap();
    assert!(log.contains("[stdout] processed a.txt"), "{log}");
    assert!(log.contains("finished (1 files)"), "{log}");
}

#[test]
fn stalled_file_is_restarted_and_resumed() {
    let temp = Project::empty();
    let sentinel = temp.path().join("stalled-once");
    let script = temp.recording_script(&format!(
        "if [ ! -e '{0}' ] && [ ${{input_name}} = a.txt ]; then touch '{0}'; exec sleep 5; fi",
        sentinel.display()
    ));
    temp.nodes(vec![temp.node(1, None, &["a.txt", "b.txt"], &script)]);

    temp.pex()
        .env("PEX_GRACE_SECS", "1")
        .env("PEX_FALLBACK_DEADLINE_SECS", "1")
        .passes()
        .stdout_has("1 finished (0 failed)");

    assert_eq!(temp.launched(), vec!["1:a.txt", "1:a.txt", "1:b.txt"]);
    let log = std::fs::read_to_string(temp.state_path().join("logs/node/1.log")).unwrap();
    assert!(log.contains("restarted after stall"), "{log}");
}
