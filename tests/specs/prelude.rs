// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for pex specs.

use assert_cmd::Command;
pub use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Upper bound for polling waits in specs.
pub const SPEC_WAIT_MAX_MS: u64 = 10_000;

/// Build a `pex` invocation with no state directory configured.
pub fn cli() -> CliBuilder {
    CliBuilder::new()
}

pub struct CliBuilder {
    cmd: std::process::Command,
}

impl CliBuilder {
    fn new() -> Self {
        let mut cmd = std::process::Command::new(assert_cmd::cargo::cargo_bin("pex"));
        for key in ["PEX_STATE_DIR", "PEX_STORE", "PEX_LOG", "PEX_KILL_ON_STOP"] {
            cmd.env_remove(key);
        }
        Self { cmd }
    }

    fn output(self) -> std::process::Output {
        let mut cmd = Command::from_std(self.cmd);
        cmd.timeout(Duration::from_secs(30));
        cmd.output().expect("run pex")
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    pub fn env(mut self, key: &str, value: impl AsRef<std::ffi::OsStr>) -> Self {
        self.cmd.env(key, value);
        self
    }

    /// Run and assert success.
    pub fn passes(self) -> RunAssert {
        let output = self.output();
        let run = RunAssert { output };
        assert!(
            run.output.status.success(),
            "expected success, got {:?}\nstdout:\n{}\nstderr:\n{}",
            run.output.status.code(),
            run.stdout(),
            run.stderr()
        );
        run
    }

    /// Run and assert failure.
    pub fn fails(self) -> RunAssert {
        let output = self.output();
        let run = RunAssert { output };
        assert!(
            !run.output.status.success(),
            "expected failure\nstdout:\n{}\nstderr:\n{}",
            run.stdout(),
            run.stderr()
        );
        run
    }

    /// Start without waiting, for specs that interact with a live scheduler.
    pub fn spawn(mut self) -> std::process::Child {
        self.cmd.stdout(std::process::Stdio::null()).stderr(std::process::Stdio::null());
        self.cmd.spawn().expect("spawn pex")
    }
}

pub struct RunAssert {
    output: std::process::Output,
}

impl RunAssert {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn code(&self) -> Option<i32> {
        self.output.status.code()
    }

    pub fn stdout_has(self, needle: &str) -> Self {
        let out = self.stdout();
        assert!(out.contains(needle), "stdout missing {needle:?}:\n{out}");
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        let err = self.stderr();
        assert!(err.contains(needle), "stderr missing {needle:?}:\n{err}");
        self
    }
}

/// A temp project: node directories, scripts and a state directory.
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn empty() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("state")).expect("state dir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn state_path(&self) -> PathBuf {
        self.path().join("state")
    }

    pub fn marker_path(&self) -> PathBuf {
        self.state_path().join("running")
    }

    /// Write `content` to a project-relative path, creating parents.
    pub fn file(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("parent dir");
        }
        std::fs::write(&path, content).expect("write file");
        path
    }

    /// A node JSON row with conventional directories under the project.
    ///
    /// Inputs live in `in/<id>`, outputs in `out/<id>` and the script at
    /// `scripts/<id>.sh`.
    pub fn node(&self, id: u64, parent: Option<u64>, files: &[&str], script: &str) -> Value {
        for name in files {
            self.file(&format!("in/{id}/{name}"), &format!("data {name}\n"));
        }
        std::fs::create_dir_all(self.path().join(format!("in/{id}"))).expect("input dir");
        let script_path = self.file(&format!("scripts/{id}.sh"), script);
        json!({
            "id": id,
            "parent_id": parent,
            "state": "WAITING",
            "script": script_path,
            "input_dir": self.path().join(format!("in/{id}")),
            "input_ext": "txt",
            "output_dir": self.path().join(format!("out/{id}")),
        })
    }

    /// Write the record file.
    pub fn nodes(&self, nodes: Vec<Value>) {
        let table = json!({ "nodes": nodes });
        let body = serde_json::to_string_pretty(&table).expect("serialize table");
        std::fs::write(self.state_path().join("nodes.json"), body).expect("write nodes");
    }

    /// The record file as written by the last run.
    pub fn node_table(&self) -> Vec<Value> {
        let body = std::fs::read_to_string(self.state_path().join("nodes.json")).expect("read nodes");
        let table: Value = serde_json::from_str(&body).expect("parse nodes");
        table["nodes"].as_array().cloned().unwrap_or_default()
    }

    pub fn node_state(&self, id: u64) -> String {
        self.node_table()
            .iter()
            .find(|n| n["id"] == id)
            .and_then(|n| n["state"].as_str())
            .unwrap_or_default()
            .to_string()
    }

    /// Script that records each launch as `<node>:<file>` in `launches.log`.
    pub fn recording_script(&self, then: &str) -> String {
        format!(
            "echo ${{node_id}}:${{input_name}} >> '{}'\n{then}\n",
            self.path().join("launches.log").display()
        )
    }

    pub fn launched(&self) -> Vec<String> {
        std::fs::read_to_string(self.path().join("launches.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// A `pex` invocation bound to this project's state directory.
    pub fn pex(&self) -> CliBuilder {
        cli().env("PEX_STATE_DIR", self.state_path()).env("PEX_POLL_MS", "50")
    }
}

/// Poll `cond` until it holds or `max_ms` elapses.
pub fn wait_for(max_ms: u64, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_millis(max_ms);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    cond()
}
