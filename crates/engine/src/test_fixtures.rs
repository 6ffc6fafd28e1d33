// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Temp-dir node layouts and shell scripts shared by the engine tests.

use crate::config::{MonitorConfig, SchedulerConfig, SelfMonitorConfig};
use crate::scheduler::Scheduler;
use pex_core::test_support::record;
use pex_core::{Clock, NodeRecord};
use pex_storage::{MemoryStore, RecordStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self { dir: tempfile::tempdir().unwrap() }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn marker(&self) -> PathBuf {
        self.root().join("running")
    }

    pub fn logs(&self) -> PathBuf {
        self.root().join("logs")
    }

    fn launches(&self) -> PathBuf {
        self.root().join("launches.log")
    }

    /// Script that records `<node>:<file>` for every launch, then runs `then`.
    pub fn recording_script(&self, then: &str) -> String {
        format!("echo ${{node_id}}:${{input_name}} >> '{}'\n{}\n", self.launches().display(), then)
    }

    /// Node `id` with one input file per name under `in/<id>/`.
    pub fn node(&self, id: u64, parent: Option<u64>, files: &[&str], script: &str) -> NodeRecord {
        let input_dir = self.root().join("in").join(id.to_string());
        std::fs::create_dir_all(&input_dir).unwrap();
        for name in files {
            std::fs::write(input_dir.join(name), format!("data {name}\n")).unwrap();
        }
        let scripts = self.root().join("scripts");
        std::fs::create_dir_all(&scripts).unwrap();
        let script_path = scripts.join(format!("{id}.sh"));
        std::fs::write(&script_path, script).unwrap();

        let mut rec = record(id, parent);
        rec.script = script_path;
        rec.input_dir = input_dir;
        rec.output_dir = self.root().join("out").join(id.to_string());
        rec
    }

    /// Launches recorded by [`Workspace::recording_script`], in order.
    pub fn launched(&self) -> Vec<String> {
        std::fs::read_to_string(self.launches())
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn config(&self) -> SchedulerConfig {
        SchedulerConfig::new(self.marker())
            .logs_dir(self.logs())
            .monitor(MonitorConfig::default().poll_interval(Duration::from_millis(20)))
            .self_monitor(SelfMonitorConfig::default().poll_interval(Duration::from_millis(20)))
    }
}

pub fn memory_store(nodes: Vec<NodeRecord>) -> (Arc<MemoryStore>, Arc<dyn RecordStore>) {
    let store = Arc::new(MemoryStore::new(nodes));
    let dyn_store: Arc<dyn RecordStore> = store.clone();
    (store, dyn_store)
}

pub async fn wait_finished<C: Clock>(scheduler: &Scheduler<C>) {
    tokio::time::timeout(Duration::from_secs(20), scheduler.finished())
        .await
        .expect("scheduler did not finish in time");
}

/// Poll `cond` every 10ms for up to 10s.
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}
