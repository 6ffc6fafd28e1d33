// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed record store.
//!
//! The whole table lives in one JSON document. Every mutation re-reads the
//! file, applies the change and atomically replaces the file (write and
//! fsync a temp sibling, rename it, fsync the directory), so a crash leaves
//! either the old or the new table on disk and external edits between runs
//! are picked up.

use crate::store::{order_parent_first, RecordStore, StoreError};
use parking_lot::Mutex;
use pex_core::{Clock, NodeId, NodeRecord, NodeState, SystemClock};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// On-disk layout of the record file.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct NodeTable {
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
}

pub struct JsonStore<C: Clock = SystemClock> {
    path: PathBuf,
    clock: C,
    // Serializes read-modify-write cycles between job tasks
    lock: Mutex<()>,
}

impl JsonStore<SystemClock> {
    /// Open an existing record file.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Self::open_with_clock(path, SystemClock)
    }
}

impl<C: Clock> JsonStore<C> {
    pub fn open_with_clock(path: impl Into<PathBuf>, clock: C) -> Result<Self, StoreError> {
        let store = Self { path: path.into(), clock, lock: Mutex::new(()) };
        // Fail early on a missing or unreadable table
        store.load()?;
        Ok(store)
    }

    /// Create a record file holding `nodes`, replacing any existing one.
    pub fn create(
        path: impl Into<PathBuf>,
        nodes: Vec<NodeRecord>,
        clock: C,
    ) -> Result<Self, StoreError> {
        let store = Self { path: path.into(), clock, lock: Mutex::new(()) };
        store.save(&NodeTable { nodes })?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<NodeTable, StoreError> {
        let bytes = std::fs::read(&self.path)
            .map_err(|source| StoreError::Io { path: self.path.clone(), source })?;
        serde_json::from_slice(&bytes)
            .map_err(|source| StoreError::Malformed { path: self.path.clone(), source })
    }

    fn save(&self, table: &NodeTable) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io { path: self.path.clone(), source };
        let tmp_path = self.path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(table)
            .map_err(|source| StoreError::Malformed { path: self.path.clone(), source })?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(io_err)?;
        write_synced(&tmp_path, &json).map_err(io_err)?;
        std::fs::rename(&tmp_path, &self.path).map_err(io_err)?;
        File::open(dir).and_then(|d| d.sync_all()).map_err(io_err)
    }

    /// Apply `f` to the table under the store lock and persist the result.
    fn update<T>(
        &self,
        f: impl FnOnce(&mut NodeTable, u64) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let _guard = self.lock.lock();
        let mut table = self.load()?;
        let out = f(&mut table, self.clock.epoch_ms())?;
        self.save(&table)?;
        Ok(out)
    }
}

fn find(table: &mut NodeTable, id: NodeId) -> Result<&mut NodeRecord, StoreError> {
    table.nodes.iter_mut().find(|n| n.id == id).ok_or(StoreError::NotFound(id))
}

impl<C: Clock> RecordStore for JsonStore<C> {
    fn eligible_nodes(&self) -> Result<Vec<NodeRecord>, StoreError> {
        let table = {
            let _guard = self.lock.lock();
            self.load()?
        };
        let eligible = table.nodes.into_iter().filter(NodeRecord::is_eligible).collect();
        Ok(order_parent_first(eligible))
    }

    fn all_nodes(&self) -> Result<Vec<NodeRecord>, StoreError> {
        let _guard = self.lock.lock();
        Ok(self.load()?.nodes)
    }

    fn mark_running(&self, id: NodeId) -> Result<(), StoreError> {
        self.update(|table, now_ms| {
            let node = find(table, id)?;
            node.state = NodeState::Running;
            node.started_at_ms = Some(now_ms);
            node.finished_at_ms = None;
            Ok(())
        })
    }

    fn mark_finished(&self, id: NodeId, error: Option<&str>) -> Result<(), StoreError> {
        self.update(|table, now_ms| {
            let node = find(table, id)?;
            node.state = NodeState::Finished;
            node.finished_at_ms = Some(now_ms);
            node.error = error.filter(|e| !e.is_empty()).map(str::to_string);
            Ok(())
        })
    }

    fn revert_running(&self) -> Result<usize, StoreError> {
        let reverted = self.update(|table, _| {
            let mut reverted = 0;
            for node in table.nodes.iter_mut().filter(|n| n.state == NodeState::Running) {
                node.state = NodeState::Waiting;
                node.started_at_ms = None;
                reverted += 1;
            }
            Ok(reverted)
        })?;
        tracing::debug!(path = %self.path.display(), reverted, "reverted running nodes");
        Ok(reverted)
    }
}

/// Write `bytes` to `path`, truncating it, and flush them to disk.
fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

#[cfg(test)]
#[path = "json_tests.rs"]
mod tests;
