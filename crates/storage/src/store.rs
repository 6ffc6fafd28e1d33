// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The record store contract the scheduler persists node state through.

use pex_core::{NodeId, NodeRecord};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by record store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access record file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("record file {path} is malformed: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("node {0} does not exist in the record store")]
    NotFound(NodeId),

    #[error("record store unavailable: {0}")]
    Unavailable(String),
}

/// Durable table of node records.
///
/// Implementations must be safe to call from any job task. Callers treat
/// every failure except the initial [`RecordStore::eligible_nodes`] fetch
/// as non-fatal.
pub trait RecordStore: Send + Sync {
    /// Nodes a new run should pick up (WAITING, or FINISHED with an error),
    /// ordered so that a parent precedes every record referencing it.
    fn eligible_nodes(&self) -> Result<Vec<NodeRecord>, StoreError>;

    /// Every record, in storage order.
    fn all_nodes(&self) -> Result<Vec<NodeRecord>, StoreError>;

    /// Mark a node RUNNING and stamp its start time.
    fn mark_running(&self, id: NodeId) -> Result<(), StoreError>;

    /// Mark a node FINISHED with its terminal error (`None` on success).
    fn mark_finished(&self, id: NodeId, error: Option<&str>) -> Result<(), StoreError>;

    /// Revert every RUNNING row to WAITING, returning how many changed.
    fn revert_running(&self) -> Result<usize, StoreError>;
}

/// Reorder `records` so every parent precedes its children.
///
/// Records whose parent is absent from the set keep their relative order
/// and are emitted as soon as they are reached; subtrees follow their
/// parent depth-first. Records caught in a reference cycle are appended
/// last in their original order.
pub fn order_parent_first(records: Vec<NodeRecord>) -> Vec<NodeRecord> {
    let ids: HashSet<NodeId> = records.iter().map(|r| r.id).collect();
    let mut children: HashMap<NodeId, Vec<usize>> = HashMap::new();
    let mut starts = Vec::new();
    for (idx, record) in records.iter().enumerate() {
        match record.parent() {
            Some(parent) if ids.contains(&parent) && parent != record.id => {
                children.entry(parent).or_default().push(idx);
            }
            _ => starts.push(idx),
        }
    }

    let mut order = Vec::with_capacity(records.len());
    let mut emitted = vec![false; records.len()];
    for start in starts {
        let mut stack = vec![start];
        while let Some(idx) = stack.pop() {
            if emitted[idx] {
                continue;
            }
            emitted[idx] = true;
            order.push(idx);
            if let Some(kids) = children.get(&records[idx].id) {
                stack.extend(kids.iter().rev().copied());
            }
        }
    }
    order.extend((0..records.len()).filter(|idx| !emitted[*idx]));

    let mut slots: Vec<Option<NodeRecord>> = records.into_iter().map(Some).collect();
    order.into_iter().filter_map(|idx| slots[idx].take()).collect()
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
