// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted node definitions and their lifecycle state.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

crate::define_id! {
    /// Identifier of a node in the execution tree.
    ///
    /// Assigned by the record store. The value `0` is reserved to mean
    /// "no parent" in persisted records.
    pub struct NodeId;
}

/// Persisted lifecycle state of a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeState {
    /// Not started yet, or reverted after an interrupted run
    #[default]
    Waiting,
    /// Admitted by a scheduler
    Running,
    /// Ran to completion; `error` tells whether it succeeded
    Finished,
}

crate::simple_display! {
    NodeState {
        Waiting => "WAITING",
        Running => "RUNNING",
        Finished => "FINISHED",
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown node state `{0}` (expected WAITING, RUNNING or FINISHED)")]
pub struct ParseNodeStateError(String);

impl FromStr for NodeState {
    type Err = ParseNodeStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "WAITING" => Ok(NodeState::Waiting),
            "RUNNING" => Ok(NodeState::Running),
            "FINISHED" => Ok(NodeState::Finished),
            _ => Err(ParseNodeStateError(s.to_string())),
        }
    }
}

/// One row of the record store: a node definition plus its last outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    /// Parent node; `None` or `0` marks a declared root
    #[serde(default)]
    pub parent_id: Option<NodeId>,
    #[serde(default)]
    pub state: NodeState,
    /// Script template rendered once per input file
    pub script: PathBuf,
    pub input_dir: PathBuf,
    /// Extension filter for input files, without the leading dot
    #[serde(default)]
    pub input_ext: String,
    pub output_dir: PathBuf,
    /// Terminal error of the last run, if it failed
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at_ms: Option<u64>,
}

impl NodeRecord {
    /// Parent reference with the `0` sentinel normalized away.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent_id.filter(|p| p.get() != 0)
    }

    pub fn has_error(&self) -> bool {
        self.error.as_deref().is_some_and(|e| !e.is_empty())
    }

    /// Whether a new run should pick this node up: never started, or
    /// finished with an error and therefore retryable.
    pub fn is_eligible(&self) -> bool {
        match self.state {
            NodeState::Waiting => true,
            NodeState::Finished => self.has_error(),
            NodeState::Running => false,
        }
    }

    /// Whether `file_name` passes this node's input extension filter.
    ///
    /// An empty filter accepts every file.
    pub fn accepts_input(&self, file_name: &str) -> bool {
        let ext = self.input_ext.trim_start_matches('.');
        if ext.is_empty() {
            return true;
        }
        file_name
            .strip_suffix(ext)
            .is_some_and(|stem| stem.ends_with('.'))
    }
}

crate::builder! {
    pub struct NodeRecordBuilder => NodeRecord {
        into {
            id: NodeId = NodeId::new(1),
            script: PathBuf = "/tmp/pex/script.sh",
            input_dir: PathBuf = "/tmp/pex/in",
            input_ext: String = "txt",
            output_dir: PathBuf = "/tmp/pex/out",
        }
        set {
            state: NodeState = NodeState::Waiting,
        }
        option {
            parent_id: NodeId = None,
            error: String = None,
            started_at_ms: u64 = None,
            finished_at_ms: u64 = None,
        }
    }
}

#[cfg(test)]
#[path = "node_tests.rs"]
mod tests;
