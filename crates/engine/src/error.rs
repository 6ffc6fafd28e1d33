// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the execution engine

use pex_core::NodeId;
use pex_storage::StoreError;
use std::path::PathBuf;
use thiserror::Error;

/// Raised while assembling the in-memory node tree.
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("duplicate node id {0} in loaded records")]
    DuplicateKey(NodeId),
}

/// Problems with a node's script or directories.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("cannot read script {path}: {source}")]
    Missing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot list input directory {path}: {source}")]
    InputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot prepare output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("refusing to substitute unsafe path {0:?} into script")]
    UnsafePath(PathBuf),
}

/// Failures at the process boundary.
#[derive(Debug, Error)]
pub enum SubprocessError {
    #[error("failed to spawn `{shell}`: {source}")]
    Spawn {
        shell: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed waiting for subprocess {pid:?}: {source}")]
    Wait {
        pid: Option<u32>,
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of a job run that did not complete normally.
#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error(transparent)]
    Subprocess(#[from] SubprocessError),

    /// Cooperative stop requested by the watchdog or scheduler; not a failure.
    #[error("job interrupted")]
    Interrupted,
}

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("no file rates recorded for node {0}")]
    NotRegistered(NodeId),
}

/// Fatal scheduler startup conditions.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("liveness marker {0} already exists: is another scheduler running?")]
    AlreadyRunning(PathBuf),

    #[error("liveness marker {path}: {source}")]
    Marker {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to load node records: {0}")]
    Load(#[from] StoreError),

    #[error("failed to build node tree: {0}")]
    Tree(#[from] TreeError),
}
