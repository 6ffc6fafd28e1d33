// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State directory layout and scheduler configuration for one invocation.

use crate::env;
use pex_engine::SchedulerConfig;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not determine state directory: set PEX_STATE_DIR or HOME")]
    NoStateDir,
}

/// Files a pex invocation reads and writes
#[derive(Debug, Clone)]
pub struct Paths {
    /// Root state directory (e.g. ~/.local/state/pex)
    pub state_dir: PathBuf,
    /// Liveness marker; present while a scheduler is alive
    pub marker_path: PathBuf,
    /// Record file holding the node table
    pub store_path: PathBuf,
    /// Daemon log and per-node logs
    pub logs_path: PathBuf,
}

impl Paths {
    /// Resolve paths, preferring command-line overrides over the environment.
    pub fn resolve(
        state_dir: Option<PathBuf>,
        store: Option<PathBuf>,
    ) -> Result<Self, LifecycleError> {
        let state_dir = match state_dir {
            Some(dir) => dir,
            None => env::state_dir()?,
        };
        let store_path = store.or_else(env::store_path);
        Ok(Self::under(state_dir, store_path))
    }

    pub fn under(state_dir: PathBuf, store_path: Option<PathBuf>) -> Self {
        Self {
            marker_path: state_dir.join("running"),
            store_path: store_path.unwrap_or_else(|| state_dir.join("nodes.json")),
            logs_path: state_dir.join("logs"),
            state_dir,
        }
    }
}

/// Build the scheduler configuration from paths, flags and env overrides.
pub fn scheduler_config(paths: &Paths, max_concurrent: usize, kill_on_stop: bool) -> SchedulerConfig {
    let mut config = SchedulerConfig::new(&paths.marker_path)
        .max_concurrent(max_concurrent)
        .kill_on_stop(kill_on_stop || env::kill_on_stop())
        .logs_dir(&paths.logs_path);

    if let Some(poll) = env::poll_interval() {
        config.monitor.poll_interval = poll;
        config.self_monitor.poll_interval = poll;
    }
    if let Some(grace) = env::grace() {
        config.monitor.grace = grace;
    }
    if let Some(fallback) = env::fallback_deadline() {
        config.monitor.fallback_deadline = fallback;
    }
    if let Some(stale) = env::stale_after() {
        config.self_monitor.stale_after = stale;
    }
    if let Some(max) = env::max_restarts() {
        config.monitor.max_restarts = max;
        config.self_monitor.max_restarts = max;
    }
    config
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
