// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess launch and in-flight pid bookkeeping.

use crate::drain::{spawn_drain, StreamKind};
use crate::error::SubprocessError;
use crate::node_log::NodeLogger;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use parking_lot::Mutex;
use pex_core::NodeId;
use std::collections::HashMap;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::Command;

/// How long to wait for output to reach EOF once the subprocess has exited.
const DRAIN_GRACE: Duration = Duration::from_millis(200);

/// Pids of subprocesses that are still running, keyed to their node.
#[derive(Debug, Default)]
pub struct ProcessTable {
    pids: Mutex<HashMap<u32, NodeId>>,
}

impl ProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, pid: u32, node: NodeId) {
        self.pids.lock().insert(pid, node);
    }

    pub fn release(&self, pid: u32) {
        self.pids.lock().remove(&pid);
    }

    /// Snapshot of tracked pids, sorted.
    pub fn tracked(&self) -> Vec<(u32, NodeId)> {
        let mut pids: Vec<_> = self.pids.lock().iter().map(|(p, n)| (*p, *n)).collect();
        pids.sort_unstable();
        pids
    }

    pub fn len(&self) -> usize {
        self.pids.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Send SIGTERM to every tracked pid and forget them.
    ///
    /// Returns how many signals were delivered.
    pub fn terminate_all(&self) -> usize {
        let pids: Vec<(u32, NodeId)> = self.pids.lock().drain().collect();
        let mut delivered = 0;
        for (pid, node) in pids {
            let Ok(raw) = i32::try_from(pid) else {
                continue;
            };
            match kill(Pid::from_raw(raw), Signal::SIGTERM) {
                Ok(()) => {
                    tracing::info!(pid, %node, "sent SIGTERM to subprocess");
                    delivered += 1;
                }
                Err(e) => tracing::debug!(pid, %node, error = %e, "subprocess already gone"),
            }
        }
        delivered
    }
}

/// A finished subprocess.
#[derive(Debug, Clone, Copy)]
pub struct ScriptExit {
    /// `None` when the OS handle exposed no pid
    pub pid: Option<u32>,
    pub status: ExitStatus,
}

/// Run `script` as `<shell> -c <script>` and wait for it to exit.
///
/// Both output streams are drained for the subprocess's whole lifetime.
/// After exit the drains get [`DRAIN_GRACE`] to reach EOF; a stream still
/// held open by a background child is left draining on its own task.
/// The exit code is returned but never treated as a failure; only spawn
/// and wait errors are.
pub async fn run_script(
    shell: &str,
    script: &str,
    node: NodeId,
    processes: &ProcessTable,
    log: Option<&NodeLogger>,
) -> Result<ScriptExit, SubprocessError> {
    let mut cmd = Command::new(shell);
    cmd.arg("-c")
        .arg(script)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(false);

    let mut child = cmd
        .spawn()
        .map_err(|source| SubprocessError::Spawn { shell: shell.to_string(), source })?;

    let pid = child.id();
    match pid {
        Some(pid) => {
            tracing::debug!(%node, pid, "spawned subprocess");
            processes.register(pid, node);
        }
        None => tracing::warn!(%node, "no pid for spawned subprocess, it will not be tracked"),
    }

    let drains: Vec<_> = [
        child.stdout.take().map(|r| spawn_drain(r, StreamKind::Stdout, node, log.cloned())),
        child.stderr.take().map(|r| spawn_drain(r, StreamKind::Stderr, node, log.cloned())),
    ]
    .into_iter()
    .flatten()
    .collect();

    let status = child.wait().await;
    if let Some(pid) = pid {
        processes.release(pid);
    }
    let deadline = tokio::time::Instant::now() + DRAIN_GRACE;
    for drain in drains {
        match tokio::time::timeout_at(deadline, drain).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::warn!(%node, error = %e, "stream drain task failed"),
            Err(_) => tracing::debug!(%node, "output still open after exit, draining in background"),
        }
    }

    let status = status.map_err(|source| SubprocessError::Wait { pid, source })?;
    tracing::debug!(%node, pid = ?pid, code = ?status.code(), "subprocess exited");
    Ok(ScriptExit { pid, status })
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
