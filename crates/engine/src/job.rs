// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime job instances wrapping one tree node.

use crate::tree::Node;
use parking_lot::Mutex;
use pex_core::NodeId;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// Execution state carried from one instance of a node to its replacement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobProgress {
    /// Input files already processed
    pub cursor: usize,
    /// Stall restarts so far
    pub attempts: u32,
    pub error: Option<String>,
}

/// One runtime execution of a node.
///
/// A stall restart never revives an instance: [`Job::successor`] builds a
/// fresh one from the same progress and the old one is interrupted.
#[derive(Debug)]
pub struct Job {
    node: Arc<Node>,
    instance: u64,
    generation: u64,
    progress: Mutex<JobProgress>,
    last_pid: Mutex<Option<u32>>,
    running: AtomicBool,
    cancel: CancellationToken,
    done: CancellationToken,
}

impl Job {
    pub fn new(node: Arc<Node>, generation: u64) -> Self {
        Self::with_progress(node, generation, JobProgress::default())
    }

    pub fn with_progress(node: Arc<Node>, generation: u64, progress: JobProgress) -> Self {
        Self {
            node,
            instance: NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed),
            generation,
            progress: Mutex::new(progress),
            last_pid: Mutex::new(None),
            running: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            done: CancellationToken::new(),
        }
    }

    /// Fresh instance for a stall restart: same node, cursor and error,
    /// one more attempt.
    pub fn successor(&self) -> Self {
        let mut progress = self.progress();
        progress.attempts += 1;
        Self::with_progress(Arc::clone(&self.node), self.generation, progress)
    }

    pub fn node(&self) -> &Arc<Node> {
        &self.node
    }

    pub fn id(&self) -> NodeId {
        self.node.id()
    }

    /// Process-unique id of this instance.
    pub fn instance(&self) -> u64 {
        self.instance
    }

    /// Scheduler generation this instance was admitted under.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn progress(&self) -> JobProgress {
        self.progress.lock().clone()
    }

    pub fn cursor(&self) -> usize {
        self.progress.lock().cursor
    }

    pub fn attempts(&self) -> u32 {
        self.progress.lock().attempts
    }

    pub fn error(&self) -> Option<String> {
        self.progress.lock().error.clone()
    }

    /// Record one more processed file, returning the new cursor.
    pub fn advance(&self) -> usize {
        let mut progress = self.progress.lock();
        progress.cursor += 1;
        progress.cursor
    }

    pub fn set_error(&self, error: impl Into<String>) {
        self.progress.lock().error = Some(error.into());
    }

    pub fn clear_error(&self) {
        self.progress.lock().error = None;
    }

    pub fn set_last_pid(&self, pid: Option<u32>) {
        *self.last_pid.lock() = pid;
    }

    pub fn last_pid(&self) -> Option<u32> {
        *self.last_pid.lock()
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Ask the executor to stop before its next file.
    pub fn interrupt(&self) {
        self.cancel.cancel();
    }

    pub fn is_interrupted(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Mark the executor loop as ended; stops the watchdog.
    pub fn mark_done(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.done.cancel();
    }

    pub fn is_done(&self) -> bool {
        self.done.is_cancelled()
    }

    /// Token cancelled by [`Job::mark_done`].
    pub fn done_token(&self) -> CancellationToken {
        self.done.clone()
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
