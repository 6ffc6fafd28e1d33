// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stall detection with adaptive, learned deadlines.
//!
//! A [`Watchdog`] tracks the file a job is currently processing. When the
//! target changes it records the previous file's rate (seconds per KiB) and
//! derives the next deadline from the node's average rate. [`watch`] polls
//! the job's output directory and fires a restart when the job has made no
//! visible progress for longer than both the grace period and the deadline.

use crate::config::MonitorConfig;
use crate::dir_snapshot::DirectorySnapshot;
use crate::job::Job;
use crate::stats::Statistics;
use parking_lot::Mutex;
use pex_core::{Clock, NodeId, SystemClock};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Outcome of one watchdog check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Output directory changed since the last poll
    Progress,
    /// No change, but still within grace and deadline
    Healthy,
    /// Over time; the job should be replaced
    Stalled,
    /// Over time, but the node has used up its restarts
    Exhausted,
}

/// Why a [`watch`] loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// The job finished or was replaced
    Stopped,
    Restarted,
    Exhausted,
}

#[derive(Debug)]
struct WatchState {
    target: Option<PathBuf>,
    size_kib: f64,
    started: Instant,
    deadline: Duration,
}

/// Per-job deadline bookkeeping.
#[derive(Debug)]
pub struct Watchdog<C: Clock = SystemClock> {
    node: NodeId,
    config: MonitorConfig,
    stats: Arc<Statistics>,
    clock: C,
    state: Mutex<WatchState>,
}

impl<C: Clock> Watchdog<C> {
    pub fn new(node: NodeId, config: MonitorConfig, stats: Arc<Statistics>, clock: C) -> Self {
        let state = WatchState {
            target: None,
            size_kib: 0.0,
            started: clock.now(),
            deadline: config.fallback_deadline,
        };
        Self { node, config, stats, clock, state: Mutex::new(state) }
    }

    /// Switch to a new input file of `size_bytes` bytes.
    ///
    /// Records the previous file's rate, resets the timer and returns the
    /// deadline for the new file.
    pub fn retarget(&self, file: &Path, size_bytes: u64) -> Duration {
        let now = self.clock.now();
        let mut state = self.state.lock();
        self.record_rate(&state, now);

        let size_kib = size_bytes as f64 / 1024.0;
        if size_kib == 0.0 {
            tracing::warn!(node = %self.node, file = %file.display(), "input file is empty");
        }
        let deadline = self.deadline_for(size_kib);
        tracing::debug!(
            node = %self.node,
            file = %file.display(),
            size_kib,
            deadline_secs = deadline.as_secs_f64(),
            "watching new file"
        );

        *state = WatchState { target: Some(file.to_path_buf()), size_kib, started: now, deadline };
        deadline
    }

    /// Record the rate of the file in flight; called once the batch completes.
    pub fn finish(&self) {
        let now = self.clock.now();
        let mut state = self.state.lock();
        self.record_rate(&state, now);
        state.target = None;
    }

    pub fn deadline(&self) -> Duration {
        self.state.lock().deadline
    }

    pub fn target(&self) -> Option<PathBuf> {
        self.state.lock().target.clone()
    }

    /// Decide what to do after a poll.
    ///
    /// `attempts` is the number of restarts this node has already had.
    pub fn assess(&self, progressed: bool, attempts: u32) -> Verdict {
        if progressed {
            return Verdict::Progress;
        }
        let state = self.state.lock();
        let elapsed = self.clock.since(state.started);
        if elapsed < self.config.grace || elapsed <= state.deadline {
            return Verdict::Healthy;
        }
        if attempts >= self.config.max_restarts {
            Verdict::Exhausted
        } else {
            Verdict::Stalled
        }
    }

    fn deadline_for(&self, size_kib: f64) -> Duration {
        if size_kib <= 0.0 {
            return self.config.fallback_deadline;
        }
        match self.stats.average_rate(self.node) {
            Ok(rate) => {
                let secs = rate * self.config.rate_multiplier * size_kib;
                Duration::try_from_secs_f64(secs).unwrap_or(self.config.fallback_deadline)
            }
            Err(_) => self.config.fallback_deadline,
        }
    }

    fn record_rate(&self, state: &WatchState, now: Instant) {
        if state.target.is_none() || state.size_kib <= 0.0 {
            return;
        }
        let elapsed = now.saturating_duration_since(state.started).as_secs_f64();
        let rate = elapsed / state.size_kib;
        tracing::debug!(node = %self.node, rate, elapsed, size_kib = state.size_kib, "recording file rate");
        self.stats.add_rate(self.node, rate);
    }
}

/// Poll `job`'s output directory until the job ends or stalls.
///
/// On a stall `on_stall` is invoked once and the loop exits; the
/// replacement instance gets its own watchdog.
pub async fn watch<C, F>(
    job: Arc<Job>,
    watchdog: Arc<Watchdog<C>>,
    poll_interval: Duration,
    on_stall: F,
) -> WatchOutcome
where
    C: Clock,
    F: FnOnce(),
{
    let mut snapshot = DirectorySnapshot::new(&job.node().record.output_dir);
    let done = job.done_token();

    loop {
        tokio::select! {
            _ = done.cancelled() => return WatchOutcome::Stopped,
            _ = tokio::time::sleep(poll_interval) => {}
        }
        if job.is_interrupted() {
            return WatchOutcome::Stopped;
        }

        let progressed = snapshot.refresh();
        match watchdog.assess(progressed, job.attempts()) {
            Verdict::Progress | Verdict::Healthy => {}
            Verdict::Stalled => {
                tracing::info!(
                    node = %job.id(),
                    attempt = job.attempts() + 1,
                    file = ?watchdog.target(),
                    "job is stalled, restarting"
                );
                on_stall();
                return WatchOutcome::Restarted;
            }
            Verdict::Exhausted => {
                tracing::warn!(
                    node = %job.id(),
                    restarts = job.attempts(),
                    "job is stalled but has used all restarts, letting it run"
                );
                return WatchOutcome::Exhausted;
            }
        }
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
