// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler, watchdog and self-monitor tunables.

use std::path::PathBuf;
use std::time::Duration;

/// Stall-detection settings applied to every job's watchdog.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// How often the output directory is snapshotted
    pub poll_interval: Duration,
    /// No restart is issued before a file has run this long
    pub grace: Duration,
    /// Deadline used when a node has no recorded history
    pub fallback_deadline: Duration,
    /// Safety factor applied once to the average seconds-per-KiB rate
    pub rate_multiplier: f64,
    /// Restarts allowed per node before the watchdog gives up
    pub max_restarts: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            grace: Duration::from_secs(30),
            fallback_deadline: Duration::from_secs(60 * 60),
            rate_multiplier: 3.0,
            max_restarts: 3,
        }
    }
}

impl MonitorConfig {
    pex_core::setters! {
        set {
            poll_interval: Duration,
            grace: Duration,
            fallback_deadline: Duration,
            rate_multiplier: f64,
            max_restarts: u32,
        }
    }
}

/// Settings for the scheduler's own liveness and staleness watch.
#[derive(Debug, Clone)]
pub struct SelfMonitorConfig {
    pub poll_interval: Duration,
    /// Full restart after this long without lifecycle activity; zero disables
    pub stale_after: Duration,
    /// Full restarts allowed before stopping for good
    pub max_restarts: u32,
}

impl Default for SelfMonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            stale_after: Duration::from_secs(2 * 60 * 60),
            max_restarts: 3,
        }
    }
}

impl SelfMonitorConfig {
    pex_core::setters! {
        set {
            poll_interval: Duration,
            stale_after: Duration,
            max_restarts: u32,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Concurrent node cap; 0 means unlimited
    pub max_concurrent: usize,
    /// Existence of this file means "scheduler alive"
    pub marker_path: PathBuf,
    /// Per-node activity logs are written here when set
    pub logs_dir: Option<PathBuf>,
    /// Interpreter used to run rendered scripts (`<shell> -c <script>`)
    pub shell: String,
    /// SIGTERM tracked subprocesses on stop
    pub kill_on_stop: bool,
    pub monitor: MonitorConfig,
    pub self_monitor: SelfMonitorConfig,
}

impl SchedulerConfig {
    pub fn new(marker_path: impl Into<PathBuf>) -> Self {
        Self {
            max_concurrent: 0,
            marker_path: marker_path.into(),
            logs_dir: None,
            shell: "sh".to_string(),
            kill_on_stop: false,
            monitor: MonitorConfig::default(),
            self_monitor: SelfMonitorConfig::default(),
        }
    }

    pex_core::setters! {
        into { shell: String }
        set {
            max_concurrent: usize,
            kill_on_stop: bool,
            monitor: MonitorConfig,
            self_monitor: SelfMonitorConfig,
        }
        option { logs_dir: PathBuf }
    }
}
