// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pex-engine: tree building, scheduling, execution and stall recovery

mod config;
mod dir_snapshot;
mod drain;
mod error;
mod executor;
mod job;
mod marker;
mod monitor;
mod node_log;
mod process;
mod scheduler;
mod self_monitor;
mod stats;
mod template;
mod tree;

#[cfg(test)]
mod test_fixtures;

pub use config::{MonitorConfig, SchedulerConfig, SelfMonitorConfig};
pub use dir_snapshot::DirectorySnapshot;
pub use drain::{spawn_drain, StreamKind};
pub use error::{JobError, SchedulerError, ScriptError, StatsError, SubprocessError, TreeError};
pub use executor::{list_inputs, prepare_output_dir, run_job, InputFile};
pub use job::{Job, JobProgress};
pub use marker::LivenessMarker;
pub use monitor::{watch, Verdict, WatchOutcome, Watchdog};
pub use node_log::{format_utc_now, NodeLogger};
pub use process::{run_script, ProcessTable, ScriptExit};
pub use scheduler::Scheduler;
pub use self_monitor::{Check, SelfMonitor, SelfMonitorExit};
pub use stats::Statistics;
pub use template::{shell_quote, ScriptTemplate};
pub use tree::{Node, NodeTree};
