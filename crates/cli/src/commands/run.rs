// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `pex [MAX_CONCURRENT]` - run every eligible node to completion

use crate::exit_error::{ExitError, EXIT_ALREADY_RUNNING, EXIT_INTERRUPTED};
use crate::lifecycle::{scheduler_config, Paths};
use anyhow::{Context, Result};
use pex_core::{NodeState, SystemClock};
use pex_engine::{Scheduler, SchedulerError, SelfMonitor, Statistics};
use pex_storage::{JsonStore, RecordStore};
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, warn};

/// Parse the concurrency cap, rejecting negative values.
pub fn parse_max_concurrent(s: &str) -> Result<usize, String> {
    let n: i64 = s.trim().parse().map_err(|_| format!("`{s}` is not an integer"))?;
    usize::try_from(n).map_err(|_| format!("concurrency cap must be 0 or more, got {n}"))
}

pub async fn run(paths: &Paths, max_concurrent: usize, kill_on_stop: bool) -> Result<()> {
    let store = JsonStore::open(&paths.store_path)
        .with_context(|| format!("cannot open record store {}", paths.store_path.display()))?;
    let store: Arc<dyn RecordStore> = Arc::new(store);

    let config = scheduler_config(paths, max_concurrent, kill_on_stop);
    info!(
        max_concurrent,
        store = %paths.store_path.display(),
        marker = %paths.marker_path.display(),
        "starting scheduler"
    );

    // Registered before any job launches so an early signal is not lost
    let mut interrupt = signal(SignalKind::interrupt()).context("cannot install SIGINT handler")?;
    let mut terminate = signal(SignalKind::terminate()).context("cannot install SIGTERM handler")?;

    let stats = Arc::new(Statistics::new());
    let scheduler = Scheduler::with_stats(config, Arc::clone(&store), stats, SystemClock);
    match scheduler.start() {
        Ok(()) => {}
        Err(e @ SchedulerError::AlreadyRunning(_)) => {
            return Err(ExitError::new(EXIT_ALREADY_RUNNING, e.to_string()).into());
        }
        Err(e) => return Err(anyhow::Error::new(e).context("scheduler failed to start")),
    }

    let monitor = SelfMonitor::new(scheduler.clone()).spawn();

    let interrupted = tokio::select! {
        _ = scheduler.finished() => false,
        _ = interrupt.recv() => {
            info!("interrupt received, shutting down");
            scheduler.shutdown();
            true
        }
        _ = terminate.recv() => {
            info!("terminate received, shutting down");
            scheduler.shutdown();
            true
        }
    };

    match monitor.await {
        Ok(exit) => info!(?exit, "self monitor exited"),
        Err(e) => warn!(error = %e, "self monitor task failed"),
    }
    info!(peak_running = scheduler.peak_running(), "scheduler finished");

    if interrupted {
        return Err(ExitError::new(EXIT_INTERRUPTED, "interrupted").into());
    }
    report(store.as_ref());
    Ok(())
}

/// Print a one-line outcome summary from the store.
fn report(store: &dyn RecordStore) {
    let nodes = match store.all_nodes() {
        Ok(nodes) => nodes,
        Err(e) => {
            warn!(error = %e, "cannot read final node states");
            return;
        }
    };
    let finished = nodes.iter().filter(|n| n.state == NodeState::Finished).count();
    let failed = nodes.iter().filter(|n| n.state == NodeState::Finished && n.has_error()).count();
    let waiting = nodes.iter().filter(|n| n.state == NodeState::Waiting).count();
    println!("{finished} finished ({failed} failed), {waiting} waiting");
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
