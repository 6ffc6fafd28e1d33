// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watches the scheduler's own liveness marker and staleness.

use crate::scheduler::Scheduler;
use pex_core::{Clock, SystemClock};
use tokio::task::JoinHandle;

/// Why the self monitor exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfMonitorExit {
    /// The marker disappeared and the scheduler was stopped
    MarkerRemoved,
    /// Too many stale restarts; the scheduler was shut down
    RestartsExhausted,
    /// The scheduler finished on its own
    Finished,
    /// A stale restart failed to start the scheduler again
    RestartFailed,
}

/// What one poll decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    Continue,
    Restarted,
    Exit(SelfMonitorExit),
}

pub struct SelfMonitor<C: Clock = SystemClock> {
    scheduler: Scheduler<C>,
    restarts: u32,
}

impl<C: Clock> SelfMonitor<C> {
    pub fn new(scheduler: Scheduler<C>) -> Self {
        Self { scheduler, restarts: 0 }
    }

    pub fn restarts(&self) -> u32 {
        self.restarts
    }

    /// Run the poll loop on its own task.
    pub fn spawn(self) -> JoinHandle<SelfMonitorExit> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) -> SelfMonitorExit {
        let interval = self.scheduler.config().self_monitor.poll_interval;
        loop {
            tokio::time::sleep(interval).await;
            if let Check::Exit(exit) = self.check() {
                tracing::debug!(?exit, "self monitor exiting");
                return exit;
            }
        }
    }

    /// One poll: stop on a missing marker, restart or shut down when stale.
    pub fn check(&mut self) -> Check {
        if self.scheduler.is_finished() {
            return Check::Exit(SelfMonitorExit::Finished);
        }
        if !self.scheduler.is_alive() {
            tracing::info!("liveness marker removed, stopping scheduler");
            self.scheduler.stop();
            return Check::Exit(SelfMonitorExit::MarkerRemoved);
        }

        let config = &self.scheduler.config().self_monitor;
        let idle = self.scheduler.idle_for();
        if config.stale_after.is_zero() || idle < config.stale_after {
            return Check::Continue;
        }

        if self.restarts >= config.max_restarts {
            tracing::error!(
                idle_secs = idle.as_secs(),
                restarts = self.restarts,
                "scheduler is stale and out of restarts, shutting down"
            );
            self.scheduler.shutdown();
            return Check::Exit(SelfMonitorExit::RestartsExhausted);
        }

        self.restarts += 1;
        tracing::warn!(idle_secs = idle.as_secs(), restart = self.restarts, "scheduler is stale, restarting");
        match self.scheduler.restart(false) {
            Ok(()) => Check::Restarted,
            Err(e) => {
                tracing::error!(error = %e, "scheduler restart failed");
                self.scheduler.shutdown();
                Check::Exit(SelfMonitorExit::RestartFailed)
            }
        }
    }
}

#[cfg(test)]
#[path = "self_monitor_tests.rs"]
mod tests;
