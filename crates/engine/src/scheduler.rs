// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Admission control, the active-job registry and job lifecycle callbacks.
//!
//! All counters, the ready queue and the registry live behind one mutex.
//! Record-store calls and job launches happen after the lock is released.
//! A second mutex serializes admission against stop, so a RUNNING row is
//! never written after the bulk revert.

use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::executor::run_job;
use crate::job::Job;
use crate::marker::LivenessMarker;
use crate::node_log::NodeLogger;
use crate::process::ProcessTable;
use crate::self_monitor::SelfMonitor;
use crate::stats::Statistics;
use crate::tree::NodeTree;
use parking_lot::Mutex;
use pex_core::{Clock, NodeId, SystemClock};
use pex_storage::RecordStore;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

struct SchedulerState {
    running: usize,
    queue: VecDeque<Arc<Job>>,
    active: HashMap<NodeId, Arc<Job>>,
    last_activity: Instant,
    /// Bumped by every stop or restart; older jobs are ignored.
    generation: u64,
    peak_running: usize,
}

impl SchedulerState {
    fn is_current(&self, job: &Job) -> bool {
        job.generation() == self.generation
            && self.active.get(&job.id()).is_some_and(|a| a.instance() == job.instance())
    }
}

struct Inner<C: Clock> {
    config: SchedulerConfig,
    store: Arc<dyn RecordStore>,
    stats: Arc<Statistics>,
    clock: C,
    marker: LivenessMarker,
    processes: ProcessTable,
    logger: Option<NodeLogger>,
    state: Mutex<SchedulerState>,
    /// Held by `drain` from pop to launch and by `halt` until the revert.
    admission: Mutex<()>,
    done: watch::Sender<bool>,
}

/// Cheaply cloneable handle to one scheduler.
pub struct Scheduler<C: Clock = SystemClock> {
    inner: Arc<Inner<C>>,
}

impl<C: Clock> Clone for Scheduler<C> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl Scheduler<SystemClock> {
    pub fn new(config: SchedulerConfig, store: Arc<dyn RecordStore>) -> Self {
        Self::with_clock(config, store, SystemClock)
    }
}

impl<C: Clock> Scheduler<C> {
    pub fn with_clock(config: SchedulerConfig, store: Arc<dyn RecordStore>, clock: C) -> Self {
        Self::with_stats(config, store, Arc::new(Statistics::new()), clock)
    }

    /// Build a scheduler that feeds `stats` instead of a private registry.
    pub fn with_stats(
        config: SchedulerConfig,
        store: Arc<dyn RecordStore>,
        stats: Arc<Statistics>,
        clock: C,
    ) -> Self {
        let state = SchedulerState {
            running: 0,
            queue: VecDeque::new(),
            active: HashMap::new(),
            last_activity: clock.now(),
            generation: 0,
            peak_running: 0,
        };
        let (done, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                marker: LivenessMarker::new(config.marker_path.clone()),
                logger: config.logs_dir.as_ref().map(NodeLogger::new),
                config,
                store,
                stats,
                clock,
                processes: ProcessTable::new(),
                state: Mutex::new(state),
                admission: Mutex::new(()),
                done,
            }),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    pub fn stats(&self) -> Arc<Statistics> {
        Arc::clone(&self.inner.stats)
    }

    pub fn clock(&self) -> &C {
        &self.inner.clock
    }

    pub fn processes(&self) -> &ProcessTable {
        &self.inner.processes
    }

    pub fn marker(&self) -> &LivenessMarker {
        &self.inner.marker
    }

    pub fn node_logger(&self) -> Option<&NodeLogger> {
        self.inner.logger.as_ref()
    }

    pub(crate) fn log_node(&self, job: &Job, message: &str) {
        if let Some(logger) = &self.inner.logger {
            logger.append(job.id(), "node", message);
        }
    }

    /// Create the liveness marker, load the tree and admit its roots.
    ///
    /// Fails if the marker already exists or the eligible nodes cannot be
    /// loaded. An empty tree removes the marker and completes immediately.
    pub fn start(&self) -> Result<(), SchedulerError> {
        self.inner.marker.create()?;
        match self.seed() {
            Ok(()) => Ok(()),
            Err(e) => {
                self.remove_marker();
                Err(e)
            }
        }
    }

    fn seed(&self) -> Result<(), SchedulerError> {
        let records = self.inner.store.eligible_nodes()?;
        let tree = NodeTree::build(records)?;
        tracing::info!(nodes = tree.len(), roots = tree.roots().len(), "loaded node tree");

        if tree.roots().is_empty() {
            tracing::info!("nothing to run");
            self.remove_marker();
            self.signal_done();
            return Ok(());
        }

        // All roots are queued before the first admission
        {
            let mut state = self.inner.state.lock();
            let generation = state.generation;
            for root in tree.roots() {
                state.queue.push_back(Arc::new(Job::new(Arc::clone(root), generation)));
            }
            state.last_activity = self.inner.clock.now();
        }
        self.drain();
        Ok(())
    }

    /// Launch queued jobs, FIFO, while the marker exists and capacity allows.
    pub fn drain(&self) {
        if !self.inner.marker.exists() {
            let queued = self.inner.state.lock().queue.len();
            if queued > 0 {
                tracing::warn!(queued, "liveness marker is gone, stopping");
                self.stop();
            }
            return;
        }

        let _admission = self.inner.admission.lock();
        let launched: Vec<Arc<Job>> = {
            let mut state = self.inner.state.lock();
            let cap = self.inner.config.max_concurrent;
            let mut launched = Vec::new();
            while cap == 0 || state.running < cap {
                let Some(job) = state.queue.pop_front() else {
                    break;
                };
                if job.generation() != state.generation {
                    tracing::debug!(node = %job.id(), "dropping queued job from a stopped run");
                    continue;
                }
                state.running += 1;
                state.peak_running = state.peak_running.max(state.running);
                state.active.insert(job.id(), Arc::clone(&job));
                launched.push(job);
            }
            if !launched.is_empty() {
                state.last_activity = self.inner.clock.now();
                tracing::debug!(running = state.running, queued = state.queue.len(), "admitted jobs");
            }
            launched
        };

        for job in launched {
            if let Err(e) = self.inner.store.mark_running(job.id()) {
                tracing::error!(node = %job.id(), error = %e, "unable to mark node as running");
            }
            self.launch(job);
        }
    }

    fn launch(&self, job: Arc<Job>) {
        tokio::spawn(run_job(job, self.clone()));
    }

    /// Enqueue a job and drain.
    pub fn on_job_start(&self, job: Arc<Job>) {
        {
            let mut state = self.inner.state.lock();
            if job.generation() != state.generation {
                tracing::debug!(node = %job.id(), "not queueing job from a stopped run");
                return;
            }
            state.queue.push_back(job);
            state.last_activity = self.inner.clock.now();
        }
        self.drain();
    }

    /// Submit every child of `parent`'s node as a new job.
    pub fn submit_children(&self, parent: &Job) {
        for child in &parent.node().children {
            tracing::debug!(parent = %parent.id(), child = %child.id(), "submitting child");
            self.on_job_start(Arc::new(Job::new(Arc::clone(child), parent.generation())));
        }
    }

    /// Put `next` in place of `old` in the registry without re-queueing.
    ///
    /// Returns false, leaving the registry untouched, if `old` is no longer
    /// the registered instance of its node.
    pub fn on_job_restart(&self, old: &Job, next: Arc<Job>) -> bool {
        let mut state = self.inner.state.lock();
        if !state.is_current(old) {
            return false;
        }
        state.active.insert(next.id(), next);
        state.last_activity = self.inner.clock.now();
        true
    }

    /// Replace a stalled job with a successor that resumes at its cursor.
    ///
    /// The old instance is interrupted; its in-flight subprocess is left
    /// to run.
    pub fn restart_job(&self, old: &Arc<Job>) {
        let next = Arc::new(old.successor());
        if !self.on_job_restart(old, Arc::clone(&next)) {
            tracing::debug!(node = %old.id(), "stalled job already replaced, not restarting");
            return;
        }
        old.interrupt();
        tracing::info!(node = %next.id(), attempt = next.attempts(), cursor = next.cursor(), "job restarted");
        self.log_node(&next, &format!("restarted after stall (restart {})", next.attempts()));
        self.launch(next);
    }

    /// A job ran to completion or failed: persist the outcome and admit more.
    pub fn on_job_end(&self, job: &Job) {
        let idle = {
            let mut state = self.inner.state.lock();
            if !state.is_current(job) {
                tracing::debug!(node = %job.id(), "ignoring end of replaced job");
                return;
            }
            state.active.remove(&job.id());
            state.running = state.running.saturating_sub(1);
            state.last_activity = self.inner.clock.now();
            tracing::debug!(node = %job.id(), running = state.running, "job ended");
            state.running == 0 && state.queue.is_empty()
        };

        let error = job.error();
        if let Err(e) = self.inner.store.mark_finished(job.id(), error.as_deref()) {
            tracing::error!(node = %job.id(), error = %e, "unable to mark node as finished");
        }

        if idle {
            tracing::info!("all jobs finished");
            self.remove_marker();
            self.signal_done();
        } else {
            self.drain();
        }
    }

    /// Unregister an interrupted job. Nothing is persisted.
    pub fn on_job_interrupt(&self, job: &Job) {
        let mut state = self.inner.state.lock();
        if state.is_current(job) {
            state.active.remove(&job.id());
            state.running = state.running.saturating_sub(1);
        }
    }

    /// Whether `job` may still hand children to the scheduler.
    pub fn permits(&self, job: &Job) -> bool {
        !job.is_interrupted()
            && self.inner.marker.exists()
            && self.inner.state.lock().is_current(job)
    }

    /// Record lifecycle activity for staleness tracking.
    pub fn ping(&self) {
        self.inner.state.lock().last_activity = self.inner.clock.now();
    }

    /// Interrupt every active job and revert RUNNING rows to WAITING.
    pub fn stop(&self) {
        self.halt();
        self.signal_done();
    }

    /// [`Scheduler::stop`] and remove the liveness marker.
    pub fn shutdown(&self) {
        self.stop();
        self.remove_marker();
    }

    /// Stop, reset every counter, reload the tree and start again.
    ///
    /// With `spawn_monitor` a fresh [`SelfMonitor`] is started as well.
    pub fn restart(&self, spawn_monitor: bool) -> Result<(), SchedulerError> {
        tracing::info!("restarting scheduler");
        self.halt();
        self.remove_marker();
        {
            let mut state = self.inner.state.lock();
            state.last_activity = self.inner.clock.now();
        }
        self.inner.done.send_replace(false);
        self.start()?;
        if spawn_monitor {
            SelfMonitor::new(self.clone()).spawn();
        }
        Ok(())
    }

    fn halt(&self) {
        let admission = self.inner.admission.lock();
        let jobs: Vec<Arc<Job>> = {
            let mut state = self.inner.state.lock();
            state.generation += 1;
            state.queue.clear();
            state.running = 0;
            state.active.drain().map(|(_, job)| job).collect()
        };

        tracing::info!(active = jobs.len(), "interrupting active jobs");
        for job in &jobs {
            job.interrupt();
        }

        match self.inner.store.revert_running() {
            Ok(reverted) => tracing::info!(reverted, "reverted running nodes to waiting"),
            Err(e) => tracing::error!(error = %e, "unable to revert running nodes"),
        }
        drop(admission);

        if self.inner.config.kill_on_stop {
            let killed = self.inner.processes.terminate_all();
            tracing::info!(killed, "terminated tracked subprocesses");
        }
    }

    fn remove_marker(&self) {
        if let Err(e) = self.inner.marker.remove() {
            tracing::error!(error = %e, "unable to remove liveness marker");
        }
    }

    fn signal_done(&self) {
        self.inner.done.send_replace(true);
    }

    /// Whether the marker still exists.
    pub fn is_alive(&self) -> bool {
        self.inner.marker.exists()
    }

    /// Time since the last lifecycle activity.
    pub fn idle_for(&self) -> Duration {
        let last = self.inner.state.lock().last_activity;
        self.inner.clock.since(last)
    }

    pub fn running_count(&self) -> usize {
        self.inner.state.lock().running
    }

    pub fn queued_count(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

    pub fn generation(&self) -> u64 {
        self.inner.state.lock().generation
    }

    /// Highest running count seen since construction.
    pub fn peak_running(&self) -> usize {
        self.inner.state.lock().peak_running
    }

    /// Ids of registered jobs, sorted.
    pub fn active_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.inner.state.lock().active.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// The registered instance for `node`, if any.
    pub fn active_job(&self, node: NodeId) -> Option<Arc<Job>> {
        self.inner.state.lock().active.get(&node).cloned()
    }

    pub fn is_finished(&self) -> bool {
        *self.inner.done.borrow()
    }

    /// Resolves once the scheduler runs out of work or is stopped.
    pub async fn finished(&self) {
        let mut rx = self.inner.done.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|done| *done).await;
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
