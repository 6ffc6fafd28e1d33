// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory record store for tests.
//!
//! Records every call and can be switched into a failing mode to exercise
//! the scheduler's fail-open handling of store errors. Writes can also be
//! slowed down to widen races against stop.

use crate::store::{order_parent_first, RecordStore, StoreError};
use parking_lot::Mutex;
use pex_core::{NodeId, NodeRecord, NodeState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// A store call, as observed by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Eligible,
    MarkRunning(NodeId),
    MarkFinished(NodeId, Option<String>),
    RevertRunning,
}

#[derive(Default)]
pub struct MemoryStore {
    nodes: Mutex<Vec<NodeRecord>>,
    calls: Mutex<Vec<StoreCall>>,
    failing: AtomicBool,
    mark_running_delay: Mutex<Duration>,
}

impl MemoryStore {
    pub fn new(nodes: Vec<NodeRecord>) -> Self {
        Self { nodes: Mutex::new(nodes), ..Default::default() }
    }

    /// Make every subsequent call fail with [`StoreError::Unavailable`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Block every subsequent `mark_running` for `delay` before it writes.
    pub fn set_mark_running_delay(&self, delay: Duration) {
        *self.mark_running_delay.lock() = delay;
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().clone()
    }

    pub fn node(&self, id: u64) -> Option<NodeRecord> {
        self.nodes.lock().iter().find(|n| n.id == id).cloned()
    }

    fn record(&self, call: StoreCall) -> Result<(), StoreError> {
        self.calls.lock().push(call);
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected failure".to_string()));
        }
        Ok(())
    }

    fn with_node(
        &self,
        id: NodeId,
        f: impl FnOnce(&mut NodeRecord),
    ) -> Result<(), StoreError> {
        let mut nodes = self.nodes.lock();
        let node = nodes.iter_mut().find(|n| n.id == id).ok_or(StoreError::NotFound(id))?;
        f(node);
        Ok(())
    }
}

impl RecordStore for MemoryStore {
    fn eligible_nodes(&self) -> Result<Vec<NodeRecord>, StoreError> {
        self.record(StoreCall::Eligible)?;
        let eligible = self.nodes.lock().iter().filter(|n| n.is_eligible()).cloned().collect();
        Ok(order_parent_first(eligible))
    }

    fn all_nodes(&self) -> Result<Vec<NodeRecord>, StoreError> {
        Ok(self.nodes.lock().clone())
    }

    fn mark_running(&self, id: NodeId) -> Result<(), StoreError> {
        self.record(StoreCall::MarkRunning(id))?;
        let delay = *self.mark_running_delay.lock();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        self.with_node(id, |n| n.state = NodeState::Running)
    }

    fn mark_finished(&self, id: NodeId, error: Option<&str>) -> Result<(), StoreError> {
        self.record(StoreCall::MarkFinished(id, error.map(str::to_string)))?;
        self.with_node(id, |n| {
            n.state = NodeState::Finished;
            n.error = error.map(str::to_string);
        })
    }

    fn revert_running(&self) -> Result<usize, StoreError> {
        self.record(StoreCall::RevertRunning)?;
        let mut nodes = self.nodes.lock();
        let mut reverted = 0;
        for node in nodes.iter_mut().filter(|n| n.state == NodeState::Running) {
            node.state = NodeState::Waiting;
            reverted += 1;
        }
        Ok(reverted)
    }
}
