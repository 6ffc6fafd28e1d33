// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-node processing-rate history (seconds per KiB of input).

use crate::error::StatsError;
use parking_lot::Mutex;
use pex_core::NodeId;
use std::collections::HashMap;

/// Process-wide registry of observed file rates, shared by all watchdogs.
#[derive(Debug, Default)]
pub struct Statistics {
    rates: Mutex<HashMap<NodeId, Vec<f64>>>,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one observation. Non-finite or negative rates are ignored.
    pub fn add_rate(&self, node: NodeId, rate: f64) {
        if !rate.is_finite() || rate < 0.0 {
            tracing::debug!(%node, rate, "ignoring invalid rate sample");
            return;
        }
        self.rates.lock().entry(node).or_default().push(rate);
    }

    /// Arithmetic mean of every rate recorded for `node`.
    pub fn average_rate(&self, node: NodeId) -> Result<f64, StatsError> {
        let rates = self.rates.lock();
        match rates.get(&node) {
            Some(samples) if !samples.is_empty() => {
                Ok(samples.iter().sum::<f64>() / samples.len() as f64)
            }
            _ => Err(StatsError::NotRegistered(node)),
        }
    }

    pub fn is_registered(&self, node: NodeId) -> bool {
        self.rates.lock().get(&node).is_some_and(|s| !s.is_empty())
    }

    pub fn samples(&self, node: NodeId) -> usize {
        self.rates.lock().get(&node).map_or(0, Vec::len)
    }

    /// Forget every sample for `node`. Nothing calls this automatically.
    pub fn clear(&self, node: NodeId) {
        self.rates.lock().remove(&node);
    }
}

#[cfg(test)]
#[path = "stats_tests.rs"]
mod tests;
