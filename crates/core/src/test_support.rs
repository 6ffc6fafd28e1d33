// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{NodeId, NodeRecord};

/// A WAITING record with the given id and optional parent.
pub fn record(id: u64, parent: Option<u64>) -> NodeRecord {
    let mut record = NodeRecord::builder().id(NodeId::new(id)).build();
    record.parent_id = parent.map(NodeId::new);
    record
}

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for node record sets.
pub mod strategies {
    use super::record;
    use crate::NodeRecord;
    use proptest::prelude::*;

    /// Records with unique ids `1..=n`, each referencing either no parent,
    /// an earlier record, or an id that is not part of the set.
    ///
    /// Parents always precede children, mirroring the store's ordering
    /// contract.
    pub fn arb_parent_first_records(max: usize) -> impl Strategy<Value = Vec<NodeRecord>> {
        (1..=max).prop_flat_map(|n| {
            proptest::collection::vec((0u8..3, any::<prop::sample::Index>()), n).prop_map(
                |choices| {
                    choices
                        .into_iter()
                        .enumerate()
                        .map(|(i, (kind, pick))| {
                            let id = i as u64 + 1;
                            let parent = match kind {
                                0 => None,
                                1 if i > 0 => Some(pick.index(i) as u64 + 1),
                                // Dangling reference well outside the id range
                                _ => Some(10_000 + id),
                            };
                            record(id, parent)
                        })
                        .collect()
                },
            )
        })
    }
}
