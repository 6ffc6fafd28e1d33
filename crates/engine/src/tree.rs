// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory parent → children tree built from loaded node records.

use crate::error::TreeError;
use indexmap::IndexMap;
use pex_core::{NodeId, NodeRecord};
use std::collections::HashMap;
use std::sync::Arc;

/// A node with its owned children.
#[derive(Debug)]
pub struct Node {
    pub record: NodeRecord,
    /// Declared root, or promoted because its parent was not loaded
    pub is_root: bool,
    pub children: Vec<Arc<Node>>,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.record.id
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(|c| c.subtree_len()).sum::<usize>()
    }
}

struct Entry {
    record: NodeRecord,
    is_root: bool,
    children: Vec<NodeId>,
}

#[derive(Debug, Default)]
pub struct NodeTree {
    roots: Vec<Arc<Node>>,
    len: usize,
}

impl NodeTree {
    /// Assemble the tree from records ordered parent-before-child.
    ///
    /// A record attaches to its parent only if the parent was loaded
    /// earlier; otherwise it is promoted to a root. No record is dropped.
    pub fn build(records: Vec<NodeRecord>) -> Result<Self, TreeError> {
        let mut entries: IndexMap<NodeId, Entry> = IndexMap::with_capacity(records.len());

        for record in records {
            let id = record.id;
            if entries.contains_key(&id) {
                return Err(TreeError::DuplicateKey(id));
            }

            let is_root = match record.parent() {
                None => true,
                Some(parent) if parent != id => match entries.get_mut(&parent) {
                    Some(entry) => {
                        entry.children.push(id);
                        false
                    }
                    None => {
                        tracing::debug!(node = %id, %parent, "parent not loaded, promoting to root");
                        true
                    }
                },
                Some(_) => {
                    tracing::warn!(node = %id, "node lists itself as parent, promoting to root");
                    true
                }
            };

            entries.insert(id, Entry { record, is_root, children: Vec::new() });
        }

        let len = entries.len();
        let root_ids: Vec<NodeId> =
            entries.iter().filter(|(_, e)| e.is_root).map(|(id, _)| *id).collect();

        // Children are always inserted after their parent, so walking in
        // reverse insertion order builds every subtree before its parent.
        let mut built: HashMap<NodeId, Arc<Node>> = HashMap::with_capacity(len);
        for (id, entry) in entries.into_iter().rev() {
            let children = entry.children.iter().filter_map(|c| built.remove(c)).collect();
            built.insert(
                id,
                Arc::new(Node { record: entry.record, is_root: entry.is_root, children }),
            );
        }

        let roots = root_ids.iter().filter_map(|id| built.remove(id)).collect();
        Ok(Self { roots, len })
    }

    pub fn roots(&self) -> &[Arc<Node>] {
        &self.roots
    }

    /// Total number of loaded nodes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Depth-first lookup by id.
    pub fn find(&self, id: NodeId) -> Option<&Arc<Node>> {
        let mut stack: Vec<&Arc<Node>> = self.roots.iter().rev().collect();
        while let Some(node) = stack.pop() {
            if node.id() == id {
                return Some(node);
            }
            stack.extend(node.children.iter().rev());
        }
        None
    }
}

#[cfg(test)]
#[path = "tree_tests.rs"]
mod tests;
