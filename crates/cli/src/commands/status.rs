// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `pex status` - show the node table and whether a scheduler is alive

use crate::lifecycle::Paths;
use crate::output::{format_elapsed_ms, handle_list, OutputFormat};
use anyhow::{Context, Result};
use pex_core::{NodeRecord, NodeState};
use pex_engine::LivenessMarker;
use pex_storage::{JsonStore, RecordStore};
use std::io::Write;

pub fn handle(paths: &Paths, format: OutputFormat) -> Result<()> {
    let store = JsonStore::open(&paths.store_path)
        .with_context(|| format!("cannot open record store {}", paths.store_path.display()))?;
    let nodes = store.all_nodes()?;

    if format == OutputFormat::Text {
        println!("{}", scheduler_line(&LivenessMarker::new(&paths.marker_path)));
    }
    handle_list(format, &nodes, "No nodes", |nodes, out| write_table(nodes, out))
}

fn scheduler_line(marker: &LivenessMarker) -> String {
    match (marker.exists(), marker.owner_pid()) {
        (true, Some(pid)) => format!("Scheduler: running (pid {pid})"),
        (true, None) => "Scheduler: running".to_string(),
        (false, _) => "Scheduler: not running".to_string(),
    }
}

/// Render the node table as aligned text columns.
pub fn write_table(nodes: &[NodeRecord], out: &mut dyn Write) -> std::io::Result<()> {
    let id_width = nodes.iter().map(|n| n.id.to_string().len()).max().unwrap_or(0).max(2);
    writeln!(out, "{:<id_width$}  {:<6}  {:<8}  {:>8}  ERROR", "ID", "PARENT", "STATE", "TOOK")?;
    for node in nodes {
        let parent = node.parent().map_or_else(|| "-".to_string(), |p| p.to_string());
        let took = match (node.state, node.started_at_ms, node.finished_at_ms) {
            (NodeState::Finished, Some(start), Some(end)) => {
                format_elapsed_ms(end.saturating_sub(start))
            }
            _ => "-".to_string(),
        };
        let error = node.error.as_deref().filter(|e| !e.is_empty()).unwrap_or("");
        writeln!(
            out,
            "{:<id_width$}  {:<6}  {:<8}  {:>8}  {}",
            node.id.to_string(),
            parent,
            node.state.to_string(),
            took,
            error.lines().next().unwrap_or("")
        )?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
