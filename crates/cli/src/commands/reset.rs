// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `pex reset` - revert RUNNING rows left by a dead scheduler

use crate::exit_error::{ExitError, EXIT_ALREADY_RUNNING};
use crate::lifecycle::Paths;
use anyhow::{Context, Result};
use pex_engine::LivenessMarker;
use pex_storage::{JsonStore, RecordStore};

pub fn handle(paths: &Paths, force: bool) -> Result<()> {
    let marker = LivenessMarker::new(&paths.marker_path);
    if marker.exists() && !force {
        return Err(ExitError::new(
            EXIT_ALREADY_RUNNING,
            format!(
                "a scheduler appears to be running (marker {}); use --force to reset anyway",
                marker.path().display()
            ),
        )
        .into());
    }

    let store = JsonStore::open(&paths.store_path)
        .with_context(|| format!("cannot open record store {}", paths.store_path.display()))?;
    let reverted = store.revert_running()?;
    if force && marker.remove()? {
        tracing::info!(marker = %marker.path().display(), "removed stale liveness marker");
    }
    println!("Reverted {reverted} node(s) to WAITING");
    Ok(())
}

#[cfg(test)]
#[path = "reset_tests.rs"]
mod tests;
