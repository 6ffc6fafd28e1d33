// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runs one node's file batch, then hands its children to the scheduler.

use crate::error::{JobError, ScriptError};
use crate::job::Job;
use crate::monitor::{watch, Watchdog};
use crate::process::run_script;
use crate::scheduler::Scheduler;
use crate::template::ScriptTemplate;
use pex_core::{Clock, NodeRecord};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One file a node will process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub path: PathBuf,
    pub size: u64,
}

/// Execute `job` to completion, interruption or failure and report back.
pub async fn run_job<C: Clock>(job: Arc<Job>, scheduler: Scheduler<C>) {
    let node = job.id();
    job.set_running(true);
    tracing::info!(%node, attempt = job.attempts(), cursor = job.cursor(), "job started");
    scheduler.log_node(
        &job,
        &format!("started (attempt {}, from file {})", job.attempts() + 1, job.cursor() + 1),
    );

    let result = execute(&job, &scheduler).await;
    job.mark_done();

    match result {
        Ok(processed) => {
            job.clear_error();
            tracing::info!(%node, processed, "job finished");
            scheduler.log_node(&job, &format!("finished ({processed} files)"));
            if scheduler.permits(&job) {
                scheduler.submit_children(&job);
            } else {
                tracing::debug!(%node, "scheduler no longer permits this job, children not submitted");
            }
            scheduler.on_job_end(&job);
        }
        Err(JobError::Interrupted) => {
            tracing::info!(%node, cursor = job.cursor(), "job interrupted");
            scheduler.log_node(&job, "interrupted");
            scheduler.on_job_interrupt(&job);
        }
        Err(e) => {
            tracing::warn!(%node, error = %e, "job failed");
            scheduler.log_node(&job, &format!("failed: {e}"));
            job.set_error(e.to_string());
            scheduler.on_job_end(&job);
        }
    }
}

async fn execute<C: Clock>(job: &Arc<Job>, scheduler: &Scheduler<C>) -> Result<usize, JobError> {
    let record = &job.node().record;
    let inputs = list_inputs(record)?;
    let template = ScriptTemplate::load(&record.script)?;
    prepare_output_dir(&record.output_dir, job.cursor() == 0)?;

    let config = &scheduler.config().monitor;
    let watchdog = Arc::new(Watchdog::new(
        job.id(),
        config.clone(),
        scheduler.stats(),
        scheduler.clock().clone(),
    ));
    tokio::spawn(watch(Arc::clone(job), Arc::clone(&watchdog), config.poll_interval, {
        let scheduler = scheduler.clone();
        let job = Arc::clone(job);
        move || scheduler.restart_job(&job)
    }));

    let total = inputs.len();
    let mut processed = 0;
    for (index, input) in inputs.iter().enumerate().skip(job.cursor()) {
        if job.is_interrupted() {
            return Err(JobError::Interrupted);
        }

        watchdog.retarget(&input.path, input.size);
        let script = template.render(&input.path, index, &record.output_dir, job.id())?;
        tracing::debug!(node = %job.id(), file = %input.path.display(), index, total, "processing file");
        scheduler.log_node(job, &format!("file {}/{}: {}", index + 1, total, input.path.display()));

        let exit = run_script(
            &scheduler.config().shell,
            &script,
            job.id(),
            scheduler.processes(),
            scheduler.node_logger(),
        )
        .await?;
        job.set_last_pid(exit.pid);
        if !exit.status.success() {
            tracing::info!(node = %job.id(), code = ?exit.status.code(), "script exited unsuccessfully");
        }

        job.advance();
        processed += 1;
        scheduler.ping();
    }

    if job.is_interrupted() {
        return Err(JobError::Interrupted);
    }
    watchdog.finish();
    Ok(processed)
}

/// Regular files in the node's input directory that pass its extension
/// filter, sorted by file name.
pub fn list_inputs(record: &NodeRecord) -> Result<Vec<InputFile>, ScriptError> {
    let dir_error = |source| ScriptError::InputDir { path: record.input_dir.clone(), source };
    let dir = std::path::absolute(&record.input_dir).map_err(dir_error)?;
    let entries = std::fs::read_dir(&dir).map_err(dir_error)?;

    let mut inputs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(dir_error)?;
        let path = entry.path();
        let Ok(meta) = std::fs::metadata(&path) else {
            continue;
        };
        if meta.is_file() && record.accepts_input(&entry.file_name().to_string_lossy()) {
            inputs.push(InputFile { path, size: meta.len() });
        }
    }
    inputs.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
    Ok(inputs)
}

/// Create the output directory; on a fresh run also delete the regular
/// files left in it. Subdirectories are kept.
pub fn prepare_output_dir(dir: &Path, fresh: bool) -> Result<(), ScriptError> {
    let dir_error = |source| ScriptError::OutputDir { path: dir.to_path_buf(), source };
    std::fs::create_dir_all(dir).map_err(dir_error)?;
    if !fresh {
        return Ok(());
    }
    for entry in std::fs::read_dir(dir).map_err(dir_error)? {
        let path = entry.map_err(dir_error)?.path();
        if path.is_file() {
            std::fs::remove_file(&path).map_err(dir_error)?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
