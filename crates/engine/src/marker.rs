// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The liveness marker: a file whose existence means "scheduler alive".

use crate::error::SchedulerError;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct LivenessMarker {
    path: PathBuf,
}

impl LivenessMarker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the marker and write our pid into it.
    ///
    /// Fails with [`SchedulerError::AlreadyRunning`] if it already exists.
    pub fn create(&self) -> Result<(), SchedulerError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let mut file =
            std::fs::OpenOptions::new().write(true).create_new(true).open(&self.path).map_err(
                |e| match e.kind() {
                    ErrorKind::AlreadyExists => SchedulerError::AlreadyRunning(self.path.clone()),
                    _ => self.io_error(e),
                },
            )?;
        writeln!(file, "{}", std::process::id()).map_err(|e| self.io_error(e))?;
        tracing::info!(path = %self.path.display(), "created liveness marker");
        Ok(())
    }

    /// Remove the marker. Returns false if it was already gone.
    pub fn remove(&self) -> Result<bool, SchedulerError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "removed liveness marker");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(self.io_error(e)),
        }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Pid recorded by the scheduler that created the marker, if readable.
    pub fn owner_pid(&self) -> Option<u32> {
        std::fs::read_to_string(&self.path).ok()?.trim().parse().ok()
    }

    fn io_error(&self, source: std::io::Error) -> SchedulerError {
        SchedulerError::Marker { path: self.path.clone(), source }
    }
}

#[cfg(test)]
#[path = "marker_tests.rs"]
mod tests;
