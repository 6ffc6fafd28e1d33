// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only logger for per-node activity logs.

use chrono::{SecondsFormat, Utc};
use pex_core::NodeId;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Current UTC time as `2026-01-30T08:14:09Z`.
pub fn format_utc_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Append-only logger for per-node activity logs.
///
/// Writes human-readable timestamped lines to:
///   `<log_dir>/node/<node_id>.log`
///
/// Each append opens, writes, and closes the file.
#[derive(Debug, Clone)]
pub struct NodeLogger {
    log_dir: PathBuf,
}

impl NodeLogger {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self { log_dir: log_dir.into() }
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn path(&self, node: NodeId) -> PathBuf {
        self.log_dir.join("node").join(format!("{node}.log"))
    }

    /// Append one line.
    ///
    /// Format: `2026-01-30T08:14:09Z [tag] message`
    ///
    /// Failures are logged via tracing but do not propagate.
    pub fn append(&self, node: NodeId, tag: &str, message: &str) {
        self.append_lines(node, tag, std::slice::from_ref(&message));
    }

    /// Append several lines sharing one tag and timestamp.
    pub fn append_lines<S: AsRef<str>>(&self, node: NodeId, tag: &str, lines: &[S]) {
        if lines.is_empty() {
            return;
        }
        let path = self.path(node);
        if let Err(e) = write_lines(&path, tag, lines) {
            tracing::warn!(%node, path = %path.display(), error = %e, "failed to write node log");
        }
    }
}

fn write_lines<S: AsRef<str>>(path: &Path, tag: &str, lines: &[S]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let ts = format_utc_now();
    for line in lines {
        writeln!(file, "{} [{}] {}", ts, tag, line.as_ref())?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "node_log_tests.rs"]
mod tests;
