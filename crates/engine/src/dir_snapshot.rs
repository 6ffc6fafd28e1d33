// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output-directory progress detection.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Name → size listing of a directory, compared across polls.
#[derive(Debug)]
pub struct DirectorySnapshot {
    dir: PathBuf,
    sizes: HashMap<OsString, u64>,
}

impl DirectorySnapshot {
    /// Take the initial listing of `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let sizes = list(&dir);
        Self { dir, sizes }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Re-list the directory. Returns true if any entry is new or grew.
    ///
    /// Shrinking or removed entries do not count as progress. A directory
    /// that cannot be read is treated as empty.
    pub fn refresh(&mut self) -> bool {
        let current = list(&self.dir);
        let progressed = current
            .iter()
            .any(|(name, size)| self.sizes.get(name).map_or(true, |prev| size > prev));
        self.sizes = current;
        progressed
    }
}

fn list(dir: &Path) -> HashMap<OsString, u64> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return HashMap::new();
    };
    entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let len = entry.metadata().ok()?.len();
            Some((entry.file_name(), len))
        })
        .collect()
}

#[cfg(test)]
#[path = "dir_snapshot_tests.rs"]
mod tests;
