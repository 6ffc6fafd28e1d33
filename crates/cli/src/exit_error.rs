// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error carrying a process exit code.
//!
//! Commands return `ExitError` instead of calling `std::process::exit()`
//! so `main()` owns process termination and the log guard is flushed.

use std::fmt;

/// Another scheduler holds the liveness marker
pub const EXIT_ALREADY_RUNNING: i32 = 2;
/// The run was stopped by SIGINT or SIGTERM
pub const EXIT_INTERRUPTED: i32 = 130;

#[derive(Debug)]
pub struct ExitError {
    pub code: i32,
    pub message: String,
}

impl ExitError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    /// Exit code for an error returned from a command.
    pub fn code_of(err: &anyhow::Error) -> i32 {
        err.downcast_ref::<ExitError>().map_or(1, |e| e.code)
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExitError {}
