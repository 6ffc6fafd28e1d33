// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the pex binary.

use crate::lifecycle::LifecycleError;
use std::path::PathBuf;
use std::time::Duration;

/// Resolve state directory: PEX_STATE_DIR > XDG_STATE_HOME/pex > ~/.local/state/pex
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Some(dir) = non_empty("PEX_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Some(xdg) = non_empty("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("pex"));
    }
    let home = non_empty("HOME").ok_or(LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/pex"))
}

/// Record file override
pub fn store_path() -> Option<PathBuf> {
    non_empty("PEX_STORE").map(PathBuf::from)
}

/// Log filter directives (default `pex=info`)
pub fn log_filter() -> String {
    non_empty("PEX_LOG").unwrap_or_else(|| "pex=info,pex_engine=info,pex_storage=info".to_string())
}

/// Watchdog and self-monitor poll interval override
pub fn poll_interval() -> Option<Duration> {
    parse_u64("PEX_POLL_MS").map(Duration::from_millis)
}

/// Minimum run time before a stalled file may be restarted
pub fn grace() -> Option<Duration> {
    parse_u64("PEX_GRACE_SECS").map(Duration::from_secs)
}

/// Deadline used for nodes without rate history
pub fn fallback_deadline() -> Option<Duration> {
    parse_u64("PEX_FALLBACK_DEADLINE_SECS").map(Duration::from_secs)
}

/// Scheduler staleness threshold; `0` disables stale restarts
pub fn stale_after() -> Option<Duration> {
    parse_u64("PEX_STALE_SECS").map(Duration::from_secs)
}

/// Restart cap shared by the watchdog and the self monitor
pub fn max_restarts() -> Option<u32> {
    parse_u64("PEX_MAX_RESTARTS").and_then(|n| u32::try_from(n).ok())
}

/// SIGTERM tracked subprocesses when the scheduler stops
pub fn kill_on_stop() -> bool {
    non_empty("PEX_KILL_ON_STOP").is_some_and(|v| matches!(v.as_str(), "1" | "true" | "yes"))
}

fn non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.is_empty())
}

fn parse_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|s| s.trim().parse::<u64>().ok())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
