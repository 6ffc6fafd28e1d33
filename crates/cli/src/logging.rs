// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide tracing subscriber: stderr plus an optional daily log file.

use crate::env;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_FILE_PREFIX: &str = "pex";
const LOG_FILE_SUFFIX: &str = "log";

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop and must be held for
/// the life of the process.
pub fn init(logs_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_new(env::log_filter()).unwrap_or_else(|_| EnvFilter::new("pex=info"));
    let stderr = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let (file_layer, guard) = match logs_dir.and_then(open_appender) {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    // A subscriber may already be installed (tests)
    let _ = tracing_subscriber::registry().with(filter).with(stderr).with(file_layer).try_init();
    guard
}

fn open_appender(dir: &Path) -> Option<RollingFileAppender> {
    if let Err(e) = std::fs::create_dir_all(dir) {
        eprintln!("pex: cannot create log directory {}: {e}", dir.display());
        return None;
    }
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .build(dir)
        .map_err(|e| eprintln!("pex: file logging disabled: {e}"))
        .ok()
}
