// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stream consumers that keep subprocess pipes from filling up.

use crate::node_log::NodeLogger;
use pex_core::NodeId;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;

/// Lines are flushed to the node log in batches of at most this size, or
/// sooner once the reader has nothing more buffered.
const LOG_BATCH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

pex_core::simple_display! {
    StreamKind {
        Stdout => "stdout",
        Stderr => "stderr",
    }
}

/// Read `reader` to EOF on its own task, forwarding each line to tracing
/// and, when present, the node log. Resolves to the number of lines read.
///
/// Non-UTF-8 output is decoded lossily. A read error ends the drain early.
pub fn spawn_drain<R>(
    reader: R,
    kind: StreamKind,
    node: NodeId,
    log: Option<NodeLogger>,
) -> JoinHandle<usize>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        let mut pending: Vec<String> = Vec::new();
        let mut count = 0;
        let tag = kind.to_string();

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim_end_matches(['\n', '\r']);
                    tracing::trace!(%node, stream = %kind, line, "subprocess output");
                    count += 1;
                    if let Some(log) = &log {
                        pending.push(line.to_string());
                        if pending.len() >= LOG_BATCH || reader.buffer().is_empty() {
                            log.append_lines(node, &tag, &pending);
                            pending.clear();
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(%node, stream = %kind, error = %e, "stream drain failed");
                    break;
                }
            }
        }

        if let Some(log) = &log {
            log.append_lines(node, &tag, &pending);
        }
        count
    })
}

#[cfg(test)]
#[path = "drain_tests.rs"]
mod tests;
