// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pex: run a tree of dependent batch jobs with stall recovery

mod commands;
mod env;
mod exit_error;
mod lifecycle;
mod logging;
mod output;

use clap::{Args, Parser, Subcommand};
use exit_error::ExitError;
use lifecycle::Paths;
use output::OutputFormat;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "pex", version, about = "Run a tree of dependent batch jobs")]
struct Cli {
    /// State directory (default: $PEX_STATE_DIR, $XDG_STATE_HOME/pex or ~/.local/state/pex)
    #[arg(long, global = true, value_name = "DIR")]
    state_dir: Option<PathBuf>,

    /// Record file (default: <state-dir>/nodes.json or $PEX_STORE)
    #[arg(long, global = true, value_name = "FILE")]
    store: Option<PathBuf>,

    #[command(flatten)]
    run: RunArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Args)]
struct RunArgs {
    /// Maximum number of nodes running at once; 0 means unlimited
    #[arg(
        value_name = "MAX_CONCURRENT",
        value_parser = commands::run::parse_max_concurrent,
        allow_negative_numbers = true
    )]
    max_concurrent: Option<usize>,

    /// Send SIGTERM to running scripts when the scheduler stops
    #[arg(long)]
    kill_on_stop: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Show the node table and whether a scheduler is alive
    Status {
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },
    /// Revert RUNNING nodes to WAITING without running anything
    Reset {
        /// Reset even if the liveness marker exists (and remove it)
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match dispatch(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("pex: {e:#}");
            ExitCode::from(u8::try_from(ExitError::code_of(&e)).unwrap_or(1))
        }
    }
}

async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let paths = Paths::resolve(cli.state_dir, cli.store)?;
    match cli.command {
        Some(Command::Status { format }) => commands::status::handle(&paths, format),
        Some(Command::Reset { force }) => {
            let _guard = logging::init(None);
            commands::reset::handle(&paths, force)
        }
        None => {
            let _guard = logging::init(Some(&paths.logs_path));
            commands::run::run(&paths, cli.run.max_concurrent.unwrap_or(0), cli.run.kill_on_stop)
                .await
        }
    }
}
