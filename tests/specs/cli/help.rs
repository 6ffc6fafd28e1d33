// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI help and argument validation specs

use crate::prelude::*;

#[test]
fn help_shows_usage_and_subcommands() {
    cli()
        .args(&["--help"])
        .passes()
        .stdout_has("Usage:")
        .stdout_has("MAX_CONCURRENT")
        .stdout_has("status")
        .stdout_has("reset");
}

#[test]
fn version_shows_version() {
    cli().args(&["--version"]).passes().stdout_has("0.2");
}

#[test]
fn negative_concurrency_is_rejected() {
    let temp = Project::empty();
    temp.pex().args(&["-1"]).fails().stderr_has("0 or more");
}

#[test]
fn non_numeric_concurrency_is_rejected() {
    let temp = Project::empty();
    temp.pex().args(&["lots"]).fails().stderr_has("not an integer");
}
