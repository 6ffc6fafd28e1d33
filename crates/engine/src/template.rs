// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Script template loading and per-file rendering

use crate::error::ScriptError;
use pex_core::NodeId;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Regex pattern for `${variable_name}`
// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
pub static VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([a-zA-Z_][a-zA-Z0-9_]*)\}").expect("constant regex pattern is valid")
});

/// Quote a value as a single POSIX shell word.
///
/// The value is wrapped in single quotes and embedded single quotes are
/// written as `'\''` (end quote, escaped literal quote, start quote).
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

/// A node's script, read once per job run.
///
/// The file on disk is never rewritten; each input file gets its own
/// rendered copy passed to the shell.
#[derive(Debug, Clone)]
pub struct ScriptTemplate {
    path: PathBuf,
    source: String,
}

impl ScriptTemplate {
    pub fn load(path: &Path) -> Result<Self, ScriptError> {
        let source = std::fs::read_to_string(path)
            .map_err(|source| ScriptError::Missing { path: path.to_path_buf(), source })?;
        Ok(Self { path: path.to_path_buf(), source })
    }

    pub fn from_source(path: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        Self { path: path.into(), source: source.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Render the script for one input file.
    ///
    /// Substitutes `${input_file}`, `${input_name}`, `${index}`,
    /// `${output_dir}` and `${node_id}`, each shell-quoted. Unknown
    /// variables are left as-is.
    pub fn render(
        &self,
        input: &Path,
        index: usize,
        output_dir: &Path,
        node: NodeId,
    ) -> Result<String, ScriptError> {
        let input_file = safe_path(input)?;
        let input_name = input
            .file_name()
            .map(|n| safe_path(Path::new(n)))
            .transpose()?
            .unwrap_or_default();
        let output_dir = safe_path(output_dir)?;

        let vars: HashMap<&str, String> = HashMap::from([
            ("input_file", input_file),
            ("input_name", input_name),
            ("index", index.to_string()),
            ("output_dir", output_dir),
            ("node_id", node.to_string()),
        ]);

        let rendered = VAR_PATTERN.replace_all(&self.source, |caps: &regex::Captures| {
            match vars.get(&caps[1]) {
                Some(val) => shell_quote(val),
                None => caps[0].to_string(),
            }
        });
        Ok(rendered.into_owned())
    }
}

/// Paths must be valid UTF-8 without NUL or line breaks to be substituted.
fn safe_path(path: &Path) -> Result<String, ScriptError> {
    match path.to_str() {
        Some(s) if !s.contains(['\0', '\n', '\r']) => Ok(s.to_string()),
        _ => Err(ScriptError::UnsafePath(path.to_path_buf())),
    }
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
