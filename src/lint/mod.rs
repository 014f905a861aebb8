//! Lint invocation and linter-config housekeeping.
//!
//! This module is the tail of every revision:
//!
//! 1. Write the revision's linter config files and delete legacy ones
//!    ([`files`])
//! 2. Run the project's lint command (`npm run lint` by default) and hand
//!    its captured output back for printing
//!
//! Output is never parsed and the exit status never turns into an error;
//! whoever runs the tool reads the report.
//!
//! # Example
//!
//! ```no_run
//! use lint_patcher::config::LintCommand;
//! use lint_patcher::lint::run_lint;
//! use std::path::Path;
//!
//! let output = run_lint(Path::new("/path/to/app"), &LintCommand::default()).unwrap();
//! print!("{}", output.stdout);
//! eprint!("{}", output.stderr);
//! ```

pub mod files;

pub use files::{apply_housekeeping, remove_file, write_config_file, FileAction, FileError};

use crate::config::LintCommand;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum LintError {
    #[error("lint command is empty")]
    EmptyCommand,

    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Captured output of one lint run.
#[derive(Debug, Clone)]
pub struct LintOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: ExitStatus,
}

fn build_command(workspace: &Path, lint: &LintCommand) -> Result<Command, LintError> {
    if lint.program().trim().is_empty() {
        return Err(LintError::EmptyCommand);
    }
    let mut cmd = Command::new(lint.program());
    cmd.current_dir(workspace).args(lint.args());
    Ok(cmd)
}

/// Run the lint command in `workspace` and capture both streams.
///
/// Blocks until the command exits.
pub fn run_lint(workspace: &Path, lint: &LintCommand) -> Result<LintOutput, LintError> {
    let output = build_command(workspace, lint)?
        .stdin(Stdio::null())
        .output()
        .map_err(|source| LintError::Spawn {
            command: lint.to_string(),
            source,
        })?;

    debug!(command = %lint, "lint exited with {}", output.status);

    Ok(LintOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        status: output.status,
    })
}
