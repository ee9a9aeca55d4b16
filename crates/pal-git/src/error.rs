//! Error types for git operations.
//!
//! [`GitError`] is the single error type returned by all
//! [`GitClient`](crate::GitClient) methods. Process-level failures (spawn,
//! non-zero exit, timeout) are carried verbatim from [`ExecError`] so the
//! failing command line and exit code always reach the operator.

use thiserror::Error;

use crate::exec::ExecError;

/// Errors returned by [`GitClient`](crate::GitClient) operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// The `git` executable could not be run, exited non-zero, or timed out.
    #[error(transparent)]
    Exec(#[from] ExecError),

    /// `git` succeeded but printed something the caller could not interpret.
    #[error("unexpected output from `{command}`: {output:?}")]
    UnexpectedOutput {
        /// The command line that was run.
        command: String,
        /// The trimmed stdout that failed to parse.
        output: String,
    },
}
