//! Timeout-bounded invocation of external tools.
//!
//! Every `git` and `patch` call made by pal-platform goes through
//! [`ToolCommand`]. The child runs with stdin closed and its output captured
//! into anonymous temp files, so a chatty child can never block on a full
//! pipe while we poll it. A child still running when the timeout expires is
//! killed and reported as [`ExecError::TimedOut`]; there is no retry.

#![allow(clippy::missing_errors_doc)]

use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

/// Timeout applied when the caller does not set one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Errors from running an external tool.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The process could not be started or waited on.
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        /// The command line.
        command: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// The process exited unsuccessfully.
    #[error("`{command}` failed{}", failure_detail(.exit_code, .stderr))]
    Failed {
        /// The command line.
        command: String,
        /// Exit code, `None` when killed by a signal.
        exit_code: Option<i32>,
        /// Captured stderr, trimmed.
        stderr: String,
    },

    /// The process did not finish within its timeout and was killed.
    #[error("`{command}` timed out after {}s", timeout.as_secs())]
    TimedOut {
        /// The command line.
        command: String,
        /// The timeout that expired.
        timeout: Duration,
    },
}

fn failure_detail(exit_code: &Option<i32>, stderr: &str) -> String {
    let mut detail = String::new();
    if let Some(code) = exit_code {
        let _ = write!(detail, " (exit code {code})");
    }
    if !stderr.is_empty() {
        let _ = write!(detail, ": {stderr}");
    }
    detail
}

/// Captured result of a finished tool invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, `None` when killed by a signal.
    pub exit_code: Option<i32>,
    /// Everything the tool wrote to stdout.
    pub stdout: String,
    /// Everything the tool wrote to stderr.
    pub stderr: String,
}

impl ToolOutput {
    /// Whether the tool exited with status 0.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.exit_code, Some(0))
    }
}

/// Builder for one external tool invocation.
#[derive(Clone, Debug)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
    envs: Vec<(String, String)>,
    cwd: Option<PathBuf>,
    timeout: Duration,
}

impl ToolCommand {
    /// Start building an invocation of `program`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            cwd: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the child.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Run the child in `dir`.
    #[must_use]
    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.cwd = Some(dir.to_path_buf());
        self
    }

    /// Bound the invocation by `timeout`.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The command line as shown in logs and errors.
    #[must_use]
    pub fn display(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    /// Run the tool and return its output whatever the exit status.
    ///
    /// Only spawn failures and timeouts are errors here; use this for dry
    /// runs whose exit status is the answer.
    pub fn output(&self) -> Result<ToolOutput, ExecError> {
        let command = self.display();
        match &self.cwd {
            Some(dir) => debug!("{command} (in {})", dir.display()),
            None => debug!("{command}"),
        }

        let spawn_err = |source| ExecError::Spawn {
            command: command.clone(),
            source,
        };

        let mut stdout_file = tempfile::tempfile().map_err(spawn_err)?;
        let mut stderr_file = tempfile::tempfile().map_err(spawn_err)?;

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout_file.try_clone().map_err(spawn_err)?))
            .stderr(Stdio::from(stderr_file.try_clone().map_err(spawn_err)?));
        for (key, value) in &self.envs {
            cmd.env(key, value);
        }
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        let start = Instant::now();
        let mut child = cmd.spawn().map_err(spawn_err)?;

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if start.elapsed() >= self.timeout {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(ExecError::TimedOut {
                            command: command.clone(),
                            timeout: self.timeout,
                        });
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(source) => return Err(spawn_err(source)),
            }
        };

        Ok(ToolOutput {
            exit_code: status.code(),
            stdout: read_back(&mut stdout_file).map_err(spawn_err)?,
            stderr: read_back(&mut stderr_file).map_err(spawn_err)?,
        })
    }

    /// Run the tool and require a zero exit status.
    pub fn run(&self) -> Result<ToolOutput, ExecError> {
        let output = self.output()?;
        if output.success() {
            Ok(output)
        } else {
            Err(ExecError::Failed {
                command: self.display(),
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_owned(),
            })
        }
    }

    /// Run the tool, require success, and return trimmed stdout.
    pub fn stdout(&self) -> Result<String, ExecError> {
        self.run().map(|output| output.stdout.trim().to_owned())
    }
}

fn read_back(file: &mut File) -> io::Result<String> {
    file.seek(SeekFrom::Start(0))?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
