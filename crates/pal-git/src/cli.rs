//! [`GitClient`] backed by the `git` executable.

use std::path::Path;
use std::time::Duration;

use crate::client::GitClient;
use crate::error::GitError;
use crate::exec::{DEFAULT_TIMEOUT, ExecError, ToolCommand};
use crate::types::TreeRef;

/// Drives the `git` command-line client.
///
/// Each call is a separate process bounded by the configured timeout.
/// Interactive credential prompts are disabled so an unreachable or private
/// origin fails instead of hanging.
#[derive(Clone, Debug)]
pub struct CliGit {
    program: String,
    timeout: Duration,
}

impl Default for CliGit {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl CliGit {
    /// Use `git` from `PATH` with the given per-command timeout.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self::with_program("git", timeout)
    }

    /// Use a specific git executable.
    #[must_use]
    pub fn with_program(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    fn git(&self) -> ToolCommand {
        ToolCommand::new(self.program.clone())
            .env("GIT_TERMINAL_PROMPT", "0")
            .timeout(self.timeout)
    }

    fn git_in(&self, repo: &Path) -> ToolCommand {
        self.git().current_dir(repo)
    }

    fn run_in(&self, repo: &Path, args: &[&str]) -> Result<(), GitError> {
        self.git_in(repo).args(args.iter().copied()).run()?;
        Ok(())
    }

    fn stdout_in(&self, repo: &Path, args: &[&str]) -> Result<String, GitError> {
        Ok(self.git_in(repo).args(args.iter().copied()).stdout()?)
    }

    fn commit_hash(&self, repo: &Path, args: &[&str]) -> Result<String, GitError> {
        let cmd = self.git_in(repo).args(args.iter().copied());
        let out = cmd.stdout()?;
        if out.len() == 40 && out.bytes().all(|b| b.is_ascii_hexdigit()) {
            Ok(out)
        } else {
            Err(GitError::UnexpectedOutput {
                command: cmd.display(),
                output: out,
            })
        }
    }
}

impl GitClient for CliGit {
    fn clone_repo(&self, url: &str, reference: &TreeRef, dest: &Path) -> Result<(), GitError> {
        let mut cmd = self.git().arg("clone");
        cmd = match reference {
            TreeRef::Commit(_) => cmd.arg("--no-checkout"),
            TreeRef::Branch(name) => cmd.args(["-b", name.as_str()]),
        };
        cmd.arg(url).arg(dest.to_string_lossy()).run()?;
        Ok(())
    }

    fn set_config(&self, repo: &Path, key: &str, value: &str) -> Result<(), GitError> {
        self.run_in(repo, &["config", key, value])
    }

    fn file_config(&self, repo: &Path, file: &str, key: &str) -> Result<Option<String>, GitError> {
        let file_arg = format!("--file={file}");
        let cmd = self.git_in(repo).args(["config", file_arg.as_str(), key]);
        let out = cmd.output()?;
        match out.exit_code {
            Some(0) => Ok(Some(out.stdout.trim().to_owned())),
            // `git config` exits 1 when the key is not set.
            Some(1) => Ok(None),
            exit_code => Err(ExecError::Failed {
                command: cmd.display(),
                exit_code,
                stderr: out.stderr.trim().to_owned(),
            }
            .into()),
        }
    }

    fn set_file_config(
        &self,
        repo: &Path,
        file: &str,
        key: &str,
        value: &str,
    ) -> Result<(), GitError> {
        let file_arg = format!("--file={file}");
        self.run_in(repo, &["config", &file_arg, key, value])
    }

    fn checkout(&self, repo: &Path, target: &str) -> Result<(), GitError> {
        self.run_in(repo, &["checkout", target])
    }

    fn restore_path(&self, repo: &Path, path: &str) -> Result<(), GitError> {
        self.run_in(repo, &["checkout", "--", path])
    }

    fn remote_url(&self, repo: &Path) -> Result<String, GitError> {
        self.stdout_in(repo, &["ls-remote", "--get-url"])
    }

    fn fetch_all(&self, repo: &Path) -> Result<(), GitError> {
        self.run_in(repo, &["fetch", "--all"])
    }

    fn pull_rebase(&self, repo: &Path) -> Result<(), GitError> {
        self.run_in(repo, &["pull", "--rebase", "--tags"])
    }

    fn current_branch(&self, repo: &Path) -> Result<Option<String>, GitError> {
        let branch = self.stdout_in(repo, &["rev-parse", "--abbrev-ref", "HEAD"])?;
        Ok((branch != "HEAD").then_some(branch))
    }

    fn rev_parse(&self, repo: &Path, spec: &str) -> Result<String, GitError> {
        self.commit_hash(repo, &["rev-parse", spec])
    }

    fn merge_base(&self, repo: &Path, a: &str, b: &str) -> Result<String, GitError> {
        self.commit_hash(repo, &["merge-base", a, b])
    }

    fn submodule_sync(&self, repo: &Path, name: &str) -> Result<(), GitError> {
        self.run_in(repo, &["submodule", "sync", "--", name])
    }

    fn submodule_update(&self, repo: &Path, name: &str, remote: bool) -> Result<(), GitError> {
        let mut args = vec!["submodule", "update", "--init", "--recursive"];
        if remote {
            args.push("--remote");
        }
        args.extend(["--", name]);
        self.run_in(repo, &args)
    }

    fn add_all(&self, repo: &Path) -> Result<(), GitError> {
        self.run_in(repo, &["add", "--all"])
    }

    fn commit(&self, repo: &Path, message: &str) -> Result<(), GitError> {
        self.run_in(repo, &["commit", "-m", message])
    }
}
