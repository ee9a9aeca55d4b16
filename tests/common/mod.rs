//! Shared test helpers for pal-platform integration tests.
//!
//! Every test works inside its own temp directory laid out as
//! `<tmp>/pal-platform/` (the engine root, holding `pal-platform.json` and
//! fixtures) so generated `__<target>` output lands inside `<tmp>` too.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

/// A scratch engine root.
pub struct Engine {
    pub dir: TempDir,
    pub root: PathBuf,
}

impl Engine {
    /// Create `<tmp>/pal-platform/` with the given configuration.
    pub fn new(config: &str) -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let root = dir.path().join("pal-platform");
        fs::create_dir_all(&root).expect("failed to create engine root");
        fs::write(root.join("pal-platform.json"), config).expect("failed to write config");
        Self { dir, root }
    }

    /// Write a file relative to the engine root, creating parents.
    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create parent dir");
        }
        fs::write(&path, content).expect("failed to write fixture");
        path
    }

    /// Read a file relative to the engine root.
    pub fn read(&self, rel: &str) -> Option<String> {
        fs::read_to_string(self.root.join(rel)).ok()
    }

    /// Run pal-platform from the engine root.
    pub fn pal(&self, args: &[&str]) -> Output {
        pal_in(&self.root, args)
    }

    /// Run pal-platform and assert success. Returns (stdout, stderr).
    pub fn pal_ok(&self, args: &[&str]) -> (String, String) {
        let out = self.pal(args);
        let stdout = String::from_utf8_lossy(&out.stdout).to_string();
        let stderr = String::from_utf8_lossy(&out.stderr).to_string();
        assert!(
            out.status.success(),
            "pal-platform {} failed:\nstdout: {stdout}\nstderr: {stderr}",
            args.join(" "),
        );
        (stdout, stderr)
    }

    /// Run pal-platform and assert failure. Returns stderr.
    pub fn pal_fails(&self, args: &[&str]) -> String {
        let out = self.pal(args);
        assert!(
            !out.status.success(),
            "Expected pal-platform {} to fail, but it succeeded.\nstdout: {}",
            args.join(" "),
            String::from_utf8_lossy(&out.stdout),
        );
        String::from_utf8_lossy(&out.stderr).to_string()
    }
}

/// Run pal-platform with the given args in the given directory.
pub fn pal_in(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pal-platform"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .env_remove("PAL_PLATFORM_CONFIG")
        .env_remove("PAL_PLATFORM_LOG")
        .output()
        .expect("failed to execute pal-platform")
}

/// Whether an external tool is runnable. Tests that need it skip otherwise.
pub fn has_tool(program: &str) -> bool {
    Command::new(program)
        .arg("--version")
        .output()
        .is_ok_and(|out| out.status.success())
}

/// Run git in `dir` with a fixed identity. Panics on failure.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let out = Command::new("git")
        .args(["-c", "user.name=test"])
        .args(["-c", "user.email=test@example.com"])
        .args(args)
        .current_dir(dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .unwrap_or_else(|e| panic!("failed to run git {}: {e}", args.join(" ")));
    let stderr = String::from_utf8_lossy(&out.stderr);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(
        out.status.success(),
        "git {} failed:\nstdout: {stdout}\nstderr: {stderr}",
        args.join(" "),
    );
    stdout.trim().to_string()
}

/// Create a repository on branch `master` with one commit holding `README`.
pub fn upstream_repo(dir: &Path, readme: &str) {
    fs::create_dir_all(dir).expect("failed to create repo dir");
    git(dir, &["init", "-q"]);
    git(dir, &["checkout", "-q", "-b", "master"]);
    fs::write(dir.join("README"), readme).expect("failed to write README");
    git(dir, &["add", "README"]);
    git(dir, &["commit", "-q", "-m", "initial"]);
}

/// Append a line to `file` in `repo` and commit it.
pub fn commit_line(repo: &Path, file: &str, line: &str) {
    let path = repo.join(file);
    let mut text = fs::read_to_string(&path).unwrap_or_default();
    text.push_str(line);
    text.push('\n');
    fs::write(&path, text).expect("failed to append line");
    git(repo, &["add", file]);
    git(repo, &["commit", "-q", "-m", line]);
}
