//! Idempotent application of unified-diff patches through the external
//! `patch` tool.
//!
//! Whether a patch is already integrated is decided without touching the
//! tree: a reverse dry-run that succeeds means the changes are present.
//! From there, applying an integrated patch and reverting a non-integrated
//! one are both no-ops.
//!
//! The tool runs in the patch file's own directory. Its strip count is the
//! position of the patch file's stem inside the path recorded on the first
//! `--- ` line, so a patch stored next to the tree it modifies needs no
//! operator-supplied `-p`.

#![allow(clippy::missing_errors_doc)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use pal_git::exec::DEFAULT_TIMEOUT;
use pal_git::{ExecError, GitError, ToolCommand};
use thiserror::Error;
use tracing::{Level, debug, info, instrument};

/// The patch executable.
#[cfg(windows)]
pub const PATCH_PROGRAM: &str = "patch.exe";
/// The patch executable.
#[cfg(not(windows))]
pub const PATCH_PROGRAM: &str = "patch";

/// Errors from loading or applying a patch.
#[derive(Debug, Error)]
pub enum PatchError {
    /// The patch file could not be read.
    #[error("failed to read patch {}: {source}", path.display())]
    Read {
        /// The patch file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// No `--- <path>` header line was found.
    #[error("malformed patch file {}", .0.display())]
    Malformed(PathBuf),

    /// The header path does not contain the patch file's stem.
    #[error("cannot derive strip count for {}: '{stem}' not found in '{header}'", path.display())]
    StripCount {
        /// The patch file.
        path: PathBuf,
        /// The file stem that was looked for.
        stem: String,
        /// The path recorded in the patch header.
        header: String,
    },

    /// A forward dry-run failed: the tree has diverged from what the patch
    /// expects.
    #[error(
        "applying {} on {} failed, check target directory is clean",
        patch.display(),
        dir.display()
    )]
    NotClean {
        /// The patch file.
        patch: PathBuf,
        /// The directory the tool ran in.
        dir: PathBuf,
    },

    /// The patch tool could not be run or failed unexpectedly.
    #[error(transparent)]
    Tool(#[from] ExecError),

    /// Recording the applied patch in version control failed.
    #[error(transparent)]
    Git(#[from] GitError),
}

/// Whether a patch's changes are present in the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PatchState {
    /// The changes are present.
    Integrated,
    /// The changes are absent.
    NotIntegrated,
}

/// What [`PatchTool::apply`] or [`PatchTool::revert`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PatchOutcome {
    /// The patch was applied.
    Applied,
    /// Nothing to apply.
    AlreadyIntegrated,
    /// The patch was reverted.
    Reverted,
    /// Nothing to revert.
    AlreadyReverted,
}

/// A patch file with its derived strip count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Patch {
    /// The patch file.
    pub path: PathBuf,
    /// Leading path components the tool strips.
    pub strip: usize,
}

impl Patch {
    /// Read `path` and derive its strip count.
    pub fn load(path: &Path) -> Result<Self, PatchError> {
        let text = fs::read_to_string(path).map_err(|source| PatchError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let header =
            first_old_path(&text).ok_or_else(|| PatchError::Malformed(path.to_path_buf()))?;
        let strip = strip_count(header, &stem).ok_or_else(|| PatchError::StripCount {
            path: path.to_path_buf(),
            stem: stem.clone(),
            header: header.to_owned(),
        })?;
        debug!("patch file relative strip is {strip}");
        Ok(Self {
            path: path.to_path_buf(),
            strip,
        })
    }

    /// Directory the tool runs in.
    #[must_use]
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// The path on the first line starting with `--- `, up to whitespace.
#[must_use]
pub fn first_old_path(text: &str) -> Option<&str> {
    text.lines()
        .find_map(|line| line.strip_prefix("--- "))
        .and_then(|rest| rest.split_whitespace().next())
}

/// Index of the first `/`-separated component of `header` equal to `stem`.
#[must_use]
pub fn strip_count(header: &str, stem: &str) -> Option<usize> {
    header.split('/').position(|component| component == stem)
}

/// Drives the external patch tool.
#[derive(Clone, Debug)]
pub struct PatchTool {
    program: String,
    timeout: Duration,
}

impl Default for PatchTool {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl PatchTool {
    /// Use [`PATCH_PROGRAM`] with the given per-invocation timeout.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self::with_program(PATCH_PROGRAM, timeout)
    }

    /// Use a specific executable.
    #[must_use]
    pub fn with_program(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    fn command(&self, patch: &Patch) -> ToolCommand {
        let noise = if tracing::enabled!(Level::DEBUG) {
            "--verbose"
        } else {
            "--quiet"
        };
        ToolCommand::new(&self.program)
            .args(["-p".to_owned(), patch.strip.to_string(), "-i".to_owned()])
            .arg(patch.path.to_string_lossy())
            .args(["--binary", noise])
            .current_dir(patch.dir())
            .timeout(self.timeout)
    }

    /// Decide integration with a reverse dry-run. A tool that cannot be run
    /// at all is an error, not "not integrated".
    pub fn state(&self, patch: &Patch) -> Result<PatchState, PatchError> {
        let output = self
            .command(patch)
            .args(["--reverse", "--dry-run", "--force"])
            .output()?;
        Ok(if output.success() {
            PatchState::Integrated
        } else {
            PatchState::NotIntegrated
        })
    }

    /// Apply `patch` unless it is already integrated.
    #[instrument(skip_all, fields(patch = %patch.path.display()))]
    pub fn apply(&self, patch: &Patch) -> Result<PatchOutcome, PatchError> {
        info!("Applying {}", patch.path.display());
        if self.state(patch)? == PatchState::Integrated {
            info!(
                "{} already integrated, no need to patch",
                patch.path.display()
            );
            return Ok(PatchOutcome::AlreadyIntegrated);
        }
        let dry_run = self.command(patch).arg("--dry-run").output()?;
        if !dry_run.success() {
            return Err(PatchError::NotClean {
                patch: patch.path.clone(),
                dir: patch.dir().to_path_buf(),
            });
        }
        self.command(patch).run()?;
        info!(
            "Successfully applied {} to {}",
            patch.path.display(),
            patch.dir().display()
        );
        Ok(PatchOutcome::Applied)
    }

    /// Revert `patch` if it is integrated.
    #[instrument(skip_all, fields(patch = %patch.path.display()))]
    pub fn revert(&self, patch: &Patch) -> Result<PatchOutcome, PatchError> {
        info!("Reverting {}", patch.path.display());
        if self.state(patch)? == PatchState::NotIntegrated {
            info!(
                "{} is not integrated, nothing to revert",
                patch.path.display()
            );
            return Ok(PatchOutcome::AlreadyReverted);
        }
        self.command(patch).args(["--reverse", "--force"]).run()?;
        info!(
            "Successfully un-applied {} to {}",
            patch.path.display(),
            patch.dir().display()
        );
        Ok(PatchOutcome::Reverted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    const README_PATCH: &str = "\
--- os/README\t2020-01-01 00:00:00
+++ os/README\t2020-01-01 00:00:00
@@ -1 +1,2 @@
 hello
+patched line
";

    #[test]
    fn first_old_path_stops_at_whitespace() {
        assert_eq!(first_old_path(README_PATCH), Some("os/README"));
        assert_eq!(first_old_path("diff only\n+++ b/x\n"), None);
    }

    #[test]
    fn strip_count_is_stem_position() {
        assert_eq!(strip_count("os/README", "os"), Some(0));
        let header = "a/Middleware/mbedtls/library/aes.c";
        assert_eq!(strip_count(header, "mbedtls"), Some(2));
        assert_eq!(strip_count("a/b/c", "zeta"), None);
    }

    #[test]
    fn load_derives_strip_from_file_stem() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("os.patch");
        fs::write(&path, README_PATCH).unwrap();
        let patch = Patch::load(&path).unwrap();
        assert_eq!(patch.strip, 0);
        assert_eq!(patch.dir(), dir.path());
    }

    #[test]
    fn load_rejects_headerless_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("os.patch");
        fs::write(&path, "not a diff\n").unwrap();
        assert!(matches!(Patch::load(&path), Err(PatchError::Malformed(_))));
    }

    #[test]
    fn load_rejects_unrelated_stem() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("other.patch");
        fs::write(&path, README_PATCH).unwrap();
        let err = Patch::load(&path).unwrap_err();
        assert!(matches!(err, PatchError::StripCount { .. }), "{err}");
    }

    #[test]
    fn missing_tool_is_an_error_not_a_state() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("os.patch");
        fs::write(&path, README_PATCH).unwrap();
        let patch = Patch::load(&path).unwrap();
        let tool = PatchTool::with_program("pal-no-such-patch-tool", DEFAULT_TIMEOUT);
        assert!(matches!(
            tool.state(&patch),
            Err(PatchError::Tool(ExecError::Spawn { .. }))
        ));
    }

    proptest! {
        #[test]
        fn strip_count_finds_stem_after_any_prefix(
            prefix in proptest::collection::vec("[a-z]{1,6}", 0..5),
            stem in "[A-Z][a-z]{0,6}",
            suffix in proptest::collection::vec("[a-z]{1,6}", 0..4),
        ) {
            let mut parts = prefix.clone();
            parts.push(stem.clone());
            parts.extend(suffix);
            let header = parts.join("/");
            prop_assert_eq!(strip_count(&header, &stem), Some(prefix.len()));
        }
    }
}
