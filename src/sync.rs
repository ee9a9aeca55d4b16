//! Version-control synchronization: first clone vs. incremental update.
//!
//! An existing working copy is only ever fast-forwarded. A working copy that
//! tracks a different repository, or whose history has diverged from its
//! upstream, is reported and left untouched.

#![allow(clippy::missing_errors_doc)]

use std::path::{Path, PathBuf};

use pal_git::{GitClient, GitError, TreeRef, repo_name};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::source::GitSource;

/// Manifest rewritten by submodule overrides.
const GITMODULES: &str = ".gitmodules";

/// Synchronization conflicts and git failures.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The working copy was cloned from a different repository.
    #[error(
        "trying to update {} from a different remote ({expected}), it tracks {actual}",
        dest.display()
    )]
    RemoteMismatch {
        /// The working copy.
        dest: PathBuf,
        /// The configured origin.
        expected: String,
        /// The origin recorded in the working copy.
        actual: String,
    },

    /// Local and upstream history both moved past their merge-base.
    #[error("local and remote repositories of {} have diverged", dest.display())]
    Diverged {
        /// The working copy.
        dest: PathBuf,
    },

    /// A git command failed.
    #[error(transparent)]
    Git(#[from] GitError),
}

/// What [`synchronize`] did to the working copy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncOutcome {
    /// A fresh clone was made.
    Cloned,
    /// An existing working copy was moved to the requested reference.
    CheckedOut,
    /// The branch already matched its upstream.
    UpToDate,
    /// The branch was fast-forwarded from its upstream.
    Pulled,
    /// The branch has unpushed commits; nothing was pulled.
    LocalAhead,
}

/// Relationship between a branch and its upstream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PullDecision {
    /// HEAD is detached; there is nothing to pull into.
    Detached,
    /// Local equals upstream.
    UpToDate,
    /// Local is an ancestor of upstream.
    Required,
    /// Upstream is an ancestor of local.
    LocalAhead,
    /// Neither is an ancestor of the other.
    Diverged,
}

impl PullDecision {
    /// Classify from the local, upstream and merge-base commit hashes.
    #[must_use]
    pub fn classify(local: &str, upstream: &str, base: &str) -> Self {
        if local == upstream {
            Self::UpToDate
        } else if local == base {
            Self::Required
        } else if upstream == base {
            Self::LocalAhead
        } else {
            Self::Diverged
        }
    }
}

/// Whether `dir` holds a git working copy.
#[must_use]
pub fn is_work_tree(dir: &Path) -> bool {
    dir.is_dir() && dir.join(".git").exists()
}

/// Bring `dest` to `origin`'s reference, cloning when it is not yet a
/// working copy, then apply any submodule overrides.
#[instrument(skip_all, fields(dest = %dest.display(), reference = %origin.reference))]
pub fn synchronize(
    git: &dyn GitClient,
    origin: &GitSource,
    dest: &Path,
) -> Result<SyncOutcome, SyncError> {
    let outcome = if is_work_tree(dest) {
        update(git, origin, dest)?
    } else {
        clone(git, origin, dest)?;
        SyncOutcome::Cloned
    };

    if !origin.submodules.is_empty() {
        sync_submodules(git, origin, dest)?;
    }
    Ok(outcome)
}

fn clone(git: &dyn GitClient, origin: &GitSource, dest: &Path) -> Result<(), SyncError> {
    info!(
        "Cloning from {} at {} to {}",
        origin.location,
        origin.reference,
        dest.display()
    );
    git.clone_repo(&origin.location, &origin.reference, dest)?;
    git.set_config(dest, "core.longpaths", "true")?;
    if let TreeRef::Commit(hash) = &origin.reference {
        git.set_config(dest, "advice.detachedHead", "false")?;
        git.checkout(dest, hash)?;
    }
    Ok(())
}

fn update(git: &dyn GitClient, origin: &GitSource, dest: &Path) -> Result<SyncOutcome, SyncError> {
    info!(
        "{} already exists, updating from {}",
        dest.display(),
        origin.location
    );
    let recorded = git.remote_url(dest)?;
    if repo_name(&recorded) != repo_name(&origin.location) {
        return Err(SyncError::RemoteMismatch {
            dest: dest.to_path_buf(),
            expected: origin.location.clone(),
            actual: recorded,
        });
    }

    git.fetch_all(dest)?;

    let branch = match &origin.reference {
        TreeRef::Commit(hash) => {
            info!("Checking out from {} at {hash}", origin.location);
            git.checkout(dest, hash)?;
            return Ok(SyncOutcome::CheckedOut);
        }
        TreeRef::Branch(branch) => branch,
    };

    let switched = git.current_branch(dest)?.as_deref() != Some(branch.as_str());
    if switched {
        info!("Checking out from {} at {branch}", origin.location);
        git.checkout(dest, branch)?;
    }

    let outcome = match pull_decision(git, dest)? {
        PullDecision::Required => {
            git.pull_rebase(dest)?;
            SyncOutcome::Pulled
        }
        PullDecision::Diverged => {
            return Err(SyncError::Diverged {
                dest: dest.to_path_buf(),
            });
        }
        PullDecision::LocalAhead => {
            warn!(
                "There are local commits - do not forget to push {}",
                dest.display()
            );
            SyncOutcome::LocalAhead
        }
        PullDecision::UpToDate => {
            info!("{} is up-to-date with {branch}", dest.display());
            if switched {
                SyncOutcome::CheckedOut
            } else {
                SyncOutcome::UpToDate
            }
        }
        PullDecision::Detached => SyncOutcome::CheckedOut,
    };
    Ok(outcome)
}

/// Decide whether the checked-out branch needs pulling.
pub fn pull_decision(git: &dyn GitClient, repo: &Path) -> Result<PullDecision, SyncError> {
    debug!("Check if git pull required for {}", repo.display());
    if git.current_branch(repo)?.is_none() {
        return Ok(PullDecision::Detached);
    }
    let local = git.rev_parse(repo, "@")?;
    let upstream = git.rev_parse(repo, "@{upstream}")?;
    let base = git.merge_base(repo, "@", "@{upstream}")?;
    Ok(PullDecision::classify(&local, &upstream, &base))
}

fn sync_submodules(git: &dyn GitClient, origin: &GitSource, dest: &Path) -> Result<(), SyncError> {
    // Overrides from an earlier run must not stack.
    git.restore_path(dest, GITMODULES)?;

    for (name, overrides) in &origin.submodules {
        let url_key = format!("submodule.{name}.url");
        let branch_key = format!("submodule.{name}.branch");
        if let Some(url) = &overrides.url {
            git.set_file_config(dest, GITMODULES, &url_key, url)?;
        }
        if let Some(branch) = &overrides.branch {
            git.set_file_config(dest, GITMODULES, &branch_key, branch)?;
        }

        git.submodule_sync(dest, name)?;

        let url = git
            .file_config(dest, GITMODULES, &url_key)?
            .unwrap_or_default();
        let remote = overrides.is_set();
        if remote {
            let branch = git
                .file_config(dest, GITMODULES, &branch_key)?
                .unwrap_or_default();
            warn!(
                "Updating submodule '{name}' from {url} at '{branch}' remote branch HEAD"
            );
        } else {
            info!(
                "Updating submodule '{name}' from {url} at superproject's committed hash"
            );
        }
        git.submodule_update(dest, name, remote)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SubmoduleOverride;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use tempfile::TempDir;

    /// Records every call; answers queries from a script.
    #[derive(Default)]
    struct FakeGit {
        calls: RefCell<Vec<String>>,
        remote: String,
        branch: Option<String>,
        revs: HashMap<&'static str, &'static str>,
        base: &'static str,
    }

    impl FakeGit {
        fn on_branch(
            remote: &str,
            branch: &str,
            local: &'static str,
            upstream: &'static str,
            base: &'static str,
        ) -> Self {
            Self {
                remote: remote.to_owned(),
                branch: Some(branch.to_owned()),
                revs: HashMap::from([("@", local), ("@{upstream}", upstream)]),
                base,
                ..Self::default()
            }
        }

        fn record(&self, call: impl Into<String>) {
            self.calls.borrow_mut().push(call.into());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }

        fn count(&self, prefix: &str) -> usize {
            self.calls
                .borrow()
                .iter()
                .filter(|c| c.starts_with(prefix))
                .count()
        }
    }

    impl GitClient for FakeGit {
        fn clone_repo(&self, url: &str, reference: &TreeRef, _dest: &Path) -> Result<(), GitError> {
            self.record(format!("clone {url} {reference}"));
            Ok(())
        }
        fn set_config(&self, _repo: &Path, key: &str, value: &str) -> Result<(), GitError> {
            self.record(format!("config {key} {value}"));
            Ok(())
        }
        fn file_config(
            &self,
            _repo: &Path,
            file: &str,
            key: &str,
        ) -> Result<Option<String>, GitError> {
            self.record(format!("file-config {file} {key}"));
            Ok(Some("https://example.com/sub.git".to_owned()))
        }
        fn set_file_config(
            &self,
            _repo: &Path,
            file: &str,
            key: &str,
            value: &str,
        ) -> Result<(), GitError> {
            self.record(format!("set-file-config {file} {key} {value}"));
            Ok(())
        }
        fn checkout(&self, _repo: &Path, target: &str) -> Result<(), GitError> {
            self.record(format!("checkout {target}"));
            Ok(())
        }
        fn restore_path(&self, _repo: &Path, path: &str) -> Result<(), GitError> {
            self.record(format!("restore {path}"));
            Ok(())
        }
        fn remote_url(&self, _repo: &Path) -> Result<String, GitError> {
            self.record("remote-url");
            Ok(self.remote.clone())
        }
        fn fetch_all(&self, _repo: &Path) -> Result<(), GitError> {
            self.record("fetch");
            Ok(())
        }
        fn pull_rebase(&self, _repo: &Path) -> Result<(), GitError> {
            self.record("pull");
            Ok(())
        }
        fn current_branch(&self, _repo: &Path) -> Result<Option<String>, GitError> {
            self.record("current-branch");
            Ok(self.branch.clone())
        }
        fn rev_parse(&self, _repo: &Path, spec: &str) -> Result<String, GitError> {
            self.record(format!("rev-parse {spec}"));
            Ok(self.revs.get(spec).copied().unwrap_or_default().to_owned())
        }
        fn merge_base(&self, _repo: &Path, a: &str, b: &str) -> Result<String, GitError> {
            self.record(format!("merge-base {a} {b}"));
            Ok(self.base.to_owned())
        }
        fn submodule_sync(&self, _repo: &Path, name: &str) -> Result<(), GitError> {
            self.record(format!("submodule-sync {name}"));
            Ok(())
        }
        fn submodule_update(&self, _repo: &Path, name: &str, remote: bool) -> Result<(), GitError> {
            self.record(format!("submodule-update {name} remote={remote}"));
            Ok(())
        }
        fn add_all(&self, _repo: &Path) -> Result<(), GitError> {
            self.record("add");
            Ok(())
        }
        fn commit(&self, _repo: &Path, message: &str) -> Result<(), GitError> {
            self.record(format!("commit {message}"));
            Ok(())
        }
    }

    const URL: &str = "https://github.com/ARMmbed/mbed-os.git";
    const HASH: &str = "0123456789abcdef0123456789abcdef01234567";

    fn origin(reference: &str) -> GitSource {
        GitSource {
            location: URL.to_owned(),
            reference: TreeRef::parse(reference),
            submodules: Vec::new(),
        }
    }

    fn work_tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        dir
    }

    #[test]
    fn classify_covers_every_relationship() {
        use PullDecision::{Diverged, LocalAhead, Required, UpToDate};

        assert_eq!(PullDecision::classify("a", "a", "a"), UpToDate);
        assert_eq!(PullDecision::classify("a", "b", "a"), Required);
        assert_eq!(PullDecision::classify("b", "a", "a"), LocalAhead);
        assert_eq!(PullDecision::classify("b", "c", "a"), Diverged);
    }

    #[test]
    fn branch_clone_sets_longpaths_only() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("mbed-os");
        let git = FakeGit::default();

        let outcome = synchronize(&git, &origin("mbed-os-5.15.0"), &dest).unwrap();

        assert_eq!(outcome, SyncOutcome::Cloned);
        assert_eq!(
            git.calls(),
            [
                format!("clone {URL} mbed-os-5.15.0"),
                "config core.longpaths true".to_owned(),
            ]
        );
    }

    #[test]
    fn commit_clone_checks_out_detached() {
        let dir = TempDir::new().unwrap();
        let git = FakeGit::default();

        synchronize(&git, &origin(HASH), &dir.path().join("repo")).unwrap();

        assert_eq!(
            git.calls(),
            [
                format!("clone {URL} {HASH}"),
                "config core.longpaths true".to_owned(),
                "config advice.detachedHead false".to_owned(),
                format!("checkout {HASH}"),
            ]
        );
    }

    #[test]
    fn up_to_date_branch_fetches_once_and_never_pulls() {
        let dir = work_tree();
        let git = FakeGit::on_branch(URL, "master", "aaa", "aaa", "aaa");

        let outcome = synchronize(&git, &origin("master"), dir.path()).unwrap();

        assert_eq!(outcome, SyncOutcome::UpToDate);
        assert_eq!(git.count("fetch"), 1);
        assert_eq!(git.count("pull"), 0);
        assert_eq!(git.count("checkout"), 0);
    }

    #[test]
    fn behind_branch_pulls_exactly_once() {
        let dir = work_tree();
        let git = FakeGit::on_branch(URL, "master", "aaa", "bbb", "aaa");

        let outcome = synchronize(&git, &origin("master"), dir.path()).unwrap();

        assert_eq!(outcome, SyncOutcome::Pulled);
        assert_eq!(git.count("fetch"), 1);
        assert_eq!(git.count("pull"), 1);
    }

    #[test]
    fn local_ahead_warns_and_skips_pull() {
        let dir = work_tree();
        let git = FakeGit::on_branch(URL, "master", "bbb", "aaa", "aaa");

        let outcome = synchronize(&git, &origin("master"), dir.path()).unwrap();

        assert_eq!(outcome, SyncOutcome::LocalAhead);
        assert_eq!(git.count("pull"), 0);
    }

    #[test]
    fn diverged_history_fails_without_further_operations() {
        let dir = work_tree();
        let git = FakeGit::on_branch(URL, "master", "bbb", "ccc", "aaa");

        let err = synchronize(&git, &origin("master"), dir.path()).unwrap_err();

        assert!(matches!(err, SyncError::Diverged { .. }), "{err}");
        assert_eq!(git.calls().last().unwrap(), "merge-base @ @{upstream}");
        assert_eq!(git.count("pull"), 0);
    }

    #[test]
    fn remote_mismatch_is_fatal_before_fetch() {
        let dir = work_tree();
        let git = FakeGit::on_branch("git@github.com:someone/other.git", "master", "a", "a", "a");

        let err = synchronize(&git, &origin("master"), dir.path()).unwrap_err();

        assert!(matches!(err, SyncError::RemoteMismatch { .. }), "{err}");
        assert_eq!(git.count("fetch"), 0);
    }

    #[test]
    fn equivalent_remote_forms_are_accepted() {
        let dir = work_tree();
        let git = FakeGit::on_branch("git@github.com:ARMmbed/mbed-os", "master", "a", "a", "a");
        synchronize(&git, &origin("master"), dir.path()).unwrap();
        assert_eq!(git.count("fetch"), 1);
    }

    #[test]
    fn switching_branch_checks_out_then_checks_pull() {
        let dir = work_tree();
        let mut git = FakeGit::on_branch(URL, "master", "aaa", "aaa", "aaa");
        git.branch = Some("develop".to_owned());

        let outcome = synchronize(&git, &origin("master"), dir.path()).unwrap();

        assert_eq!(outcome, SyncOutcome::CheckedOut);
        assert_eq!(git.count("checkout master"), 1);
        assert_eq!(git.count("pull"), 0);
    }

    #[test]
    fn commit_update_checks_out_without_pull() {
        let dir = work_tree();
        let git = FakeGit::on_branch(URL, "master", "a", "b", "a");

        let outcome = synchronize(&git, &origin(HASH), dir.path()).unwrap();

        assert_eq!(outcome, SyncOutcome::CheckedOut);
        assert_eq!(git.count(&format!("checkout {HASH}")), 1);
        assert_eq!(git.count("rev-parse"), 0);
    }

    #[test]
    fn submodule_overrides_update_from_remote() {
        let dir = TempDir::new().unwrap();
        let git = FakeGit::default();
        let mut source = origin("master");
        source.submodules = vec![
            (
                "drivers".to_owned(),
                SubmoduleOverride {
                    url: None,
                    branch: Some("dev".to_owned()),
                },
            ),
            ("connectivity".to_owned(), SubmoduleOverride::default()),
        ];

        synchronize(&git, &source, &dir.path().join("repo")).unwrap();

        let calls = git.calls();
        let has = |call: &str| calls.iter().any(|c| c == call);
        let at = |call: &str| calls.iter().position(|c| c == call);
        let restore = at("restore .gitmodules");
        let branch_override = at("set-file-config .gitmodules submodule.drivers.branch dev");
        assert!(restore.is_some() && branch_override > restore, "{calls:?}");
        assert!(has("submodule-sync drivers"));
        assert!(has("submodule-update drivers remote=true"));
        assert!(has("submodule-update connectivity remote=false"));
        let connectivity_url = "submodule.connectivity.url ";
        assert!(!calls.iter().any(|c| c.contains(connectivity_url)));
    }
}
