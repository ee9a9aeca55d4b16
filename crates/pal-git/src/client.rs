//! The [`GitClient`] trait: the boundary between the deployment engine and
//! version control.
//!
//! | Group       | Methods                                                   |
//! |-------------|-----------------------------------------------------------|
//! | Clone       | `clone_repo`                                              |
//! | Config      | `set_config`, `file_config`, `set_file_config`            |
//! | Checkout    | `checkout`, `restore_path`                                |
//! | Remotes     | `remote_url`, `fetch_all`, `pull_rebase`                  |
//! | Inspection  | `current_branch`, `rev_parse`, `merge_base`               |
//! | Submodules  | `submodule_sync`, `submodule_update`                      |
//! | Recording   | `add_all`, `commit`                                       |

#![allow(clippy::missing_errors_doc)]

use std::path::Path;

use crate::error::GitError;
use crate::types::TreeRef;

/// Version-control primitives the engine drives.
///
/// Every method except [`clone_repo`](Self::clone_repo) operates on an
/// existing working copy at `repo`.
///
/// # Object safety
///
/// This trait is object-safe. The engine holds a `Box<dyn GitClient>` so
/// tests can substitute a recording double.
pub trait GitClient {
    /// Clone `url` into `dest`.
    ///
    /// A [`TreeRef::Branch`] is cloned directly onto that branch; a
    /// [`TreeRef::Commit`] is cloned without checkout, leaving the caller to
    /// check the hash out explicitly.
    fn clone_repo(&self, url: &str, reference: &TreeRef, dest: &Path) -> Result<(), GitError>;

    /// Set a key in the repository's local configuration.
    fn set_config(&self, repo: &Path, key: &str, value: &str) -> Result<(), GitError>;

    /// Read `key` from a config-format file inside the working copy (e.g.
    /// `.gitmodules`). Returns `None` when the key is unset.
    fn file_config(&self, repo: &Path, file: &str, key: &str) -> Result<Option<String>, GitError>;

    /// Write `key` into a config-format file inside the working copy.
    fn set_file_config(
        &self,
        repo: &Path,
        file: &str,
        key: &str,
        value: &str,
    ) -> Result<(), GitError>;

    /// Check out a branch, tag or commit.
    fn checkout(&self, repo: &Path, target: &str) -> Result<(), GitError>;

    /// Discard working-tree changes to a single tracked path.
    fn restore_path(&self, repo: &Path, path: &str) -> Result<(), GitError>;

    /// The fetch URL of the default remote.
    fn remote_url(&self, repo: &Path) -> Result<String, GitError>;

    /// Fetch all remotes.
    fn fetch_all(&self, repo: &Path) -> Result<(), GitError>;

    /// Pull the current branch from its upstream, rebasing local commits.
    fn pull_rebase(&self, repo: &Path) -> Result<(), GitError>;

    /// Name of the checked-out branch, `None` when HEAD is detached.
    fn current_branch(&self, repo: &Path) -> Result<Option<String>, GitError>;

    /// Resolve a revision spec (`@`, `@{upstream}`, ...) to a commit hash.
    fn rev_parse(&self, repo: &Path, spec: &str) -> Result<String, GitError>;

    /// The best common ancestor of two revisions.
    fn merge_base(&self, repo: &Path, a: &str, b: &str) -> Result<String, GitError>;

    /// Re-synchronize a submodule's remote URL from `.gitmodules`.
    fn submodule_sync(&self, repo: &Path, name: &str) -> Result<(), GitError>;

    /// Initialize and update a submodule recursively.
    ///
    /// With `remote` set, the submodule moves to the head of its configured
    /// remote branch; otherwise to the commit recorded by the parent.
    fn submodule_update(&self, repo: &Path, name: &str, remote: bool) -> Result<(), GitError>;

    /// Stage every change in the working tree.
    fn add_all(&self, repo: &Path) -> Result<(), GitError>;

    /// Commit staged changes.
    fn commit(&self, repo: &Path, message: &str) -> Result<(), GitError>;
}
