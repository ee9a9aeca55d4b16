//! Whole-directory filesystem helpers.

use std::fs::{self, Permissions};
use std::io;
use std::path::Path;

use tempfile::TempDir;
use tracing::warn;
use walkdir::WalkDir;

/// A temporary directory deleted with [`remove`] on drop.
///
/// `TempDir` alone gives up silently on read-only entries, which unpacked
/// archives and cloned object stores both produce.
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    /// Create a scratch directory under the system temp directory.
    ///
    /// # Errors
    ///
    /// Any error creating the directory.
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    /// Create a scratch directory inside `parent`.
    ///
    /// # Errors
    ///
    /// Any error creating the directory.
    pub fn new_in(parent: &Path) -> io::Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir_in(parent)?,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(e) = remove(self.dir.path()) {
            warn!("failed to remove {}: {e}", self.dir.path().display());
        }
    }
}

/// Recursively delete `path`, clearing read-only attributes first.
///
/// Version-control object stores and extracted archives routinely contain
/// read-only files and directories; those must not make a clean or a
/// re-fetch fail.
///
/// # Errors
///
/// Any error walking the tree, changing permissions or deleting.
pub fn remove(path: &Path) -> io::Result<()> {
    make_writable(path)?;
    fs::remove_dir_all(path)
}

/// Recursively copy the contents of `src` into `dst`, creating `dst` and any
/// missing directories. Existing files in `dst` are overwritten.
///
/// # Errors
///
/// Any error walking `src` or writing into `dst`.
pub fn copy(src: &Path, dst: &Path) -> io::Result<()> {
    for entry in WalkDir::new(src).follow_links(true) {
        let entry = entry?;
        let relative = entry.path().strip_prefix(src).map_err(io::Error::other)?;
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

fn make_writable(path: &Path) -> io::Result<()> {
    for entry in WalkDir::new(path) {
        let entry = entry?;
        if entry.path_is_symlink() {
            continue;
        }
        let mut permissions = entry.metadata()?.permissions();
        if permissions.readonly() {
            set_writable(&mut permissions);
            fs::set_permissions(entry.path(), permissions)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn set_writable(permissions: &mut Permissions) {
    use std::os::unix::fs::PermissionsExt as _;
    permissions.set_mode(permissions.mode() | 0o200);
}

#[cfg(not(unix))]
#[allow(clippy::permissions_set_readonly_false)]
fn set_writable(permissions: &mut Permissions) {
    permissions.set_readonly(false);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_preserves_nested_layout() {
        let src = TempDir::new().unwrap();
        fs::create_dir_all(src.path().join("a/b")).unwrap();
        fs::write(src.path().join("top.txt"), "top").unwrap();
        fs::write(src.path().join("a/b/deep.txt"), "deep").unwrap();

        let dst = TempDir::new().unwrap();
        let target = dst.path().join("out");
        copy(src.path(), &target).unwrap();

        assert_eq!(fs::read_to_string(target.join("top.txt")).unwrap(), "top");
        assert_eq!(
            fs::read_to_string(target.join("a/b/deep.txt")).unwrap(),
            "deep"
        );
    }

    #[test]
    fn remove_handles_read_only_entries() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("tree");
        let locked = root.join("locked");
        fs::create_dir_all(&locked).unwrap();
        let file = locked.join("file.txt");
        fs::write(&file, "x").unwrap();

        let mut perms = fs::metadata(&file).unwrap().permissions();
        perms.set_readonly(true);
        fs::set_permissions(&file, perms).unwrap();
        let mut perms = fs::metadata(&locked).unwrap().permissions();
        perms.set_readonly(true);
        fs::set_permissions(&locked, perms).unwrap();

        remove(&root).unwrap();
        assert!(!root.exists());
    }

    #[cfg(unix)]
    #[test]
    fn scratch_dir_drop_removes_read_only_tree() {
        use std::os::unix::fs::PermissionsExt as _;

        let parent = TempDir::new().unwrap();
        let scratch = ScratchDir::new_in(parent.path()).unwrap();
        let locked = scratch.path().join("pkg/ro");
        fs::create_dir_all(&locked).unwrap();
        fs::write(locked.join("f.txt"), "x").unwrap();
        fs::set_permissions(locked.join("f.txt"), Permissions::from_mode(0o444)).unwrap();
        fs::set_permissions(&locked, Permissions::from_mode(0o555)).unwrap();
        let path = scratch.path().to_path_buf();

        drop(scratch);

        assert!(!path.exists());
        assert_eq!(fs::read_dir(parent.path()).unwrap().count(), 0);
    }
}
