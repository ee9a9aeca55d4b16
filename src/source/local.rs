use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::OriginError;
use crate::tree;

/// A directory on the local filesystem.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalSource {
    /// Directory to copy from.
    pub location: PathBuf,
}

impl LocalSource {
    pub(crate) const fn new(location: PathBuf) -> Self {
        Self { location }
    }

    pub(crate) fn render(&self, dest: &Path, out: &mut dyn Write) -> io::Result<()> {
        writeln!(
            out,
            "- Copy {} to {}",
            self.location.display(),
            dest.display()
        )
    }

    /// Replace `dest` with a copy of the source directory. A failed copy
    /// leaves no partial destination behind.
    pub(crate) fn fetch(&self, dest: &Path, name: &str) -> Result<(), OriginError> {
        if !self.location.is_dir() {
            return Err(OriginError::MissingLocalPath(self.location.clone()));
        }
        info!(
            "Copying {name} from local folder {} to {}",
            self.location.display(),
            dest.display()
        );
        if dest.is_dir() {
            warn!("{} already exists, overriding it..", dest.display());
            tree::remove(dest).map_err(OriginError::io(dest))?;
        }
        if let Err(source) = tree::copy(&self.location, dest) {
            if dest.exists() {
                // Best effort: the copy error is the one worth reporting.
                let _ = tree::remove(dest);
            }
            return Err(OriginError::Io {
                path: dest.to_path_buf(),
                source,
            });
        }
        Ok(())
    }
}
