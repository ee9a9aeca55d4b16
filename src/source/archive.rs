use std::io::{self, Write};
use std::path::Path;

use tracing::info;

use crate::download;
use crate::error::OriginError;
use crate::extract;
use crate::tree::ScratchDir;

/// Staged file name for the downloaded archive; its kind is sniffed from
/// content, so the name carries no extension.
const STAGED_NAME: &str = "download";

/// A zip or tar archive fetched over HTTP.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveSource {
    /// Archive URL.
    pub location: String,
}

impl ArchiveSource {
    pub(crate) const fn new(location: String) -> Self {
        Self { location }
    }

    pub(crate) fn render(&self, dest: &Path, out: &mut dyn Write) -> io::Result<()> {
        writeln!(
            out,
            "- Download {} and extract to {}",
            self.location,
            dest.display()
        )
    }

    pub(crate) fn fetch(&self, dest: &Path, name: &str) -> Result<(), OriginError> {
        let staging = ScratchDir::new().map_err(OriginError::io(dest))?;
        info!(
            "Downloading {name} from {} to {}",
            self.location,
            staging.path().display()
        );
        let archive = download::download(&self.location, staging.path(), STAGED_NAME)?;
        info!("Extracting {} to {}", archive.display(), dest.display());
        extract::extract(&archive, dest)
    }
}
