//! Archive detection and extraction for remote-archive origins.
//!
//! The archive kind is decided from the file's leading bytes, never from
//! its name: download URLs frequently carry no usable extension.
//!
//! Magic bytes:
//! - Zip: `50 4b 03 04` (`PK\3\4`), or `50 4b 05 06` for an empty archive
//! - Gzip: `1f 8b`
//! - XZ: `fd 37 7a 58 5a 00`
//! - Plain tar: `ustar` at offset 257

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;
use tracing::{debug, info};
use xz2::read::XzDecoder;

use crate::error::OriginError;
use crate::tree::{self, ScratchDir};

/// Bytes needed to recognize every supported format.
const HEADER_LEN: usize = 512;

/// Supported archive containers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArchiveKind {
    /// Zip archive.
    Zip,
    /// Uncompressed tar.
    Tar,
    /// Gzip-compressed tar.
    TarGz,
    /// XZ-compressed tar.
    TarXz,
}

impl ArchiveKind {
    /// Identify an archive from its first bytes.
    #[must_use]
    pub fn from_magic_bytes(header: &[u8]) -> Option<Self> {
        if header.starts_with(b"PK\x03\x04") || header.starts_with(b"PK\x05\x06") {
            Some(Self::Zip)
        } else if header.starts_with(&[0x1f, 0x8b]) {
            Some(Self::TarGz)
        } else if header.starts_with(&[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00]) {
            Some(Self::TarXz)
        } else if header.get(257..262) == Some(b"ustar") {
            Some(Self::Tar)
        } else {
            None
        }
    }

    /// Identify the archive stored at `path`.
    ///
    /// # Errors
    ///
    /// Any error reading the first bytes of the file.
    pub fn detect(path: &Path) -> io::Result<Option<Self>> {
        let mut header = Vec::with_capacity(HEADER_LEN);
        File::open(path)?
            .take(HEADER_LEN as u64)
            .read_to_end(&mut header)?;
        Ok(Self::from_magic_bytes(&header))
    }

    /// Human-readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::Tar => "tar",
            Self::TarGz => "tar.gz",
            Self::TarXz => "tar.xz",
        }
    }
}

/// Extract `archive` into `destination`.
///
/// When the archive holds a single top-level directory, that directory's
/// contents become the destination (which is replaced wholesale), so the
/// destination never gains a redundant nested folder. Otherwise every entry
/// is extracted directly into the destination.
///
/// Entries are unpacked into a staging directory beside the archive first;
/// it is removed on every exit path, read-only entries included.
///
/// # Errors
///
/// [`OriginError::UnknownArchive`] when the content matches no supported
/// format, [`OriginError::Extract`] when unpacking fails, and
/// [`OriginError::Io`] for staging or copy failures.
pub fn extract(archive: &Path, destination: &Path) -> Result<(), OriginError> {
    let kind = ArchiveKind::detect(archive)
        .map_err(OriginError::io(archive))?
        .ok_or_else(|| OriginError::UnknownArchive(archive.to_path_buf()))?;
    debug!("{} is a {} archive", archive.display(), kind.name());

    let parent = archive
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let staging = ScratchDir::new_in(parent).map_err(OriginError::io(parent))?;
    unpack(kind, archive, staging.path())?;

    match single_root_dir(staging.path()).map_err(OriginError::io(staging.path()))? {
        Some(root) => {
            info!(
                "Lifting {} contents into {}",
                root.file_name().unwrap_or_default().to_string_lossy(),
                destination.display()
            );
            if destination.exists() {
                tree::remove(destination).map_err(OriginError::io(destination))?;
            }
            tree::copy(&root, destination).map_err(OriginError::io(destination))
        }
        None => tree::copy(staging.path(), destination).map_err(OriginError::io(destination)),
    }
}

fn unpack(kind: ArchiveKind, archive: &Path, into: &Path) -> Result<(), OriginError> {
    let file = File::open(archive).map_err(OriginError::io(archive))?;
    let result = match kind {
        ArchiveKind::Zip => zip::ZipArchive::new(file)
            .and_then(|mut zip| zip.extract(into))
            .map_err(io::Error::other),
        ArchiveKind::Tar => Archive::new(file).unpack(into),
        ArchiveKind::TarGz => Archive::new(GzDecoder::new(file)).unpack(into),
        ArchiveKind::TarXz => Archive::new(XzDecoder::new(file)).unpack(into),
    };
    result.map_err(|source| OriginError::Extract {
        path: archive.to_path_buf(),
        source,
    })
}

/// The sole top-level entry of `dir`, if it is a directory.
fn single_root_dir(dir: &Path) -> io::Result<Option<PathBuf>> {
    let mut entries = fs::read_dir(dir)?;
    let Some(first) = entries.next().transpose()? else {
        return Ok(None);
    };
    if entries.next().is_some() || !first.file_type()?.is_dir() {
        return Ok(None);
    }
    Ok(Some(first.path()))
}
