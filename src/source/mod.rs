//! Origins: where an element's sources come from.
//!
//! A closed set of providers, picked by the `protocol` field of the
//! configuration. Each one can describe what it would do
//! ([`Source::render`]) and do it ([`Source::fetch`]).

#![allow(clippy::missing_errors_doc)]

mod archive;
mod files;
mod git;
mod local;

use std::io::{self, Write};
use std::path::Path;

pub use archive::ArchiveSource;
pub use files::FileSetSource;
pub use git::{GitSource, SubmoduleOverride};
pub use local::LocalSource;

use crate::config::SourceDecl;
use crate::context::Toolbox;
use crate::error::OriginError;

/// A configured origin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Source {
    /// A git repository.
    Git(GitSource),
    /// A local directory copied wholesale.
    Local(LocalSource),
    /// A downloaded zip or tar archive.
    RemoteArchive(ArchiveSource),
    /// Individually downloaded files.
    RemoteFiles(FileSetSource),
}

impl Source {
    /// Build a provider from its declaration. Relative local paths are
    /// resolved against `root`.
    #[must_use]
    pub fn from_decl(decl: &SourceDecl, root: &Path) -> Self {
        match decl {
            SourceDecl::Git {
                location,
                tag,
                submodules,
            } => Self::Git(GitSource::new(location, tag, submodules)),
            SourceDecl::Local { location } => Self::Local(LocalSource::new(root.join(location))),
            SourceDecl::RemoteArchive { location } => {
                Self::RemoteArchive(ArchiveSource::new(location.clone()))
            }
            SourceDecl::RemoteFiles { location } => {
                Self::RemoteFiles(FileSetSource::new(location.clone()))
            }
        }
    }

    /// Write one instruction line per origin location.
    pub fn render(&self, dest: &Path, out: &mut dyn Write) -> io::Result<()> {
        match self {
            Self::Git(source) => source.render(dest, out),
            Self::Local(source) => source.render(dest, out),
            Self::RemoteArchive(source) => source.render(dest, out),
            Self::RemoteFiles(source) => source.render(dest, out),
        }
    }

    /// Populate `dest` from this origin. `name` identifies the element in
    /// log messages.
    pub fn fetch(&self, dest: &Path, name: &str, tools: &Toolbox) -> Result<(), OriginError> {
        match self {
            Self::Git(source) => source.fetch(dest, name, tools.git.as_ref()),
            Self::Local(source) => source.fetch(dest, name),
            Self::RemoteArchive(source) => source.fetch(dest, name),
            Self::RemoteFiles(source) => source.fetch(dest, name),
        }
    }

    /// Whether `dest` is a working copy the engine commits into.
    #[must_use]
    pub const fn is_version_control(&self) -> bool {
        matches!(self, Self::Git(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SubmoduleDecl;

    fn rendered(source: &Source, dest: &str) -> String {
        let mut out = Vec::new();
        source.render(Path::new(dest), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn every_protocol_renders_its_action() {
        let root = Path::new("/work/pal-platform");

        let git = Source::from_decl(
            &SourceDecl::Git {
                location: "https://github.com/ARMmbed/mbed-os.git".to_owned(),
                tag: "mbed-os-5.15.0".to_owned(),
                submodules: vec![("drivers".to_owned(), SubmoduleDecl::default())],
            },
            root,
        );
        assert_eq!(
            rendered(&git, "/dst/os"),
            "- Clone https://github.com/ARMmbed/mbed-os.git at mbed-os-5.15.0 to /dst/os\n"
        );
        assert!(git.is_version_control());

        let local = Source::from_decl(
            &SourceDecl::Local {
                location: "fixtures/os".to_owned(),
            },
            root,
        );
        assert_eq!(
            rendered(&local, "/dst/os"),
            "- Copy /work/pal-platform/fixtures/os to /dst/os\n"
        );
        assert!(!local.is_version_control());

        let archive = Source::from_decl(
            &SourceDecl::RemoteArchive {
                location: "https://example.com/tls.tar.gz".to_owned(),
            },
            root,
        );
        assert_eq!(
            rendered(&archive, "/dst/tls"),
            "- Download https://example.com/tls.tar.gz and extract to /dst/tls\n"
        );

        let files = Source::from_decl(
            &SourceDecl::RemoteFiles {
                location: vec![
                    "https://example.com/a.h".to_owned(),
                    "https://example.com/b.c".to_owned(),
                ],
            },
            root,
        );
        assert_eq!(
            rendered(&files, "/dst/f"),
            "- Download https://example.com/a.h to /dst/f\n\
             - Download https://example.com/b.c to /dst/f\n"
        );
    }

    #[test]
    fn absolute_local_location_is_kept() {
        let local = Source::from_decl(
            &SourceDecl::Local {
                location: "/opt/zeta".to_owned(),
            },
            Path::new("/work"),
        );
        let Source::Local(local) = local else {
            panic!("expected local source");
        };
        assert_eq!(local.location, Path::new("/opt/zeta"));
    }
}
