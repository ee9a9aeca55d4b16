//! Error types for the deployment engine.
//!
//! Errors are grouped by when they can happen:
//!
//! - [`ConfigError`]: detected while loading configuration and building the
//!   target tree, before any side effect.
//! - [`OriginError`]: an element's sources could not be brought onto disk.
//! - [`DeployError`]: the umbrella returned by tree-wide operations. It
//!   names the element that failed so the operator knows where to look.
//!
//! Synchronization conflicts and patch conflicts have their own enums in
//! [`crate::sync`] and [`crate::patch`]. Nothing in this crate retries.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::patch::PatchError;
use crate::sync::SyncError;

/// The declarative configuration is unreadable or inconsistent.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The configuration file is not valid JSON/TOML or does not match the
    /// target schema.
    #[error("malformed {} - {detail}", path.display())]
    Parse {
        /// Path to the configuration file.
        path: PathBuf,
        /// Parser message, including the offending location.
        detail: String,
    },

    /// A required field is missing, or `from`/`to` are not declared together.
    #[error("missing \"{field}\" field in {element}")]
    MissingField {
        /// Element (or target) name.
        element: String,
        /// The missing field.
        field: &'static str,
    },

    /// The requested target is not declared.
    #[error("unknown target '{name}', available targets: {}", available.join(", "))]
    UnknownTarget {
        /// What the operator asked for.
        name: String,
        /// Every declared target name, in declaration order.
        available: Vec<String>,
    },
}

/// An element's sources could not be fetched from its origin.
#[derive(Debug, Error)]
pub enum OriginError {
    /// A local-copy origin points at something that is not a directory.
    #[error("local source {} does not exist or is not a directory", .0.display())]
    MissingLocalPath(PathBuf),

    /// An HTTP download failed.
    #[error("download of {url} failed: {detail}")]
    Download {
        /// The URL being fetched.
        url: String,
        /// Transport error or HTTP status.
        detail: String,
    },

    /// A downloaded archive is neither zip nor (compressed) tar.
    #[error("{} has unknown archive type", .0.display())]
    UnknownArchive(PathBuf),

    /// A recognized archive could not be unpacked.
    #[error("failed to extract {}: {source}", path.display())]
    Extract {
        /// The archive on disk.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// Version-control synchronization failed.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// A filesystem operation on the destination failed.
    #[error("{}: {source}", path.display())]
    Io {
        /// The path being operated on.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl OriginError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

/// A tree-wide deployment operation failed.
#[derive(Debug, Error)]
pub enum DeployError {
    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Fetching a named element failed.
    #[error("failed to fetch {element}")]
    Fetch {
        /// The element that failed.
        element: String,
        /// Why.
        #[source]
        source: OriginError,
    },

    /// Applying or reverting a named element's patch failed.
    #[error("failed to patch {element}")]
    Patch {
        /// The element that failed.
        element: String,
        /// Why.
        #[source]
        source: PatchError,
    },

    /// The target has elements whose destinations are missing.
    #[error(
        "target {target} is not deployed, \
         please run \"pal-platform deploy --target {target}\" first"
    )]
    NotDeployed {
        /// The target name.
        target: String,
    },

    /// A filesystem operation failed.
    #[error("{}: {source}", path.display())]
    Io {
        /// The path being operated on.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl DeployError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}
