//! Elements: the unit of fetch, delete and patch.

#![allow(clippy::missing_errors_doc)]

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use crate::config::ElementDecl;
use crate::context::Toolbox;
use crate::error::{ConfigError, DeployError};
use crate::patch::{Patch, PatchError, PatchOutcome};
use crate::source::Source;
use crate::tree;

/// Identity used for patch commits.
const BOT_NAME: &str = "pal-platform";
const BOT_EMAIL: &str = "<>";

/// An origin together with the directory it populates. An element has both
/// or neither.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Origin {
    /// Where the sources come from.
    pub source: Source,
    /// Where they go.
    pub destination: PathBuf,
}

/// A named, versioned node of a target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    /// Display name.
    pub name: String,
    /// Display-only version label.
    pub version: Option<String>,
    /// Display-only comment.
    pub comment: Option<String>,
    /// Patch file, resolved against the engine root.
    pub patch_file: Option<PathBuf>,
    /// Origin and destination, absent for purely descriptive nodes.
    pub origin: Option<Origin>,
}

impl Element {
    /// Build an element from its declaration.
    ///
    /// `default_name` is used when the declaration has no `name` (the map
    /// key for middleware, the target name for a target). Relative paths
    /// are resolved against `root`.
    pub fn from_decl(
        decl: &ElementDecl,
        default_name: Option<&str>,
        root: &Path,
    ) -> Result<Self, ConfigError> {
        let name = decl
            .name
            .as_deref()
            .or(default_name)
            .ok_or_else(|| ConfigError::MissingField {
                element: default_name.unwrap_or("element").to_owned(),
                field: "name",
            })?
            .to_owned();

        let origin = match (&decl.from, &decl.to) {
            (Some(from), Some(to)) => Some(Origin {
                source: Source::from_decl(from, root),
                destination: root.join(to),
            }),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::MissingField {
                    element: name,
                    field: "to",
                });
            }
            (None, Some(_)) => {
                return Err(ConfigError::MissingField {
                    element: name,
                    field: "from",
                });
            }
        };

        Ok(Self {
            name,
            version: decl.version.clone(),
            comment: decl.comment.clone(),
            patch_file: decl.patch_file.as_ref().map(|p| root.join(p)),
            origin,
        })
    }

    /// The destination directory, if the element has an origin.
    #[must_use]
    pub fn destination(&self) -> Option<&Path> {
        self.origin.as_ref().map(|o| o.destination.as_path())
    }

    /// True when the element has a destination that is not a directory yet.
    #[must_use]
    pub fn is_fetch_needed(&self) -> bool {
        self.destination().is_some_and(|dest| !dest.is_dir())
    }

    /// Populate the destination from the origin. No-op without an origin.
    #[instrument(skip_all, fields(element = %self.name))]
    pub fn fetch(&self, tools: &Toolbox) -> Result<(), DeployError> {
        let Some(origin) = &self.origin else {
            return Ok(());
        };
        origin
            .source
            .fetch(&origin.destination, &self.name, tools)
            .map_err(|source| DeployError::Fetch {
                element: self.name.clone(),
                source,
            })
    }

    /// Remove the destination tree, read-only entries included.
    pub fn delete(&self) -> Result<(), DeployError> {
        let Some(dest) = self.destination().filter(|d| d.is_dir()) else {
            return Ok(());
        };
        info!("Deleting {}", dest.display());
        tree::remove(dest).map_err(DeployError::io(dest))
    }

    /// Apply the element's patch unless already integrated.
    ///
    /// When the patch is applied on top of a git working copy, the change is
    /// committed so later synchronizations see a clean tree.
    #[instrument(skip_all, fields(element = %self.name))]
    pub fn apply_patch(&self, tools: &Toolbox) -> Result<Option<PatchOutcome>, DeployError> {
        let Some(patch_file) = &self.patch_file else {
            return Ok(None);
        };
        let outcome = self.patch_then(patch_file, |patch| {
            let outcome = tools.patch.apply(patch)?;
            if outcome == PatchOutcome::Applied {
                self.record(tools, &format!("applied patch: {}", patch_file.display()))?;
            }
            Ok(outcome)
        })?;
        Ok(Some(outcome))
    }

    /// Revert the element's patch if it is integrated.
    #[instrument(skip_all, fields(element = %self.name))]
    pub fn revert_patch(&self, tools: &Toolbox) -> Result<Option<PatchOutcome>, DeployError> {
        let Some(patch_file) = &self.patch_file else {
            return Ok(None);
        };
        let outcome = self.patch_then(patch_file, |patch| {
            let outcome = tools.patch.revert(patch)?;
            if outcome == PatchOutcome::Reverted {
                self.record(tools, &format!("reverted patch: {}", patch_file.display()))?;
            }
            Ok(outcome)
        })?;
        Ok(Some(outcome))
    }

    fn patch_then(
        &self,
        patch_file: &Path,
        action: impl FnOnce(&Patch) -> Result<PatchOutcome, PatchError>,
    ) -> Result<PatchOutcome, DeployError> {
        Patch::load(patch_file)
            .and_then(|patch| action(&patch))
            .map_err(|source| DeployError::Patch {
                element: self.name.clone(),
                source,
            })
    }

    /// Commit the working tree when the origin is a git repository.
    fn record(&self, tools: &Toolbox, message: &str) -> Result<(), PatchError> {
        let Some(origin) = &self.origin else {
            return Ok(());
        };
        if !origin.source.is_version_control() {
            return Ok(());
        }
        let repo = origin.destination.as_path();
        tools.git.set_config(repo, "user.name", BOT_NAME)?;
        tools.git.set_config(repo, "user.email", BOT_EMAIL)?;
        tools.git.add_all(repo)?;
        tools.git.commit(repo, message)?;
        Ok(())
    }

    /// Write this element's deployment instructions. Elements without an
    /// origin write nothing.
    pub fn render(&self, out: &mut dyn Write) -> io::Result<()> {
        let Some(origin) = &self.origin else {
            return Ok(());
        };
        let version = self.version.as_deref().unwrap_or_default();
        let rule = "#".repeat(self.name.chars().count() + version.chars().count() + 5);
        writeln!(out)?;
        writeln!(out, "{rule}")?;
        writeln!(out, "# {} {version}", self.name)?;
        writeln!(out, "{rule}")?;
        if let Some(comment) = &self.comment {
            writeln!(out, "{comment}\n")?;
        }
        origin.source.render(&origin.destination, out)?;
        if let Some(patch) = &self.patch_file {
            writeln!(out, "- Apply patch {}", patch.display())?;
        }
        Ok(())
    }
}
