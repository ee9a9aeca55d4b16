use std::io::{self, Write};
use std::path::Path;

use pal_git::{GitClient, TreeRef};
use tracing::info;

use crate::config::SubmoduleDecl;
use crate::error::OriginError;
use crate::sync;

/// A git repository pinned to a branch, tag or commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GitSource {
    /// Repository address.
    pub location: String,
    /// What to check out.
    pub reference: TreeRef,
    /// Per-submodule overrides, in declaration order.
    pub submodules: Vec<(String, SubmoduleOverride)>,
}

/// Replacement URL and/or branch for one submodule.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubmoduleOverride {
    /// Replacement URL.
    pub url: Option<String>,
    /// Replacement branch.
    pub branch: Option<String>,
}

impl SubmoduleOverride {
    /// Whether anything is overridden. Overridden submodules track their
    /// remote branch instead of the superproject's recorded commit.
    #[must_use]
    pub const fn is_set(&self) -> bool {
        self.url.is_some() || self.branch.is_some()
    }
}

impl From<&SubmoduleDecl> for SubmoduleOverride {
    fn from(decl: &SubmoduleDecl) -> Self {
        Self {
            url: decl.overwrite_url.clone(),
            branch: decl.overwrite_branch.clone(),
        }
    }
}

impl GitSource {
    pub(crate) fn new(
        location: &str,
        tag: &str,
        submodules: &[(String, SubmoduleDecl)],
    ) -> Self {
        Self {
            location: location.to_owned(),
            reference: TreeRef::parse(tag),
            submodules: submodules
                .iter()
                .map(|(name, decl)| (name.clone(), SubmoduleOverride::from(decl)))
                .collect(),
        }
    }

    pub(crate) fn render(&self, dest: &Path, out: &mut dyn Write) -> io::Result<()> {
        writeln!(
            out,
            "- Clone {} at {} to {}",
            self.location,
            self.reference,
            dest.display()
        )
    }

    pub(crate) fn fetch(
        &self,
        dest: &Path,
        name: &str,
        git: &dyn GitClient,
    ) -> Result<(), OriginError> {
        info!("Getting {name} from git");
        let outcome = sync::synchronize(git, self, dest)?;
        info!("{name}: {outcome:?}");
        Ok(())
    }
}
