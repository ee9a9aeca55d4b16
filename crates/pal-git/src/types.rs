//! Value types shared between the [`GitClient`](crate::GitClient) trait and
//! the engine.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

// ---------------------------------------------------------------------------
// TreeRef
// ---------------------------------------------------------------------------

/// What a version-control origin is pinned to.
///
/// A reference made of exactly 40 hex characters is a commit hash and is
/// checked out detached; anything else is treated as a branch or tag name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TreeRef {
    /// A branch or tag name.
    Branch(String),
    /// A full 40-character commit hash.
    Commit(String),
}

impl TreeRef {
    /// Classify a reference string from configuration.
    #[must_use]
    pub fn parse(reference: &str) -> Self {
        if is_commit_hash(reference) {
            Self::Commit(reference.to_owned())
        } else {
            Self::Branch(reference.to_owned())
        }
    }

    /// The reference as written in configuration.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Branch(name) | Self::Commit(name) => name,
        }
    }

    /// Whether this pins an exact commit.
    #[must_use]
    pub const fn is_commit(&self) -> bool {
        matches!(self, Self::Commit(_))
    }
}

impl fmt::Display for TreeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_commit_hash(s: &str) -> bool {
    s.len() == 40 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

// ---------------------------------------------------------------------------
// Repository names
// ---------------------------------------------------------------------------

static GIT_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(git://|ssh://|https?://|)(([^/:@]+)(:([^/:@]+))?@)?([^/:]+)[:/](.+?)(\.git|/?)$",
    )
    .expect("git URL pattern is valid")
});

/// Normalized repository name of a git remote address.
///
/// Strips the protocol, credentials, host and a trailing `.git` or `/`, so
/// `https://user:pw@github.com/org/repo.git` and `git@github.com:org/repo`
/// both yield `org/repo`. Addresses that do not look like URLs (plain local
/// paths) are returned unchanged.
#[must_use]
pub fn repo_name(url: &str) -> &str {
    GIT_URL
        .captures(url)
        .and_then(|caps| caps.get(7))
        .map_or(url, |m| m.as_str())
}
