//! Declarative target descriptions (`pal-platform.json`).
//!
//! The document maps target names to an OS element, a device element and
//! optional middleware elements, each of which may declare an origin
//! (`from`), a destination (`to`) and a patch. This module only describes
//! the shape of that document; the consistency rules (e.g. `from` and `to`
//! must appear together) are enforced when the element tree is built.
//!
//! JSON is the native format. Files ending in `.toml` are read as TOML with
//! the same schema. Every map in the document keeps its declaration order.

#![allow(clippy::missing_errors_doc)]

use std::fmt;
use std::fs;
use std::marker::PhantomData;
use std::path::Path;

use serde::Deserialize;
use serde::de::{self, Deserializer, MapAccess, Visitor};

use crate::error::ConfigError;

/// File name looked up when `--from-file` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "pal-platform.json";

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// Every target declared in a configuration document, in declaration order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlatformConfig {
    /// `(target name, declaration)` pairs.
    pub targets: Vec<(String, TargetDecl)>,
}

impl<'de> Deserialize<'de> for PlatformConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        ordered::deserialize(deserializer).map(|targets| Self { targets })
    }
}

impl PlatformConfig {
    /// Load and parse a configuration file, picking the format by extension.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let parsed = if path.extension().is_some_and(|ext| ext == "toml") {
            Self::from_toml_str(&text)
        } else {
            Self::from_json_str(&text)
        };
        parsed.map_err(|detail| ConfigError::Parse {
            path: path.to_path_buf(),
            detail,
        })
    }

    /// Parse a JSON document.
    pub fn from_json_str(text: &str) -> Result<Self, String> {
        serde_json::from_str(text).map_err(|e| e.to_string())
    }

    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| e.to_string())
    }

    /// Look up a target declaration by name.
    #[must_use]
    pub fn target(&self, name: &str) -> Option<&TargetDecl> {
        self.targets
            .iter()
            .find_map(|(key, decl)| (key == name).then_some(decl))
    }

    /// Declared target names, in declaration order.
    pub fn target_names(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(|(name, _)| name.as_str())
    }
}

// ---------------------------------------------------------------------------
// Targets and elements
// ---------------------------------------------------------------------------

/// One deployable target: its own element fields plus OS, device and
/// middleware.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TargetDecl {
    /// Fields the target shares with every element (origin, patch, ...).
    #[serde(flatten)]
    pub element: ElementDecl,

    /// The operating-system layer.
    pub os: ElementDecl,

    /// The device layer.
    pub device: ElementDecl,

    /// Middleware components keyed by name.
    #[serde(default, deserialize_with = "ordered::deserialize")]
    pub middleware: Vec<(String, ElementDecl)>,
}

/// A named, versioned node that may carry an origin and a patch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ElementDecl {
    /// Display name. Middleware defaults to its map key.
    #[serde(default)]
    pub name: Option<String>,

    /// Display-only version label.
    #[serde(default)]
    pub version: Option<String>,

    /// Display-only comment.
    #[serde(default)]
    pub comment: Option<String>,

    /// Patch file, relative to the engine root.
    #[serde(default)]
    pub patch_file: Option<String>,

    /// Where the sources come from.
    #[serde(default)]
    pub from: Option<SourceDecl>,

    /// Where the sources go, relative to the engine root.
    #[serde(default)]
    pub to: Option<String>,
}

/// An origin, discriminated by its `protocol` field.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "protocol", rename_all = "kebab-case")]
pub enum SourceDecl {
    /// A git repository at a branch, tag or commit.
    Git {
        /// Repository address.
        location: String,
        /// Branch, tag or 40-character commit hash.
        #[serde(default = "default_tag")]
        tag: String,
        /// Per-submodule overrides, keyed by submodule name.
        #[serde(default, deserialize_with = "ordered::deserialize")]
        submodules: Vec<(String, SubmoduleDecl)>,
    },
    /// A directory on the local filesystem.
    Local {
        /// Source directory.
        location: String,
    },
    /// A zip or tar archive to download and extract.
    RemoteArchive {
        /// Archive URL.
        location: String,
    },
    /// A set of files to download individually.
    RemoteFiles {
        /// File URLs; each is saved under its final path segment.
        location: Vec<String>,
    },
}

fn default_tag() -> String {
    "master".to_owned()
}

/// Override for one submodule of a git origin.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SubmoduleDecl {
    /// Replacement URL written into `.gitmodules`.
    #[serde(default)]
    pub overwrite_url: Option<String>,

    /// Replacement branch written into `.gitmodules`.
    #[serde(default)]
    pub overwrite_branch: Option<String>,
}

// ---------------------------------------------------------------------------
// Order-preserving maps
// ---------------------------------------------------------------------------

mod ordered {
    use super::{Deserialize, Deserializer, MapAccess, PhantomData, Visitor, de, fmt};

    /// Deserialize a map into `(key, value)` pairs in document order,
    /// rejecting duplicate keys.
    pub fn deserialize<'de, D, V>(deserializer: D) -> Result<Vec<(String, V)>, D::Error>
    where
        D: Deserializer<'de>,
        V: Deserialize<'de>,
    {
        deserializer.deserialize_map(OrderedVisitor(PhantomData))
    }

    struct OrderedVisitor<V>(PhantomData<V>);

    impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedVisitor<V> {
        type Value = Vec<(String, V)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut entries: Vec<(String, V)> = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((key, value)) = map.next_entry::<String, V>()? {
                if entries.iter().any(|(k, _)| *k == key) {
                    return Err(de::Error::custom(format_args!("duplicate key `{key}`")));
                }
                entries.push((key, value));
            }
            Ok(entries)
        }
    }
}
