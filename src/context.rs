//! The explicit per-invocation context handed to every command.
//!
//! A [`PlatformContext`] owns the engine root, the parsed configuration and
//! the external tools. Target selection is two-phase: a raw name is first
//! validated into a [`TargetName`], and only a `TargetName` can be built into
//! a [`Target`] tree.

#![allow(clippy::missing_errors_doc)]

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use pal_git::exec::DEFAULT_TIMEOUT;
use pal_git::{CliGit, GitClient};

use crate::config::{DEFAULT_CONFIG_FILE, PlatformConfig};
use crate::error::ConfigError;
use crate::patch::PatchTool;
use crate::target::Target;

/// Prefix of the generated build-output directory name.
const OUTPUT_DIR_PREFIX: &str = "__";

/// External tools the engine drives.
pub struct Toolbox {
    /// Version control.
    pub git: Box<dyn GitClient>,
    /// The patch executable.
    pub patch: PatchTool,
}

impl Toolbox {
    /// The real `git` and `patch` executables, each call bounded by
    /// `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            git: Box::new(CliGit::new(timeout)),
            patch: PatchTool::new(timeout),
        }
    }
}

impl Default for Toolbox {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

/// A target name known to exist in the configuration.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TargetName(String);

impl TargetName {
    /// The name as declared.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything a command needs: root, configuration and tools.
pub struct PlatformContext {
    root: PathBuf,
    config: PlatformConfig,
    tools: Toolbox,
}

impl PlatformContext {
    /// Load the configuration at `config_path`. The engine root is the
    /// directory holding it.
    pub fn load(config_path: &Path, tool_timeout: Duration) -> Result<Self, ConfigError> {
        let config_path = std::path::absolute(config_path).map_err(|source| ConfigError::Read {
            path: config_path.to_path_buf(),
            source,
        })?;
        let config = PlatformConfig::load(&config_path)?;
        let root = config_path
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        Ok(Self::new(root, config, Toolbox::new(tool_timeout)))
    }

    /// Assemble a context from parts.
    #[must_use]
    pub const fn new(root: PathBuf, config: PlatformConfig, tools: Toolbox) -> Self {
        Self {
            root,
            config,
            tools,
        }
    }

    /// Parse a JSON document as if it were `root/pal-platform.json`.
    pub fn from_json_str(root: &Path, text: &str) -> Result<Self, ConfigError> {
        let config = PlatformConfig::from_json_str(text).map_err(|detail| ConfigError::Parse {
            path: root.join(DEFAULT_CONFIG_FILE),
            detail,
        })?;
        Ok(Self::new(root.to_path_buf(), config, Toolbox::default()))
    }

    /// The engine root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The external tools.
    #[must_use]
    pub const fn tools(&self) -> &Toolbox {
        &self.tools
    }

    /// Validate a target name against the configuration.
    pub fn target_name(&self, name: &str) -> Result<TargetName, ConfigError> {
        if self.config.target(name).is_some() {
            Ok(TargetName(name.to_owned()))
        } else {
            Err(ConfigError::UnknownTarget {
                name: name.to_owned(),
                available: self.config.target_names().map(str::to_owned).collect(),
            })
        }
    }

    /// Build the element tree of a validated target.
    pub fn build_target(&self, name: &TargetName) -> Result<Target, ConfigError> {
        let decl = self
            .config
            .target(name.as_str())
            .ok_or_else(|| ConfigError::UnknownTarget {
                name: name.to_string(),
                available: self.config.target_names().map(str::to_owned).collect(),
            })?;
        Target::from_decl(name, decl, &self.root)
    }

    /// Build-output directory of a target: `__<name>` next to the root.
    #[must_use]
    pub fn output_dir(&self, name: &str) -> PathBuf {
        self.root
            .parent()
            .unwrap_or(&self.root)
            .join(format!("{OUTPUT_DIR_PREFIX}{name}"))
    }

    /// Instructions file written by a real deployment.
    #[must_use]
    pub fn instructions_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.txt"))
    }
}
