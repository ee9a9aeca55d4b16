//! Git abstraction layer for pal-platform.
//!
//! This crate defines the [`GitClient`] trait, the single interface through
//! which the deployment engine drives version control. The engine never
//! spawns `git` itself; it programs against the trait, which keeps the
//! synchronization algorithm testable against a recording double.
//!
//! # Crate layout
//!
//! - [`client`]: the [`GitClient`] trait definition.
//! - [`cli`]: [`CliGit`], the implementation backed by the `git` executable.
//! - [`exec`]: timeout-bounded external tool invocation, shared with the
//!   `patch` driver in the engine.
//! - [`types`]: value types used in trait signatures ([`TreeRef`]) and
//!   repository-name normalization.
//! - [`error`]: the [`GitError`] enum returned by all trait methods.

pub mod cli;
pub mod client;
pub mod error;
pub mod exec;
pub mod types;

pub use cli::CliGit;
pub use client::GitClient;
pub use error::GitError;
pub use exec::{ExecError, ToolCommand, ToolOutput};
pub use types::{TreeRef, repo_name};
