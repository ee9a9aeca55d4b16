//! pal-platform library crate.
//!
//! The primary interface is the `pal-platform` binary. The engine is exposed
//! here so integration tests can build contexts and targets directly.
//!
//! Dependency order, leaves first: [`source`] providers populate a
//! destination; an [`element`] owns one provider, a destination and a patch;
//! a [`target`] aggregates elements; [`sync`] and [`patch`] hold the
//! version-control and patch state machines; [`context`] ties configuration
//! and tools together for the [`commands`].

pub mod commands;
pub mod config;
pub mod context;
pub mod download;
pub mod element;
pub mod error;
pub mod extract;
pub mod patch;
pub mod source;
pub mod sync;
pub mod target;
pub mod telemetry;
pub mod tree;

pub use context::{PlatformContext, TargetName, Toolbox};
pub use element::Element;
pub use error::{ConfigError, DeployError, OriginError};
pub use target::Target;
