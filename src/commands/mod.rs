//! Command-line subcommands.
//!
//! Each subcommand has a library-level operation returning [`DeployError`]
//! (usable from tests without the binary) and a `run` entry point that
//! validates the target name, calls it and prints the result.
//!
//! [`DeployError`]: crate::error::DeployError

#![allow(clippy::missing_errors_doc)]

pub mod clean;
pub mod deploy;
pub mod generate;
pub mod unpatch;

use anyhow::Result;
use clap::Subcommand;

use crate::context::PlatformContext;
use crate::target::Target;

/// pal-platform subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Deploy target-dependent files
    ///
    /// Fetches every element of the target from its origin, applies the
    /// declared patches and writes `<target>.txt` with the deployment
    /// instructions.
    Deploy(deploy::DeployArgs),

    /// Generate files to be used by the build system
    ///
    /// Requires a deployed target. Writes `__<target>/autogen.cmake` next
    /// to the engine root.
    Generate(generate::GenerateArgs),

    /// Clean target-dependent files
    ///
    /// Removes the generated `__<target>` directory and, unless
    /// --keep-sources is given, every fetched source tree.
    Clean(clean::CleanArgs),

    /// Revert the patches of a deployed target
    Unpatch(unpatch::UnpatchArgs),
}

/// Dispatch a subcommand.
pub fn run(ctx: &PlatformContext, command: &Command) -> Result<()> {
    match command {
        Command::Deploy(args) => deploy::run(ctx, args),
        Command::Generate(args) => generate::run(ctx, args),
        Command::Clean(args) => clean::run(ctx, args),
        Command::Unpatch(args) => unpatch::run(ctx, args),
    }
}

/// Validate `name` and build its tree before anything touches the disk.
fn resolve(ctx: &PlatformContext, name: &str) -> Result<Target> {
    let name = ctx.target_name(name)?;
    Ok(ctx.build_target(&name)?)
}
