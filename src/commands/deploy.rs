#![allow(clippy::missing_errors_doc)]

use std::fs::File;
use std::io::{self, BufWriter, Write as _};
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::{info, instrument};

use crate::context::PlatformContext;
use crate::error::DeployError;
use crate::target::Target;

#[derive(Args, Debug)]
pub struct DeployArgs {
    /// The target to deploy platform-dependent files for
    #[arg(long = "target", value_name = "NAME")]
    pub target: String,

    /// Skip fetching; only apply patches and write instructions
    #[arg(long)]
    pub skip_update: bool,

    /// Show deployment instructions for the target and exit
    #[arg(short, long)]
    pub instructions: bool,
}

pub fn run(ctx: &PlatformContext, args: &DeployArgs) -> Result<()> {
    let target = super::resolve(ctx, &args.target)?;

    if args.instructions {
        let mut stdout = io::stdout().lock();
        target.write_instructions(&mut stdout)?;
        stdout.flush()?;
        return Ok(());
    }

    let instructions = deploy(ctx, &target, args.skip_update)?;
    println!("Deployment for {} is successful.", target.name());
    println!("Deployment instructions are in {}.", instructions.display());
    Ok(())
}

/// Fetch (unless `skip_update`), patch, and write the instructions file.
/// Returns the instructions file path.
#[instrument(skip_all, fields(target = %target.name()))]
pub fn deploy(
    ctx: &PlatformContext,
    target: &Target,
    skip_update: bool,
) -> Result<PathBuf, DeployError> {
    if skip_update {
        info!("Skipping source update");
    } else {
        target.fetch_elements(ctx.tools())?;
    }
    target.patch_elements(ctx.tools())?;

    let path = ctx.instructions_path(target.name());
    let write = || -> io::Result<()> {
        let mut out = BufWriter::new(File::create(&path)?);
        target.write_instructions(&mut out)?;
        out.flush()
    };
    write().map_err(DeployError::io(&path))?;
    Ok(path)
}
