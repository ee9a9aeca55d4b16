#![allow(clippy::missing_errors_doc)]

use anyhow::Result;
use clap::Args;
use tracing::{info, instrument};

use crate::context::PlatformContext;
use crate::error::DeployError;
use crate::target::Target;
use crate::tree;

#[derive(Args, Debug)]
pub struct CleanArgs {
    /// The target to clean
    #[arg(long = "target", value_name = "NAME")]
    pub target: String,

    /// Keep the deployed sources (clean only generated files)
    #[arg(short, long)]
    pub keep_sources: bool,
}

pub fn run(ctx: &PlatformContext, args: &CleanArgs) -> Result<()> {
    let target = super::resolve(ctx, &args.target)?;
    clean(ctx, &target, args.keep_sources)?;
    println!("Clean for {} is successful.", target.name());
    Ok(())
}

/// Remove the generated output directory and, unless `keep_sources`, every
/// fetched source tree.
#[instrument(skip_all, fields(target = %target.name()))]
pub fn clean(
    ctx: &PlatformContext,
    target: &Target,
    keep_sources: bool,
) -> Result<(), DeployError> {
    let out_dir = ctx.output_dir(target.name());
    if out_dir.is_dir() {
        info!("Deleting {}", out_dir.display());
        tree::remove(&out_dir).map_err(DeployError::io(&out_dir))?;
    }
    if !keep_sources {
        target.delete_elements()?;
    }
    Ok(())
}
