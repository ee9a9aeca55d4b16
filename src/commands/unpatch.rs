#![allow(clippy::missing_errors_doc)]

use anyhow::Result;
use clap::Args;

use crate::context::PlatformContext;
use crate::error::DeployError;
use crate::patch::PatchOutcome;
use crate::target::Target;

#[derive(Args, Debug)]
pub struct UnpatchArgs {
    /// The target whose patches to revert
    #[arg(long = "target", value_name = "NAME")]
    pub target: String,
}

pub fn run(ctx: &PlatformContext, args: &UnpatchArgs) -> Result<()> {
    let target = super::resolve(ctx, &args.target)?;
    let outcomes = unpatch(ctx, &target)?;
    let reverted = outcomes
        .iter()
        .filter(|(_, outcome)| *outcome == PatchOutcome::Reverted)
        .count();
    println!(
        "Reverted {reverted} of {} patch(es) for {}.",
        outcomes.len(),
        target.name()
    );
    Ok(())
}

/// Revert every patch of a deployed target.
pub fn unpatch(
    ctx: &PlatformContext,
    target: &Target,
) -> Result<Vec<(String, PatchOutcome)>, DeployError> {
    if target.is_fetch_needed() {
        return Err(DeployError::NotDeployed {
            target: target.name().to_owned(),
        });
    }
    target.revert_patches(ctx.tools())
}
