//! Build-system glue for a deployed target.
//!
//! The output directory `__<target>` sits next to the engine root and is
//! recreated on every run. It receives `autogen.cmake`, which names the
//! resolved OS, device and middleware, and a copy of the engine's
//! `mbedCloudClientCmake.txt` as `CMakeLists.txt` when that file exists.

#![allow(clippy::missing_errors_doc)]

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use tracing::{info, instrument};

use crate::context::PlatformContext;
use crate::error::DeployError;
use crate::target::Target;
use crate::tree;

/// Minimum build-system version the generated files require.
pub const BUILD_SYS_MIN_VER: u32 = 2;

const AUTOGEN_FILE: &str = "autogen.cmake";
const CMAKE_TEMPLATE_FILE: &str = "mbedCloudClientCmake.txt";
const CMAKE_LISTS: &str = "CMakeLists.txt";
const PARENT_CMAKE: &str = "ADDSUBDIRS()\n";

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// The target to generate platform-dependent files for
    #[arg(long = "target", value_name = "NAME")]
    pub target: String,
}

pub fn run(ctx: &PlatformContext, args: &GenerateArgs) -> Result<()> {
    let target = super::resolve(ctx, &args.target)?;
    let out_dir = generate(ctx, &target)?;
    println!(
        "Generation for {} is successful, please run cmake & make from {}",
        target.name(),
        out_dir.display()
    );
    Ok(())
}

/// Write the build-system files for a deployed target and return the output
/// directory.
#[instrument(skip_all, fields(target = %target.name()))]
pub fn generate(ctx: &PlatformContext, target: &Target) -> Result<PathBuf, DeployError> {
    if target.is_fetch_needed() {
        return Err(DeployError::NotDeployed {
            target: target.name().to_owned(),
        });
    }

    let out_dir = ctx.output_dir(target.name());
    if out_dir.exists() {
        tree::remove(&out_dir).map_err(DeployError::io(&out_dir))?;
    }
    fs::create_dir_all(&out_dir).map_err(DeployError::io(&out_dir))?;

    let autogen = out_dir.join(AUTOGEN_FILE);
    fs::write(&autogen, render_autogen(target)).map_err(DeployError::io(&autogen))?;
    info!("Generated {}", autogen.display());

    let template = ctx.root().join(CMAKE_TEMPLATE_FILE);
    if template.is_file() {
        let lists = out_dir.join(CMAKE_LISTS);
        fs::copy(&template, &lists).map_err(DeployError::io(&lists))?;
    }

    if let Some(parent) = out_dir.parent() {
        write_parent_cmake(parent)?;
    }
    Ok(out_dir)
}

fn write_parent_cmake(parent: &Path) -> Result<(), DeployError> {
    let path = parent.join(CMAKE_LISTS);
    if !path.is_file() {
        fs::write(&path, PARENT_CMAKE).map_err(DeployError::io(&path))?;
        info!("Generated {}", path.display());
    }
    Ok(())
}

/// The `autogen.cmake` contents for `target`.
#[must_use]
pub fn render_autogen(target: &Target) -> String {
    let os = match &target.os.version {
        Some(version) => format!("{}_{version}", target.os.name),
        None => target.os.name.clone(),
    };
    let middleware = target
        .middleware
        .iter()
        .map(|mw| mw.name.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    format!(
        "
#################################################################################
#                                                                               #
#                        THIS IS AN AUTO GENERATED FILE                         #
#                                                                               #
#################################################################################

set (MBED_CLOUD_CLIENT_SDK  )
set (MBED_CLOUD_CLIENT_OS {os})
set (MBED_CLOUD_CLIENT_DEVICE {device})
set (MBED_CLOUD_CLIENT_MIDDLEWARE {middleware})
set (MBED_CLOUD_CLIENT_TOOLCHAIN  )
set (MBED_CLOUD_CLIENT_BUILD_SYS_MIN_VER {BUILD_SYS_MIN_VER})
",
        device = target.device.name,
    )
}
