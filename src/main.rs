use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use pal_platform::commands::{self, Command};
use pal_platform::config::DEFAULT_CONFIG_FILE;
use pal_platform::{PlatformContext, telemetry};

/// Deploy platform-dependent sources for mbed-cloud-client targets
///
/// Each target in the configuration combines an OS layer, a device layer
/// and optional middleware. `deploy` brings their sources onto disk from
/// git repositories, local folders, remote archives or remote files, and
/// applies the declared patches exactly once.
///
/// QUICK START:
///
///   pal-platform deploy --target <name> --instructions
///   pal-platform deploy --target <name>
///   pal-platform generate --target <name>
///   pal-platform clean --target <name> --keep-sources
#[derive(Parser)]
#[command(name = "pal-platform")]
#[command(version, about)]
#[command(propagate_version = true)]
#[command(
    after_help = "See 'pal-platform <command> --help' for more information on a specific command."
)]
struct Cli {
    /// Turn on verbose mode
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the targets configuration (.json, or .toml)
    ///
    /// Defaults to pal-platform.json in the current directory.
    #[arg(long, global = true, env = "PAL_PLATFORM_CONFIG", value_name = "PATH")]
    from_file: Option<PathBuf>,

    /// Timeout in seconds for each git or patch invocation
    #[arg(long, global = true, default_value_t = 600, value_name = "SECONDS")]
    tool_timeout: u64,

    #[command(subcommand)]
    command: Command,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    telemetry::init(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli
        .from_file
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let ctx = PlatformContext::load(&config, Duration::from_secs(cli.tool_timeout))?;
    commands::run(&ctx, &cli.command)
}
