use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod completion;
mod config;
mod dispatch;
mod metadata;
mod render;

use completion::CliCompletionShell;

#[derive(Parser, Debug)]
#[command(name = "extpack")]
#[command(about = "Resolve extension install plans against a catalog", long_about = None)]
struct Cli {
    /// Local registry directory containing `index/<id>/*.toml`.
    #[arg(long, global = true)]
    registry_root: Option<PathBuf>,
    #[arg(long, env = "EXTPACK_MARKETPLACE_URL", global = true)]
    marketplace_url: Option<String>,
    #[arg(long, env = "EXTPACK_PREFIX", global = true)]
    prefix: Option<PathBuf>,
    #[arg(long, env = "EXTPACK_PLATFORM_VERSION", global = true)]
    platform_version: Option<String>,
    /// Raise log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compute every install plan for `<id>@<version>`.
    Resolve {
        spec: String,
        #[arg(long, overrides_with = "no_ignore_lib_conflicts")]
        ignore_lib_conflicts: bool,
        /// Reject conflicting libraries even if config.toml ignores them.
        #[arg(long, overrides_with = "ignore_lib_conflicts")]
        no_ignore_lib_conflicts: bool,
        #[arg(long)]
        max_visits: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    Info {
        id: String,
    },
    Search {
        query: String,
    },
    Installed,
    Completions {
        #[arg(value_enum)]
        shell: CliCompletionShell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    dispatch::run_cli(cli)
}

fn init_tracing(verbose: u8) {
    let default_directive = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
