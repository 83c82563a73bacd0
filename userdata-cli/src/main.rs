//! rsync-userdata — fetch per-host user data and publish it atomically.
//!
//! # Usage
//!
//! ```text
//! rsync-userdata sync [--spec <path>] [--remote-host <host>] [--remote-base <path>] [--json]
//! rsync-userdata plan [--spec <path>] [--json]
//! rsync-userdata status <local_dir> [--json]
//! ```
//!
//! Without `--spec` (or with `--spec -`) the JSON spec is read from stdin.

mod commands;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use commands::{plan::PlanArgs, status::StatusArgs, sync::SyncArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "rsync-userdata",
    version,
    about = "Fetch per-host user data and swap it into place atomically",
    long_about = None,
)]
struct Cli {
    /// Log more (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one fetch / merge / publish cycle.
    Sync(SyncArgs),

    /// Validate the spec and print what a cycle would do.
    Plan(PlanArgs),

    /// Show the state of the live, tombstone and staging directories.
    Status(StatusArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Sync(args) => args.run(),
        Commands::Plan(args) => args.run(),
        Commands::Status(args) => args.run(),
    }
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
