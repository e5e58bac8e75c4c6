//! mirror: replay a work account's contribution calendar onto a personal
//! mirror repository as backdated commits.
//!
//! # Usage
//!
//! ```text
//! mirror sync [--start D] [--end D] [--backfill] [--dry-run] [-y] [--keep-repo]
//!             [--local-dir P] [--reset] [--env FILE] [--contributions-file F]
//!             [--remote URL] [--no-push]
//! mirror scan [--local-dir P] [--start D] [--end D] [--json]
//! ```

mod commands;
mod config;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{scan::ScanArgs, sync::SyncArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "mirror",
    version,
    about = "Mirror per-day contribution counts into a personal repository",
    long_about = None,
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Bring the mirror up to date with the work account's calendar.
    Sync(SyncArgs),

    /// Count mirror commits per day in a local clone.
    Scan(ScanArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Sync(args) => args.run(),
        Commands::Scan(args) => args.run(),
    }
}

/// Logs go to stderr so stdout stays clean for reports and `--json`.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
