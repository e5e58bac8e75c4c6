//! `mirror scan`: per-day mirror commit counts of a local clone.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use mirror_core::DateRange;
use mirror_sync::{scanner, GitRepo};

use crate::commands::report;
use crate::config::{self, ScanConfig};

/// Arguments for `mirror scan`.
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Local clone to inspect [env: LOCAL_REPO_DIR].
    #[arg(long)]
    pub local_dir: Option<PathBuf>,

    /// First day, YYYY-MM-DD [env: START_DATE] (default: yesterday).
    #[arg(long)]
    pub start: Option<String>,

    /// Last day, YYYY-MM-DD [env: END_DATE] (default: today).
    #[arg(long)]
    pub end: Option<String>,

    /// Load variables from this file instead of ./.env.
    #[arg(long, value_name = "FILE")]
    pub env: Option<PathBuf>,

    /// Emit `{"YYYY-MM-DD": n}`, the same shape `sync --contributions-file` reads.
    #[arg(long)]
    pub json: bool,
}

impl ScanArgs {
    pub fn run(self) -> Result<()> {
        config::load_env_file(self.env.as_deref())?;
        let cfg = ScanConfig::resolve(&self, config::today(), config::process_env)?;
        let range = DateRange::new(cfg.start, cfg.end)?;

        let repo = GitRepo::open(&cfg.local_dir)
            .with_context(|| format!("'{}' is not a git repository", cfg.local_dir.display()))?;
        let counts = scanner::scan(&repo, &cfg.identity, &range)?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&counts).context("failed to serialize counts")?
            );
            return Ok(());
        }
        report::print_counts(&counts);
        Ok(())
    }
}
