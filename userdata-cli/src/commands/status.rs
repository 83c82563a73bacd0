//! `rsync-userdata status` — inspect the live / tombstone / staging triple.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use userdata_publish::{inspect, SwapHealth, SwapStatus};

use super::print_json;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// The live directory (`local_dir` of the spec).
    pub local_dir: PathBuf,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let status = inspect(&self.local_dir)
            .with_context(|| format!("failed to inspect {}", self.local_dir.display()))?;

        if self.json {
            print_json(&status)?;
        } else {
            print_status(&status);
        }

        if status.health == SwapHealth::LiveMissing {
            bail!(
                "{} is missing while {} exists; a previous sync failed mid-swap",
                status.live.display(),
                status.tombstone.display()
            );
        }
        Ok(())
    }
}

fn print_status(status: &SwapStatus) {
    let health = match status.health {
        SwapHealth::Healthy => "healthy".green(),
        SwapHealth::TombstonePending => "tombstone pending".yellow(),
        SwapHealth::LiveMissing => "LIVE MISSING".red().bold(),
        SwapHealth::Unpublished => "never published".yellow(),
    };
    println!("{}: {health}", status.live.display());
    println!(
        "  live       {}",
        if status.live_present { "present" } else { "absent" }
    );
    println!(
        "  tombstone  {} ({})",
        status.tombstone.display(),
        if status.tombstone_present {
            "present"
        } else {
            "absent"
        }
    );
    if status.staging_debris.is_empty() {
        println!("  staging    none left behind");
    } else {
        for dir in &status.staging_debris {
            println!("  staging    {} (left by an aborted sync)", dir.display());
        }
    }
}
