//! `rsync-userdata sync` — run one cycle.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use userdata_publish::{
    paths::DEFAULT_CHOWN, pipeline, CycleEvent, CycleReport, LogReporter, Reporter, SwapKind,
    SystemBackends,
};

use super::{print_json, RemoteArgs, SpecArgs};

/// Arguments for `rsync-userdata sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub spec: SpecArgs,

    #[command(flatten)]
    pub remote: RemoteArgs,

    /// chown program to run.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CHOWN)]
    pub chown: PathBuf,

    /// Print the cycle report as JSON instead of progress lines.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let spec = self.spec.load()?;
        let system = SystemBackends::new(self.remote.transfer_config(), self.chown.clone());
        let reporter: &dyn Reporter = if self.json {
            &LogReporter
        } else {
            &ConsoleReporter
        };

        let report = match pipeline::run(&spec, &system.backends(), reporter) {
            Ok(report) => report,
            Err(e) => {
                if !e.is_recoverable() {
                    eprintln!(
                        "{}",
                        format!(
                            "{} is missing; restore it from the tombstone or the staging directory",
                            spec.local_dir().display()
                        )
                        .red()
                        .bold()
                    );
                }
                return Err(e)
                    .with_context(|| format!("sync of {} failed", spec.local_dir().display()));
            }
        };

        if self.json {
            print_json(&report)
        } else {
            print_summary(&report);
            Ok(())
        }
    }
}

/// Human-readable progress on stdout.
struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn report(&self, event: &CycleEvent<'_>) {
        match event {
            CycleEvent::HostDirs(host_dirs) => println!(
                "Rsync host_dirs: [{}]",
                host_dirs
                    .iter()
                    .map(|h| h.0.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            CycleEvent::LocalOverrides(dirs) => println!(
                "Copying in local_overrides: [{}]",
                dirs.iter()
                    .map(|d| d.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            CycleEvent::Fetching(host_dir) => println!("  {}  {host_dir}", "↓".dimmed()),
            CycleEvent::Overlaying(dir) => println!("  {}  {}", "+".dimmed(), dir.display()),
            CycleEvent::StagingCreated(_)
            | CycleEvent::Normalizing { .. }
            | CycleEvent::Publish(_) => {}
        }
    }
}

fn print_summary(report: &CycleReport) {
    let how = match report.publish.kind {
        SwapKind::Replaced => "replaced",
        SwapKind::Initial => "created",
    };
    let took = report.finished_at - report.started_at;
    println!(
        "{} {} {how} ({} host dirs, {} overrides, {} ms)",
        "✓".green(),
        report.local_dir.display(),
        report.host_dirs.len(),
        report.overrides.len(),
        took.num_milliseconds()
    );
    if report.publish.stale_tombstone_cleared {
        println!("  {}  removed a tombstone left by an earlier cycle", "·".dimmed());
    }
    if let Some(tombstone) = &report.publish.leftover_tombstone {
        println!(
            "  {}  {} could not be removed; the next sync removes it",
            "!".yellow(),
            tombstone.display()
        );
    }
}
