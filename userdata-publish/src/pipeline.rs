//! Sync cycle orchestration.
//!
//! validate → create staging → fetch each host dir → copy each override →
//! normalize ownership → publish.
//!
//! Anything failing before the first rename leaves the live directory alone
//! and the staging directory in place for inspection. Staging debris is not
//! cleaned up here.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use userdata_core::{DistUser, HostDir, SyncSpec};

use crate::error::SyncError;
use crate::overrides::{self, CopyStats};
use crate::ownership::{ChownCommand, Ownership};
use crate::publish::{self, OsFs, PublishOutcome, SwapFs};
use crate::report::{CycleEvent, Reporter};
use crate::staging;
use crate::transfer::{RsyncTransfer, Transfer, TransferConfig};

/// The external operations a cycle is built from.
#[derive(Clone, Copy)]
pub struct Backends<'a> {
    pub transfer: &'a dyn Transfer,
    pub ownership: &'a dyn Ownership,
    pub fs: &'a dyn SwapFs,
}

/// Production backends: `rsync`, `chown`, `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct SystemBackends {
    pub transfer: RsyncTransfer,
    pub ownership: ChownCommand,
    pub fs: OsFs,
}

impl SystemBackends {
    pub fn new(transfer: TransferConfig, chown_program: impl Into<PathBuf>) -> Self {
        Self {
            transfer: RsyncTransfer::new(transfer),
            ownership: ChownCommand::new(chown_program),
            fs: OsFs,
        }
    }

    pub fn backends(&self) -> Backends<'_> {
        Backends {
            transfer: &self.transfer,
            ownership: &self.ownership,
            fs: &self.fs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverrideCopy {
    pub source: PathBuf,
    pub stats: CopyStats,
}

/// Summary of a completed cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub local_dir: PathBuf,
    pub staging: PathBuf,
    pub dist_user: DistUser,
    pub host_dirs: Vec<HostDir>,
    pub overrides: Vec<OverrideCopy>,
    pub publish: PublishOutcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Validate `value` and run one cycle. Nothing touches the filesystem if
/// validation fails.
pub fn run_value(
    value: &serde_json::Value,
    backends: &Backends<'_>,
    reporter: &dyn Reporter,
) -> Result<CycleReport, SyncError> {
    let spec = SyncSpec::from_value(value)?;
    run(&spec, backends, reporter)
}

/// Run one cycle for an already validated spec.
pub fn run(
    spec: &SyncSpec,
    backends: &Backends<'_>,
    reporter: &dyn Reporter,
) -> Result<CycleReport, SyncError> {
    let started_at = Utc::now();
    let staging = staging::create(spec.local_dir())?;
    reporter.report(&CycleEvent::StagingCreated(&staging));

    match populate_and_publish(spec, &staging, backends, reporter) {
        Ok((overrides, publish)) => Ok(CycleReport {
            local_dir: spec.local_dir().to_path_buf(),
            staging,
            dist_user: spec.dist_user().clone(),
            host_dirs: spec.host_dirs().to_vec(),
            overrides,
            publish,
            started_at,
            finished_at: Utc::now(),
        }),
        Err(e) => {
            if e.is_recoverable() {
                tracing::error!(
                    "sync cycle aborted, {} unchanged; staging left at {}: {e}",
                    spec.local_dir().display(),
                    staging.display()
                );
            }
            Err(e)
        }
    }
}

fn populate_and_publish(
    spec: &SyncSpec,
    staging: &std::path::Path,
    backends: &Backends<'_>,
    reporter: &dyn Reporter,
) -> Result<(Vec<OverrideCopy>, PublishOutcome), SyncError> {
    reporter.report(&CycleEvent::HostDirs(spec.host_dirs()));
    for host_dir in spec.host_dirs() {
        reporter.report(&CycleEvent::Fetching(host_dir));
        backends
            .transfer
            .fetch(spec.key_file(), spec.dist_user(), host_dir, staging)?;
    }

    reporter.report(&CycleEvent::LocalOverrides(spec.local_overrides()));
    let overrides = overrides::apply(spec.local_overrides(), staging, reporter)?
        .into_iter()
        .map(|(source, stats)| OverrideCopy { source, stats })
        .collect();

    reporter.report(&CycleEvent::Normalizing {
        dir: staging,
        user: spec.dist_user(),
    });
    backends.ownership.normalize(staging, spec.dist_user())?;

    let outcome = publish::publish(backends.fs, staging, spec.local_dir(), reporter)?;
    Ok((overrides, outcome))
}
