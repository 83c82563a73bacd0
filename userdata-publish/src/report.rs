//! Progress reporting for a sync cycle.
//!
//! The orchestrator never logs progress through a global; it is handed a
//! [`Reporter`] and emits a [`CycleEvent`] before each step.

use std::path::{Path, PathBuf};

use userdata_core::{DistUser, HostDir};

use crate::publish::PublishState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleEvent<'a> {
    StagingCreated(&'a Path),
    /// The full host_dirs list, surfaced before the first fetch.
    HostDirs(&'a [HostDir]),
    Fetching(&'a HostDir),
    /// The full local_overrides list, surfaced before the first copy.
    LocalOverrides(&'a [PathBuf]),
    Overlaying(&'a Path),
    Normalizing { dir: &'a Path, user: &'a DistUser },
    Publish(PublishState),
}

pub trait Reporter {
    fn report(&self, event: &CycleEvent<'_>);
}

/// Sends every event to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&self, event: &CycleEvent<'_>) {
        match event {
            CycleEvent::StagingCreated(path) => {
                tracing::info!("staging directory: {}", path.display());
            }
            CycleEvent::HostDirs(host_dirs) => {
                tracing::info!("rsync host_dirs: [{}]", join(host_dirs.iter()));
            }
            CycleEvent::Fetching(host_dir) => tracing::info!("fetching {host_dir}"),
            CycleEvent::LocalOverrides(dirs) => tracing::info!(
                "copying in local_overrides: [{}]",
                join(dirs.iter().map(|d| d.display()))
            ),
            CycleEvent::Overlaying(dir) => tracing::info!("overlaying {}", dir.display()),
            CycleEvent::Normalizing { dir, user } => {
                tracing::info!("chown -R {user} {}", dir.display());
            }
            CycleEvent::Publish(state) => tracing::debug!("publish: {state}"),
        }
    }
}

pub(crate) fn join<T: std::fmt::Display>(items: impl Iterator<Item = T>) -> String {
    items.map(|i| i.to_string()).collect::<Vec<_>>().join(", ")
}
