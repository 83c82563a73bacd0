//! Error types for userdata-publish.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

use userdata_core::{HostDir, SpecError};

use crate::publish::PublishState;

/// All errors that can abort a sync cycle.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The spec was rejected before any side effect.
    #[error("invalid sync spec: {0}")]
    Spec(#[from] SpecError),

    /// The staging directory could not be created or prepared.
    #[error("failed to prepare staging directory {path}: {source}")]
    Staging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Override(#[from] OverrideError),

    #[error(transparent)]
    Ownership(#[from] OwnershipError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

impl SyncError {
    /// `false` only when the live directory is currently missing and needs an
    /// operator. Every other failure left the live directory untouched.
    pub fn is_recoverable(&self) -> bool {
        match self {
            SyncError::Publish(e) => e.is_recoverable(),
            _ => true,
        }
    }
}

/// A remote fetch failed.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The transfer program could not be started.
    #[error("failed to run {program} for host dir {host_dir}: {source}")]
    Spawn {
        program: String,
        host_dir: HostDir,
        #[source]
        source: std::io::Error,
    },

    /// The transfer program ran and exited non-zero.
    #[error("transfer of host dir {host_dir} failed ({status}): {stderr}")]
    Failed {
        host_dir: HostDir,
        status: ExitStatus,
        stderr: String,
    },
}

/// Copying a local override tree into staging failed.
#[derive(Debug, Error)]
pub enum OverrideError {
    #[error("local override {source_dir} does not exist")]
    MissingSource { source_dir: PathBuf },

    #[error("local override {source_dir} is not a directory")]
    NotADirectory { source_dir: PathBuf },

    #[error("failed to walk local override {source_dir}: {source}")]
    Walk {
        source_dir: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("failed to copy local override {source_dir} at {path}: {source}")]
    Copy {
        source_dir: PathBuf,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Recursive ownership change failed.
#[derive(Debug, Error)]
pub enum OwnershipError {
    #[error("failed to run {program} on {dir}: {source}")]
    Spawn {
        program: String,
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("chown of {dir} to {user} failed ({status}): {stderr}")]
    Failed {
        dir: PathBuf,
        user: String,
        status: ExitStatus,
        stderr: String,
    },
}

/// The atomic swap failed.
///
/// Every variant except [`PublishError::PromoteStaging`] leaves the live
/// directory exactly as it was. [`PublishError::LiveMissing`] finds it
/// already gone and touches nothing.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("staging directory {staging} does not exist")]
    StagingMissing { staging: PathBuf },

    /// Staging and live are on different filesystems; a rename would not be atomic.
    #[error("{path} is on device {found}, expected device {expected} of {parent}; staging and live must share a filesystem")]
    CrossDevice {
        path: PathBuf,
        parent: PathBuf,
        expected: u64,
        found: u64,
    },

    /// A tombstone exists without a live directory: an earlier swap failed
    /// between its renames and the tombstone holds the only previous tree.
    #[error("LIVE DIRECTORY MISSING: {live} does not exist but {tombstone} does; an earlier sync failed mid-swap, restore {live} by hand before syncing again")]
    LiveMissing { live: PathBuf, tombstone: PathBuf },

    #[error("failed to inspect {path}: {source}")]
    Inspect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to clear stale tombstone {tombstone}: {source}")]
    ClearTombstone {
        tombstone: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to retire {live} to {tombstone}: {source}")]
    RetireLive {
        live: PathBuf,
        tombstone: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No live directory existed and staging could not be renamed into place.
    #[error("failed to promote {staging} to {live}: {source}")]
    PromoteInitial {
        live: PathBuf,
        staging: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The live path was retired but the new tree could not be promoted.
    /// Consumers reading the live path fail until an operator intervenes.
    #[error("LIVE DIRECTORY MISSING: {live} was moved to {tombstone} but {staging} could not be renamed into place: {source}; manual recovery required")]
    PromoteStaging {
        live: PathBuf,
        tombstone: PathBuf,
        staging: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PublishError {
    /// Last state the publisher reached before failing.
    pub fn reached(&self) -> PublishState {
        match self {
            PublishError::StagingMissing { .. }
            | PublishError::CrossDevice { .. }
            | PublishError::LiveMissing { .. }
            | PublishError::Inspect { .. }
            | PublishError::ClearTombstone { .. } => PublishState::PreSwap,
            PublishError::RetireLive { .. } | PublishError::PromoteInitial { .. } => {
                PublishState::TombstoneCleared
            }
            PublishError::PromoteStaging { .. } => PublishState::OldRetired,
        }
    }

    /// `false` when the live directory is missing and needs an operator.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            PublishError::PromoteStaging { .. } | PublishError::LiveMissing { .. }
        )
    }
}
