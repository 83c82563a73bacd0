//! Atomic publish of a staging directory over the live directory.
//!
//! ## Swap protocol
//!
//! 1. **PreSwap**: staging exists; staging, live and their parent share a device;
//!    a tombstone never stands in for a missing live directory.
//! 2. **TombstoneCleared**: remove `<live>.deleteme` left by an earlier cycle.
//! 3. **OldRetired**: rename live → tombstone.
//! 4. **NewPromoted**: rename staging → live.
//! 5. **TombstoneRemoved**: remove the tombstone.
//!
//! Steps 3 and 4 are back-to-back renames with no I/O between them; the live
//! path is unresolvable only in that window. A failure in step 4 after step 3
//! succeeded is [`PublishError::PromoteStaging`]: there is no rename-back, the
//! operator restores either tree by hand. Until then every publish refuses
//! with [`PublishError::LiveMissing`] rather than clear the tombstone. A
//! failure in step 5 does not fail the publish; step 2 of the next cycle
//! removes the leftover.
//!
//! The publisher assumes it is the only writer of the path triple. Two
//! publishers racing on the same tombstone are not detected.

use std::fmt;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::PublishError;
use crate::paths;
use crate::report::{CycleEvent, Reporter};

// ---------------------------------------------------------------------------
// Filesystem seam
// ---------------------------------------------------------------------------

/// The filesystem operations the swap needs.
pub trait SwapFs {
    /// `lstat`-style existence check.
    fn exists(&self, path: &Path) -> io::Result<bool>;

    /// Device id of `path`, or `None` where the platform has no such notion.
    fn device(&self, path: &Path) -> io::Result<Option<u64>>;

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Recursive removal; a missing path is success.
    fn remove_tree(&self, path: &Path) -> io::Result<()>;
}

/// [`SwapFs`] over `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

impl SwapFs for OsFs {
    fn exists(&self, path: &Path) -> io::Result<bool> {
        match fs::symlink_metadata(path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    #[cfg(unix)]
    fn device(&self, path: &Path) -> io::Result<Option<u64>> {
        use std::os::unix::fs::MetadataExt;
        fs::metadata(path).map(|m| Some(m.dev()))
    }

    #[cfg(not(unix))]
    fn device(&self, _path: &Path) -> io::Result<Option<u64>> {
        Ok(None)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn remove_tree(&self, path: &Path) -> io::Result<()> {
        let result = match fs::symlink_metadata(path) {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
            Ok(_) => fs::remove_file(path),
            Err(e) => Err(e),
        };
        match result {
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

// ---------------------------------------------------------------------------
// State and outcome
// ---------------------------------------------------------------------------

/// Publisher states, in the order they are reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishState {
    PreSwap,
    TombstoneCleared,
    OldRetired,
    NewPromoted,
    TombstoneRemoved,
}

impl fmt::Display for PublishState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishState::PreSwap => write!(f, "pre-swap"),
            PublishState::TombstoneCleared => write!(f, "tombstone-cleared"),
            PublishState::OldRetired => write!(f, "old-retired"),
            PublishState::NewPromoted => write!(f, "new-promoted"),
            PublishState::TombstoneRemoved => write!(f, "tombstone-removed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapKind {
    /// An existing live directory was replaced.
    Replaced,
    /// No live directory existed; staging was renamed into place.
    Initial,
}

/// Result of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishOutcome {
    pub live: PathBuf,
    pub kind: SwapKind,
    /// A tombstone from an earlier cycle was found and removed.
    pub stale_tombstone_cleared: bool,
    /// Set when step 5 failed; the next cycle removes it.
    pub leftover_tombstone: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// publish
// ---------------------------------------------------------------------------

/// Swap `staging` into place at `live`.
pub fn publish(
    fs: &dyn SwapFs,
    staging: &Path,
    live: &Path,
    reporter: &dyn Reporter,
) -> Result<PublishOutcome, PublishError> {
    let parent = paths::parent_dir(live);
    let tombstone = paths::tombstone_path(live);

    // Step 1: preconditions.
    if !fs.exists(staging).map_err(|e| inspect_err(staging, e))? {
        return Err(PublishError::StagingMissing {
            staging: staging.to_path_buf(),
        });
    }
    check_same_device(fs, &parent, staging)?;
    let live_present = fs.exists(live).map_err(|e| inspect_err(live, e))?;
    let stale = fs
        .exists(&tombstone)
        .map_err(|e| inspect_err(&tombstone, e))?;
    if live_present {
        check_same_device(fs, &parent, live)?;
    } else if stale {
        return Err(PublishError::LiveMissing {
            live: live.to_path_buf(),
            tombstone,
        });
    }
    reporter.report(&CycleEvent::Publish(PublishState::PreSwap));

    // Step 2: clear any tombstone a previous cycle left behind.
    if stale {
        tracing::warn!("removing stale tombstone {}", tombstone.display());
    }
    fs.remove_tree(&tombstone)
        .map_err(|source| PublishError::ClearTombstone {
            tombstone: tombstone.clone(),
            source,
        })?;
    reporter.report(&CycleEvent::Publish(PublishState::TombstoneCleared));

    // Steps 3 + 4: the two renames, nothing in between.
    if live_present {
        fs.rename(live, &tombstone)
            .map_err(|source| PublishError::RetireLive {
                live: live.to_path_buf(),
                tombstone: tombstone.clone(),
                source,
            })?;
        if let Err(source) = fs.rename(staging, live) {
            reporter.report(&CycleEvent::Publish(PublishState::OldRetired));
            tracing::error!(
                "live directory {} is missing: old tree at {}, new tree at {}; manual recovery required",
                live.display(),
                tombstone.display(),
                staging.display()
            );
            return Err(PublishError::PromoteStaging {
                live: live.to_path_buf(),
                tombstone,
                staging: staging.to_path_buf(),
                source,
            });
        }
        reporter.report(&CycleEvent::Publish(PublishState::OldRetired));
    } else {
        tracing::warn!(
            "{} does not exist; publishing without retiring a previous tree",
            live.display()
        );
        fs.rename(staging, live)
            .map_err(|source| PublishError::PromoteInitial {
                live: live.to_path_buf(),
                staging: staging.to_path_buf(),
                source,
            })?;
    }
    reporter.report(&CycleEvent::Publish(PublishState::NewPromoted));
    tracing::info!("published {}", live.display());

    // Step 5: free the old tree. Failure here is not a failed publish.
    let leftover_tombstone = if live_present {
        match fs.remove_tree(&tombstone) {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(
                    "could not remove tombstone {}: {e}; the next cycle removes it",
                    tombstone.display()
                );
                Some(tombstone)
            }
        }
    } else {
        None
    };
    reporter.report(&CycleEvent::Publish(PublishState::TombstoneRemoved));

    Ok(PublishOutcome {
        live: live.to_path_buf(),
        kind: if live_present {
            SwapKind::Replaced
        } else {
            SwapKind::Initial
        },
        stale_tombstone_cleared: stale,
        leftover_tombstone,
    })
}

fn check_same_device(fs: &dyn SwapFs, parent: &Path, path: &Path) -> Result<(), PublishError> {
    let expected = fs.device(parent).map_err(|e| inspect_err(parent, e))?;
    let found = fs.device(path).map_err(|e| inspect_err(path, e))?;
    match (expected, found) {
        (Some(expected), Some(found)) if expected != found => Err(PublishError::CrossDevice {
            path: path.to_path_buf(),
            parent: parent.to_path_buf(),
            expected,
            found,
        }),
        _ => Ok(()),
    }
}

fn inspect_err(path: &Path, source: io::Error) -> PublishError {
    PublishError::Inspect {
        path: path.to_path_buf(),
        source,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
