//! Read-only view of the live / tombstone / staging triple.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::PublishError;
use crate::paths;
use crate::publish::{OsFs, SwapFs};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapHealth {
    /// Live present, no tombstone.
    Healthy,
    /// Live present, a tombstone survived the last cycle. The next cycle clears it.
    TombstonePending,
    /// Live missing while a tombstone exists: a promote failed mid-swap.
    LiveMissing,
    /// Neither live nor tombstone exist.
    Unpublished,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwapStatus {
    pub live: PathBuf,
    pub live_present: bool,
    pub tombstone: PathBuf,
    pub tombstone_present: bool,
    /// Staging directories left by aborted cycles, sorted by name.
    pub staging_debris: Vec<PathBuf>,
    pub health: SwapHealth,
}

/// Inspect the path triple around `live` without changing anything.
pub fn inspect(live: &Path) -> Result<SwapStatus, PublishError> {
    let tombstone = paths::tombstone_path(live);
    let live_present = OsFs.exists(live).map_err(|e| inspect_err(live, e))?;
    let tombstone_present = OsFs
        .exists(&tombstone)
        .map_err(|e| inspect_err(&tombstone, e))?;

    let parent = paths::parent_dir(live);
    let mut staging_debris = Vec::new();
    if OsFs.exists(&parent).map_err(|e| inspect_err(&parent, e))? {
        for entry in fs::read_dir(&parent).map_err(|e| inspect_err(&parent, e))? {
            let entry = entry.map_err(|e| inspect_err(&parent, e))?;
            if paths::is_staging_name(live, &entry.file_name().to_string_lossy()) {
                staging_debris.push(entry.path());
            }
        }
    }
    staging_debris.sort();

    let health = match (live_present, tombstone_present) {
        (true, false) => SwapHealth::Healthy,
        (true, true) => SwapHealth::TombstonePending,
        (false, true) => SwapHealth::LiveMissing,
        (false, false) => SwapHealth::Unpublished,
    };

    Ok(SwapStatus {
        live: live.to_path_buf(),
        live_present,
        tombstone,
        tombstone_present,
        staging_debris,
        health,
    })
}

fn inspect_err(path: &Path, source: std::io::Error) -> PublishError {
    PublishError::Inspect {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn healthy_after_clean_publish() {
        let root = TempDir::new().unwrap();
        let live = root.path().join("hosts");
        fs::create_dir(&live).unwrap();

        let status = inspect(&live).expect("inspect");
        assert_eq!(status.health, SwapHealth::Healthy);
        assert!(status.staging_debris.is_empty());
    }

    #[test]
    fn live_missing_with_tombstone_is_degraded() {
        let root = TempDir::new().unwrap();
        let live = root.path().join("hosts");
        fs::create_dir(root.path().join("hosts.deleteme")).unwrap();
        fs::create_dir(root.path().join("hosts.staging-2")).unwrap();
        fs::create_dir(root.path().join("hosts.staging-1")).unwrap();
        fs::create_dir(root.path().join("unrelated.staging-1")).unwrap();

        let status = inspect(&live).expect("inspect");
        assert_eq!(status.health, SwapHealth::LiveMissing);
        assert_eq!(
            status.staging_debris,
            vec![
                root.path().join("hosts.staging-1"),
                root.path().join("hosts.staging-2")
            ]
        );
    }

    #[test]
    fn pending_tombstone_and_unpublished() {
        let root = TempDir::new().unwrap();
        let live = root.path().join("hosts");
        assert_eq!(inspect(&live).unwrap().health, SwapHealth::Unpublished);

        fs::create_dir(&live).unwrap();
        fs::create_dir(root.path().join("hosts.deleteme")).unwrap();
        assert_eq!(inspect(&live).unwrap().health, SwapHealth::TombstonePending);
    }
}
