//! Staging directory creation.
//!
//! A staging directory is a sibling of the live directory so the final
//! rename never crosses a filesystem boundary. It is chmod'ed to `0755`
//! explicitly after creation so the process umask does not matter.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::Utc;

use crate::error::SyncError;
use crate::paths;

pub const STAGING_MODE: u32 = 0o755;

static SEQUENCE: AtomicU32 = AtomicU32::new(0);

/// Create a fresh, empty staging directory next to `live`.
///
/// Fails if the parent of `live` does not exist; it is never created here.
pub fn create(live: &Path) -> Result<PathBuf, SyncError> {
    let stamp = format!(
        "{}-{}-{}",
        Utc::now().format("%Y%m%dT%H%M%S%.6f"),
        std::process::id(),
        SEQUENCE.fetch_add(1, Ordering::Relaxed)
    );
    let path = paths::staging_path(live, &stamp);
    fs::create_dir(&path).map_err(|e| staging_err(&path, e))?;
    set_mode(&path, STAGING_MODE)?;
    tracing::debug!("created staging directory {}", path.display());
    Ok(path)
}

fn staging_err(path: &Path, source: std::io::Error) -> SyncError {
    SyncError::Staging {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<(), SyncError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|e| staging_err(path, e))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<(), SyncError> {
    Ok(())
}
