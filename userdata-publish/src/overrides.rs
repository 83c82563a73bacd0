//! Local override trees copied over the fetched content.
//!
//! Directories are merged (union of paths); files and symlinks from the
//! override replace whatever already sits at the same relative path.
//! Overrides are applied in list order, so a later override wins.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;

use crate::error::OverrideError;
use crate::report::{CycleEvent, Reporter};

/// Counts of what one override copied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CopyStats {
    pub files: usize,
    pub dirs: usize,
    pub symlinks: usize,
}

/// Copy every override tree into `destination`, in order. Stops at the first
/// failure; earlier overrides stay copied.
pub fn apply(
    override_dirs: &[PathBuf],
    destination: &Path,
    reporter: &dyn Reporter,
) -> Result<Vec<(PathBuf, CopyStats)>, OverrideError> {
    override_dirs
        .iter()
        .map(|dir| {
            reporter.report(&CycleEvent::Overlaying(dir));
            copy_tree(dir, destination).map(|stats| (dir.clone(), stats))
        })
        .collect()
}

/// Recursively copy the contents of `source_dir` into `destination`.
pub fn copy_tree(source_dir: &Path, destination: &Path) -> Result<CopyStats, OverrideError> {
    match fs::metadata(source_dir) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            return Err(OverrideError::NotADirectory {
                source_dir: source_dir.to_path_buf(),
            })
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(OverrideError::MissingSource {
                source_dir: source_dir.to_path_buf(),
            })
        }
        Err(e) => return Err(copy_err(source_dir, source_dir, e)),
    }

    let mut stats = CopyStats::default();
    for entry in WalkDir::new(source_dir)
        .follow_links(false)
        .min_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| OverrideError::Walk {
            source_dir: source_dir.to_path_buf(),
            source,
        })?;
        let Ok(relative) = entry.path().strip_prefix(source_dir) else {
            continue;
        };
        let target = destination.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target).map_err(|e| copy_err(source_dir, &target, e))?;
            stats.dirs += 1;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target).map_err(|e| copy_err(source_dir, &target, e))?;
            stats.symlinks += 1;
        } else {
            // fs::copy would write through an existing symlink.
            remove_symlink(&target).map_err(|e| copy_err(source_dir, &target, e))?;
            fs::copy(entry.path(), &target).map_err(|e| copy_err(source_dir, &target, e))?;
            stats.files += 1;
        }
    }

    tracing::info!(
        "copied local override {} ({} files, {} dirs, {} symlinks)",
        source_dir.display(),
        stats.files,
        stats.dirs,
        stats.symlinks
    );
    Ok(stats)
}

fn copy_err(source_dir: &Path, path: &Path, source: std::io::Error) -> OverrideError {
    OverrideError::Copy {
        source_dir: source_dir.to_path_buf(),
        path: path.to_path_buf(),
        source,
    }
}

fn remove_symlink(target: &Path) -> std::io::Result<()> {
    match fs::symlink_metadata(target) {
        Ok(meta) if meta.file_type().is_symlink() => fs::remove_file(target),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn copy_symlink(source: &Path, target: &Path) -> std::io::Result<()> {
    let link = fs::read_link(source)?;
    match fs::symlink_metadata(target) {
        Ok(meta) if meta.is_dir() => {
            return Err(std::io::Error::new(
                ErrorKind::AlreadyExists,
                "a directory already exists where the override has a symlink",
            ))
        }
        Ok(_) => fs::remove_file(target)?,
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    std::os::unix::fs::symlink(link, target)
}

#[cfg(not(unix))]
fn copy_symlink(source: &Path, target: &Path) -> std::io::Result<()> {
    fs::copy(source, target).map(|_| ())
}
