//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;

use userdata_core::{DistUser, HostDir};
use userdata_publish::{
    CycleEvent, OsFs, Ownership, OwnershipError, Reporter, SwapFs, Transfer, TransferError,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ---------------------------------------------------------------------------
// Tree helpers
// ---------------------------------------------------------------------------

pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    fs::create_dir_all(root).unwrap();
    for (rel, content) in files {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
}

/// Every file under `root` as `(relative path, content)`, sorted.
pub fn read_tree(root: &Path) -> Vec<(String, String)> {
    let mut out = Vec::new();
    collect(root, root, &mut out);
    out.sort();
    out
}

fn collect(root: &Path, dir: &Path, out: &mut Vec<(String, String)>) {
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            collect(root, &path, out);
        } else {
            let rel = path.strip_prefix(root).unwrap().to_string_lossy().into_owned();
            out.push((rel, fs::read_to_string(&path).unwrap()));
        }
    }
}

pub fn copy_dir(from: &Path, to: &Path) -> io::Result<()> {
    fs::create_dir_all(to)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), target)?;
        }
    }
    Ok(())
}

/// Sibling entries of `live` whose names mark them as staging debris.
pub fn staging_debris(live: &Path) -> Vec<PathBuf> {
    userdata_publish::inspect(live).unwrap().staging_debris
}

// ---------------------------------------------------------------------------
// Transfer double: mirrors `<remote>/<host_dir>` into `<dest>/<leaf>`
// ---------------------------------------------------------------------------

pub struct FakeRemote {
    pub root: PathBuf,
    pub calls: RefCell<Vec<(String, String, PathBuf)>>,
    pub fail_on: Option<String>,
}

impl FakeRemote {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            calls: RefCell::new(Vec::new()),
            fail_on: None,
        }
    }

    pub fn failing_on(root: &Path, host_dir: &str) -> Self {
        Self {
            fail_on: Some(host_dir.to_string()),
            ..Self::new(root)
        }
    }

    pub fn fetched(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|(h, _, _)| h.clone()).collect()
    }
}

#[cfg(unix)]
fn failed_status() -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    ExitStatus::from_raw(23 << 8)
}

#[cfg(windows)]
fn failed_status() -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    ExitStatus::from_raw(23)
}

impl Transfer for FakeRemote {
    fn fetch(
        &self,
        _key_file: &Path,
        remote_user: &DistUser,
        host_dir: &HostDir,
        destination: &Path,
    ) -> Result<(), TransferError> {
        self.calls.borrow_mut().push((
            host_dir.0.clone(),
            remote_user.0.clone(),
            destination.to_path_buf(),
        ));
        if self.fail_on.as_deref() == Some(host_dir.0.as_str()) {
            return Err(TransferError::Failed {
                host_dir: host_dir.clone(),
                status: failed_status(),
                stderr: "rsync: connection unexpectedly closed".to_string(),
            });
        }
        let target = destination.join(host_dir.leaf());
        if target.exists() {
            fs::remove_dir_all(&target).unwrap();
        }
        copy_dir(&self.root.join(&host_dir.0), &target).map_err(|source| {
            TransferError::Spawn {
                program: "fake-rsync".to_string(),
                host_dir: host_dir.clone(),
                source,
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Ownership double: records the tree it was asked to normalize
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingChown {
    pub calls: RefCell<Vec<(PathBuf, String, Vec<(String, String)>)>>,
    pub fail: bool,
}

impl Ownership for RecordingChown {
    fn normalize(&self, dir: &Path, user: &DistUser) -> Result<(), OwnershipError> {
        self.calls
            .borrow_mut()
            .push((dir.to_path_buf(), user.0.clone(), read_tree(dir)));
        if self.fail {
            return Err(OwnershipError::Failed {
                dir: dir.to_path_buf(),
                user: user.0.clone(),
                status: failed_status(),
                stderr: format!("chown: invalid user: '{user}:'"),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Reporter double
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingReporter {
    pub events: RefCell<Vec<String>>,
}

impl Reporter for RecordingReporter {
    fn report(&self, event: &CycleEvent<'_>) {
        let line = match event {
            CycleEvent::StagingCreated(_) => "staging".to_string(),
            CycleEvent::HostDirs(h) => format!(
                "host_dirs:{}",
                h.iter().map(|h| h.0.as_str()).collect::<Vec<_>>().join(",")
            ),
            CycleEvent::Fetching(h) => format!("fetch:{h}"),
            CycleEvent::LocalOverrides(o) => format!("local_overrides:{}", o.len()),
            CycleEvent::Overlaying(p) => format!("overlay:{}", p.display()),
            CycleEvent::Normalizing { user, .. } => format!("normalize:{user}"),
            CycleEvent::Publish(state) => format!("publish:{state}"),
        };
        self.events.borrow_mut().push(line);
    }
}

// ---------------------------------------------------------------------------
// Filesystem double: OsFs with injected failures and a slow swap window
// ---------------------------------------------------------------------------

/// Phase markers shared with a concurrent reader.
pub const BEFORE_SWAP: usize = 0;
pub const IN_SWAP: usize = 1;
pub const AFTER_SWAP: usize = 2;

#[derive(Default)]
pub struct ScriptedFs {
    pub renames: Cell<usize>,
    /// 1-based index of the rename that fails.
    pub fail_rename: Option<usize>,
    /// Fail tombstone removal once both renames have happened.
    pub fail_final_remove: bool,
    /// Different device id reported for paths ending in this name.
    pub foreign_device_for: Option<String>,
    /// Pause between the two renames, publishing the phase to a reader.
    pub window: Option<(Arc<AtomicUsize>, Duration)>,
}

impl ScriptedFs {
    pub fn renames(&self) -> usize {
        self.renames.get()
    }
}

impl SwapFs for ScriptedFs {
    fn exists(&self, path: &Path) -> io::Result<bool> {
        OsFs.exists(path)
    }

    fn device(&self, path: &Path) -> io::Result<Option<u64>> {
        let real = OsFs.device(path)?;
        match &self.foreign_device_for {
            Some(name) if path.file_name().is_some_and(|n| n.to_string_lossy() == *name) => {
                Ok(Some(real.unwrap_or(0).wrapping_add(1)))
            }
            _ => Ok(Some(real.unwrap_or(0))),
        }
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let n = self.renames.get() + 1;
        self.renames.set(n);
        if self.fail_rename == Some(n) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("injected failure on rename #{n}"),
            ));
        }
        match (&self.window, n) {
            (Some((phase, delay)), 1) => {
                phase.store(IN_SWAP, Ordering::SeqCst);
                OsFs.rename(from, to)?;
                sleep(*delay);
                Ok(())
            }
            (Some((phase, _)), 2) => {
                OsFs.rename(from, to)?;
                phase.store(AFTER_SWAP, Ordering::SeqCst);
                Ok(())
            }
            _ => OsFs.rename(from, to),
        }
    }

    fn remove_tree(&self, path: &Path) -> io::Result<()> {
        if self.fail_final_remove && self.renames.get() >= 2 {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "injected failure removing tombstone",
            ));
        }
        OsFs.remove_tree(path)
    }
}
