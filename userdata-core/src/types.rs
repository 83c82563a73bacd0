//! Domain types for a userdata sync cycle.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A remote host identifier naming one subtree under the remote base path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HostDir(pub String);

impl fmt::Display for HostDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for HostDir {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for HostDir {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl HostDir {
    /// Final path component; rsync mirrors the remote subtree under this name.
    pub fn leaf(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

/// The user that owns the published tree and authenticates the transfer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DistUser(pub String);

impl fmt::Display for DistUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for DistUser {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DistUser {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// SyncSpec
// ---------------------------------------------------------------------------

/// A validated sync spec.
///
/// Only [`crate::spec::validate`] builds one, so holding a `SyncSpec` means
/// every required key was present and well-shaped. It cannot be mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncSpec {
    local_dir: PathBuf,
    key_file: PathBuf,
    host_dirs: Vec<HostDir>,
    dist_user: DistUser,
    local_overrides: Vec<PathBuf>,
}

impl SyncSpec {
    pub(crate) fn new(
        local_dir: PathBuf,
        key_file: PathBuf,
        host_dirs: Vec<HostDir>,
        dist_user: DistUser,
        local_overrides: Vec<PathBuf>,
    ) -> Self {
        Self {
            local_dir,
            key_file,
            host_dirs,
            dist_user,
            local_overrides,
        }
    }

    /// Validate an arbitrary structured value. See [`crate::spec::validate`].
    pub fn from_value(value: &serde_json::Value) -> Result<Self, crate::SpecError> {
        crate::spec::validate(value)
    }

    /// Absolute path of the live directory.
    pub fn local_dir(&self) -> &Path {
        &self.local_dir
    }

    pub fn key_file(&self) -> &Path {
        &self.key_file
    }

    /// Remote subtrees, in fetch order.
    pub fn host_dirs(&self) -> &[HostDir] {
        &self.host_dirs
    }

    pub fn dist_user(&self) -> &DistUser {
        &self.dist_user
    }

    /// Local trees copied over the fetched content, in order.
    pub fn local_overrides(&self) -> &[PathBuf] {
        &self.local_overrides
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
