//! Remote fetch of one host directory into staging.
//!
//! The production client shells out to `rsync` over `ssh`:
//!
//! ```text
//! rsync -q -e "ssh -i <key_file>" -r -p --delete \
//!     <dist_user>@<remote_host>:<remote_base>/<host_dir> <staging>
//! ```
//!
//! Without a trailing slash on the source, rsync mirrors the remote subtree
//! into `<staging>/<leaf of host_dir>`; `--delete` makes it a mirror, not a merge.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::Serialize;
use userdata_core::{DistUser, HostDir};

use crate::error::TransferError;
use crate::paths::{DEFAULT_REMOTE_BASE, DEFAULT_REMOTE_HOST, DEFAULT_RSYNC};

/// One-way mirror of a remote host directory into a local destination.
pub trait Transfer {
    fn fetch(
        &self,
        key_file: &Path,
        remote_user: &DistUser,
        host_dir: &HostDir,
        destination: &Path,
    ) -> Result<(), TransferError>;
}

/// Where and how the remote tree is fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferConfig {
    pub program: PathBuf,
    pub remote_host: String,
    pub remote_base: String,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_RSYNC),
            remote_host: DEFAULT_REMOTE_HOST.to_string(),
            remote_base: DEFAULT_REMOTE_BASE.to_string(),
        }
    }
}

impl TransferConfig {
    /// `<user>@<host>:<base>/<host_dir>`
    pub fn source_for(&self, remote_user: &DistUser, host_dir: &HostDir) -> String {
        format!(
            "{remote_user}@{}:{}/{}",
            self.remote_host,
            self.remote_base.trim_end_matches('/'),
            host_dir.0.trim_start_matches('/')
        )
    }
}

/// [`Transfer`] backed by the `rsync` binary.
#[derive(Debug, Clone, Default)]
pub struct RsyncTransfer {
    config: TransferConfig,
}

impl RsyncTransfer {
    pub fn new(config: TransferConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// The exact command [`Transfer::fetch`] runs.
    pub fn command(
        &self,
        key_file: &Path,
        remote_user: &DistUser,
        host_dir: &HostDir,
        destination: &Path,
    ) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.arg("-q")
            .arg("-e")
            .arg(format!("ssh -i {}", key_file.display()))
            .args(["-r", "-p", "--delete"])
            .arg(self.config.source_for(remote_user, host_dir))
            .arg(destination);
        cmd
    }
}

impl Transfer for RsyncTransfer {
    fn fetch(
        &self,
        key_file: &Path,
        remote_user: &DistUser,
        host_dir: &HostDir,
        destination: &Path,
    ) -> Result<(), TransferError> {
        let mut cmd = self.command(key_file, remote_user, host_dir, destination);
        tracing::debug!("running {}", render_command(&cmd));

        let output = cmd
            .stdin(Stdio::null())
            .output()
            .map_err(|source| TransferError::Spawn {
                program: self.config.program.display().to_string(),
                host_dir: host_dir.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(TransferError::Failed {
                host_dir: host_dir.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        tracing::info!("fetched host dir {host_dir} into {}", destination.display());
        Ok(())
    }
}

/// Shell-like rendering of a command line, for logs and plans.
pub fn render_command(cmd: &Command) -> String {
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|arg| {
            let arg = arg.to_string_lossy();
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                format!("\"{arg}\"")
            } else {
                arg.into_owned()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
