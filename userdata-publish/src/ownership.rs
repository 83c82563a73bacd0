//! Recursive ownership normalization of the staging tree.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use userdata_core::DistUser;

use crate::error::OwnershipError;
use crate::paths::DEFAULT_CHOWN;
use crate::transfer::render_command;

/// Assigns `user` (and its login group) to every path under a directory.
pub trait Ownership {
    fn normalize(&self, dir: &Path, user: &DistUser) -> Result<(), OwnershipError>;
}

/// [`Ownership`] backed by `chown -R <user>: <dir>`.
#[derive(Debug, Clone)]
pub struct ChownCommand {
    program: PathBuf,
}

impl Default for ChownCommand {
    fn default() -> Self {
        Self::new(DEFAULT_CHOWN)
    }
}

impl ChownCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// The trailing `:` selects the user's login group.
    pub fn command(&self, dir: &Path, user: &DistUser) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-R").arg(format!("{user}:")).arg(dir);
        cmd
    }
}

impl Ownership for ChownCommand {
    fn normalize(&self, dir: &Path, user: &DistUser) -> Result<(), OwnershipError> {
        let mut cmd = self.command(dir, user);
        tracing::debug!("running {}", render_command(&cmd));

        let output = cmd
            .stdin(Stdio::null())
            .output()
            .map_err(|source| OwnershipError::Spawn {
                program: self.program.display().to_string(),
                dir: dir.to_path_buf(),
                source,
            })?;

        if !output.status.success() {
            return Err(OwnershipError::Failed {
                dir: dir.to_path_buf(),
                user: user.0.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        tracing::info!("ownership of {} set to {user}", dir.display());
        Ok(())
    }
}
