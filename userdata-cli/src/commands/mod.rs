pub mod plan;
pub mod status;
pub mod sync;

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use userdata_core::{spec, SpecFormat, SyncSpec};
use userdata_publish::paths::{DEFAULT_REMOTE_BASE, DEFAULT_REMOTE_HOST, DEFAULT_RSYNC};
use userdata_publish::TransferConfig;

/// Where the sync spec comes from.
#[derive(Args, Debug)]
pub struct SpecArgs {
    /// JSON or YAML spec file; `-` or omitted reads JSON from stdin.
    #[arg(long, value_name = "PATH")]
    pub spec: Option<PathBuf>,
}

impl SpecArgs {
    pub fn load(&self) -> Result<SyncSpec> {
        match &self.spec {
            Some(path) if path.as_os_str() != "-" => spec::load_at(path)
                .with_context(|| format!("invalid sync spec in {}", path.display())),
            _ => spec::from_reader(io::stdin().lock(), SpecFormat::Json, "<stdin>")
                .context("invalid sync spec on stdin"),
        }
    }
}

/// Remote endpoint of the transfer.
#[derive(Args, Debug)]
pub struct RemoteArgs {
    /// Host serving the user data.
    #[arg(long, value_name = "HOST", default_value = DEFAULT_REMOTE_HOST)]
    pub remote_host: String,

    /// Directory on the remote host holding one subtree per host dir.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_REMOTE_BASE)]
    pub remote_base: String,

    /// rsync program to run.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_RSYNC)]
    pub rsync: PathBuf,
}

impl RemoteArgs {
    pub fn transfer_config(&self) -> TransferConfig {
        TransferConfig {
            program: self.rsync.clone(),
            remote_host: self.remote_host.clone(),
            remote_base: self.remote_base.clone(),
        }
    }
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed to serialize output")?
    );
    Ok(())
}
