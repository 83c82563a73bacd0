//! `rsync-userdata plan` — validate and describe a cycle without running it.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use userdata_core::SyncSpec;
use userdata_publish::{
    paths::DEFAULT_CHOWN,
    plan::{self, Plan},
    ChownCommand, RsyncTransfer,
};

use super::{print_json, RemoteArgs, SpecArgs};

#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub spec: SpecArgs,

    #[command(flatten)]
    pub remote: RemoteArgs,

    /// chown program the cycle would run.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CHOWN)]
    pub chown: PathBuf,

    /// Print the validated spec and plan as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct PlanOutput<'a> {
    spec: &'a SyncSpec,
    plan: &'a Plan,
}

impl PlanArgs {
    pub fn run(self) -> Result<()> {
        let spec = self.spec.load()?;
        let transfer = RsyncTransfer::new(self.remote.transfer_config());
        let plan = plan::plan(&spec, &transfer, &ChownCommand::new(self.chown.clone()));

        if self.json {
            return print_json(&PlanOutput {
                spec: &spec,
                plan: &plan,
            });
        }
        println!("{plan}");
        Ok(())
    }
}
