//! Side-effect-free description of what a cycle would do.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use userdata_core::SyncSpec;

use crate::ownership::ChownCommand;
use crate::paths;
use crate::transfer::{render_command, RsyncTransfer};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub live: PathBuf,
    pub staging: PathBuf,
    pub tombstone: PathBuf,
    pub transfers: Vec<String>,
    pub overrides: Vec<PathBuf>,
    pub ownership: String,
}

/// Build the plan for `spec`. The staging name is a placeholder; the real
/// one carries a timestamp.
pub fn plan(spec: &SyncSpec, transfer: &RsyncTransfer, chown: &ChownCommand) -> Plan {
    let live = spec.local_dir().to_path_buf();
    let staging = paths::staging_path(&live, "<timestamp>-<pid>-<seq>");
    let transfers = spec
        .host_dirs()
        .iter()
        .map(|host_dir| {
            render_command(&transfer.command(
                spec.key_file(),
                spec.dist_user(),
                host_dir,
                &staging,
            ))
        })
        .collect();

    Plan {
        tombstone: paths::tombstone_path(&live),
        transfers,
        overrides: spec.local_overrides().to_vec(),
        ownership: render_command(&chown.command(&staging, spec.dist_user())),
        staging,
        live,
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "create {} (mode 0755)", self.staging.display())?;
        for cmd in &self.transfers {
            writeln!(f, "run    {cmd}")?;
        }
        for dir in &self.overrides {
            writeln!(f, "copy   {}/ -> {}/", dir.display(), self.staging.display())?;
        }
        writeln!(f, "run    {}", self.ownership)?;
        writeln!(f, "remove {}", self.tombstone.display())?;
        writeln!(f, "rename {} -> {}", self.live.display(), self.tombstone.display())?;
        writeln!(f, "rename {} -> {}", self.staging.display(), self.live.display())?;
        write!(f, "remove {}", self.tombstone.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plan_lists_every_step_in_order() {
        let spec = SyncSpec::from_value(&json!({
            "host_dirs": ["h1", "h2"],
            "local_overrides": ["/ov"],
            "dist_user": "u",
            "local_dir": "/data/live",
            "key_file": "/k"
        }))
        .unwrap();
        let plan = plan(&spec, &RsyncTransfer::default(), &ChownCommand::default());

        assert_eq!(plan.tombstone, PathBuf::from("/data/live.deleteme"));
        assert_eq!(plan.transfers.len(), 2);
        assert!(plan.transfers[0].contains("u@userdb.internal:/var/cache/userdir-ldap/hosts/h1"));
        assert!(plan.transfers[1].contains("/hosts/h2"));
        assert!(plan.ownership.starts_with("chown -R u: /data/live.staging-"));

        let text = plan.to_string();
        let retire = text.find("rename /data/live -> ").unwrap();
        let promote = text.find("rename /data/live.staging-").unwrap();
        assert!(retire < promote);
        assert!(text.contains("copy   /ov/"));
    }
}
