use std::path::{Path, PathBuf};

pub const TOMBSTONE_SUFFIX: &str = ".deleteme";
pub const STAGING_MARKER: &str = ".staging-";

pub const DEFAULT_REMOTE_HOST: &str = "userdb.internal";
pub const DEFAULT_REMOTE_BASE: &str = "/var/cache/userdir-ldap/hosts";
pub const DEFAULT_RSYNC: &str = "rsync";
pub const DEFAULT_CHOWN: &str = "chown";

/// Final component of `live` as a string. Validated specs always have one.
pub fn live_name(live: &Path) -> String {
    live.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Directory holding live, staging and tombstone.
pub fn parent_dir(live: &Path) -> PathBuf {
    live.parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("/"))
}

/// `<live>.deleteme`
pub fn tombstone_path(live: &Path) -> PathBuf {
    parent_dir(live).join(format!("{}{TOMBSTONE_SUFFIX}", live_name(live)))
}

/// `<live>.staging-<stamp>`
pub fn staging_path(live: &Path, stamp: &str) -> PathBuf {
    parent_dir(live).join(format!("{}{STAGING_MARKER}{stamp}", live_name(live)))
}

/// Whether `name` is a staging directory name belonging to `live`.
pub fn is_staging_name(live: &Path, name: &str) -> bool {
    name.strip_prefix(&live_name(live))
        .is_some_and(|rest| rest.starts_with(STAGING_MARKER))
}
