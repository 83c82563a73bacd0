//! Error types for userdata-core.

use std::collections::BTreeSet;
use std::path::PathBuf;

use thiserror::Error;

/// Everything that can be wrong with a sync spec.
///
/// Raised before any side effect: no directory has been created and no
/// transfer has been started when one of these is returned.
#[derive(Debug, Error)]
pub enum SpecError {
    /// The top-level value is not a mapping.
    #[error("sync spec must be a mapping, got {found}")]
    NotAMapping { found: &'static str },

    /// One or more required keys are absent.
    #[error("sync spec needs keys {missing:?}, got: {present:?}")]
    MissingKeys {
        missing: BTreeSet<String>,
        present: BTreeSet<String>,
    },

    /// A key that must hold a sequence holds something else.
    #[error("sync spec key `{key}` must be a list, got {found}")]
    NotAList {
        key: &'static str,
        found: &'static str,
    },

    /// A key is present and list-shaped where required, but its value is unusable.
    #[error("sync spec key `{key}` is invalid: {reason}")]
    InvalidValue { key: String, reason: String },

    /// JSON input could not be parsed.
    #[error("failed to parse JSON sync spec from {origin}: {source}")]
    Json {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    /// YAML input could not be parsed.
    #[error("failed to parse YAML sync spec from {origin}: {source}")]
    Yaml {
        origin: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// The spec file could not be read.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SpecError {
    /// Keys that are missing or malformed. Empty for parse and I/O failures.
    pub fn offending_keys(&self) -> BTreeSet<String> {
        match self {
            SpecError::MissingKeys { missing, .. } => missing.clone(),
            SpecError::NotAList { key, .. } => BTreeSet::from([(*key).to_string()]),
            SpecError::InvalidValue { key, .. } => BTreeSet::from([key.clone()]),
            SpecError::NotAMapping { .. }
            | SpecError::Json { .. }
            | SpecError::Yaml { .. }
            | SpecError::Io { .. } => BTreeSet::new(),
        }
    }
}

pub(crate) fn invalid(key: impl Into<String>, reason: impl Into<String>) -> SpecError {
    SpecError::InvalidValue {
        key: key.into(),
        reason: reason.into(),
    }
}
