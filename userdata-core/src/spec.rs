//! Sync spec validation and loading.
//!
//! # Input shape
//!
//! ```json
//! {
//!    "local_dir" : "/var/cache/userdir-ldap/hosts",
//!    "key_file" : "/root/.ssh/id_rsa",
//!    "host_dirs" : ["bootstack-template.internal"],
//!    "local_overrides" : [],
//!    "dist_user" : "sshdist"
//! }
//! ```
//!
//! The four keys in [`REQUIRED_KEYS`] must be present; extra keys are
//! tolerated. `host_dirs` must be a list. A single string is rejected even
//! though it would be iterable.
//!
//! YAML input is parsed into the same value model and validated identically.

use std::collections::BTreeSet;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::{invalid, SpecError};
use crate::types::{DistUser, HostDir, SyncSpec};

/// Keys every sync spec must carry.
pub const REQUIRED_KEYS: [&str; 4] = ["host_dirs", "local_dir", "key_file", "dist_user"];

/// Serialization format of a spec document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpecFormat {
    #[default]
    Json,
    Yaml,
}

impl SpecFormat {
    /// `.yaml` / `.yml` select YAML; anything else is read as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                SpecFormat::Yaml
            }
            _ => SpecFormat::Json,
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate an arbitrary structured value into a [`SyncSpec`].
pub fn validate(value: &Value) -> Result<SyncSpec, SpecError> {
    let map = value.as_object().ok_or(SpecError::NotAMapping {
        found: kind_of(value),
    })?;

    let missing: BTreeSet<String> = REQUIRED_KEYS
        .iter()
        .filter(|key| !map.contains_key(**key))
        .map(|key| (*key).to_string())
        .collect();
    if !missing.is_empty() {
        return Err(SpecError::MissingKeys {
            missing,
            present: map.keys().cloned().collect(),
        });
    }

    let host_dirs = match &map["host_dirs"] {
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| host_dir_entry(i, item))
            .collect::<Result<Vec<_>, _>>()?,
        other => {
            return Err(SpecError::NotAList {
                key: "host_dirs",
                found: kind_of(other),
            })
        }
    };

    let local_dir = PathBuf::from(string_field(map, "local_dir")?);
    if !local_dir.is_absolute() {
        return Err(invalid(
            "local_dir",
            format!("must be an absolute path, got {}", local_dir.display()),
        ));
    }
    if local_dir.file_name().is_none() {
        return Err(invalid(
            "local_dir",
            format!("must name a directory below a parent, got {}", local_dir.display()),
        ));
    }

    let key_file = PathBuf::from(string_field(map, "key_file")?);
    let dist_user = DistUser::from(string_field(map, "dist_user")?);

    let local_overrides = match map.get("local_overrides") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::String(s) if !s.is_empty() => Ok(PathBuf::from(s)),
                other => Err(invalid(
                    "local_overrides",
                    format!("entry {i} must be a non-empty path string, got {}", kind_of(other)),
                )),
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(other) => {
            return Err(SpecError::NotAList {
                key: "local_overrides",
                found: kind_of(other),
            })
        }
    };

    Ok(SyncSpec::new(
        local_dir, key_file, host_dirs, dist_user, local_overrides,
    ))
}

fn host_dir_entry(index: usize, item: &Value) -> Result<HostDir, SpecError> {
    let Value::String(s) = item else {
        return Err(invalid(
            "host_dirs",
            format!("entry {index} must be a string, got {}", kind_of(item)),
        ));
    };
    if s.trim().is_empty() {
        return Err(invalid("host_dirs", format!("entry {index} is empty")));
    }
    // rsync reads a trailing `/` or `.` as "contents of", which would land the
    // subtree in the staging root instead of under its own name.
    if s
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(invalid(
            "host_dirs",
            format!("entry {index} ({s}) must be a relative path without empty, `.` or `..` segments"),
        ));
    }
    Ok(HostDir::from(s.as_str()))
}

fn string_field(map: &Map<String, Value>, key: &str) -> Result<String, SpecError> {
    match map.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::String(_)) => Err(invalid(key, "must not be empty")),
        Some(other) => Err(invalid(key, format!("must be a string, got {}", kind_of(other)))),
        None => Err(SpecError::MissingKeys {
            missing: BTreeSet::from([key.to_string()]),
            present: map.keys().cloned().collect(),
        }),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Parse and validate spec text. `origin` names the source in error messages.
pub fn parse_str(text: &str, format: SpecFormat, origin: &str) -> Result<SyncSpec, SpecError> {
    let value: Value = match format {
        SpecFormat::Json => serde_json::from_str(text).map_err(|source| SpecError::Json {
            origin: origin.to_string(),
            source,
        })?,
        SpecFormat::Yaml => serde_yaml::from_str(text).map_err(|source| SpecError::Yaml {
            origin: origin.to_string(),
            source,
        })?,
    };
    validate(&value)
}

/// Read a whole spec document from `reader` (typically stdin).
pub fn from_reader(
    mut reader: impl Read,
    format: SpecFormat,
    origin: &str,
) -> Result<SyncSpec, SpecError> {
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .map_err(|source| SpecError::Io {
            path: PathBuf::from(origin),
            source,
        })?;
    parse_str(&text, format, origin)
}

/// Load a spec file, choosing the format from its extension.
pub fn load_at(path: &Path) -> Result<SyncSpec, SpecError> {
    let text = std::fs::read_to_string(path).map_err(|source| SpecError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_str(&text, SpecFormat::from_path(path), &path.display().to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid() -> Value {
        json!({
            "local_dir": "/var/cache/userdir-ldap/hosts",
            "key_file": "/root/.ssh/id_rsa",
            "host_dirs": ["bootstack-template.internal"],
            "local_overrides": [],
            "dist_user": "sshdist"
        })
    }

    #[test]
    fn accepts_documented_example() {
        let spec = validate(&valid()).expect("valid spec");
        assert_eq!(spec.local_dir(), Path::new("/var/cache/userdir-ldap/hosts"));
        assert_eq!(spec.host_dirs(), &[HostDir::from("bootstack-template.internal")]);
        assert_eq!(spec.dist_user().0, "sshdist");
        assert!(spec.local_overrides().is_empty());
    }

    #[test]
    fn local_overrides_defaults_to_empty() {
        let mut value = valid();
        value.as_object_mut().unwrap().remove("local_overrides");
        let spec = validate(&value).expect("valid spec");
        assert!(spec.local_overrides().is_empty());
    }

    #[test]
    fn extra_keys_are_tolerated() {
        let mut value = valid();
        value["comment"] = json!("managed elsewhere");
        assert!(validate(&value).is_ok());
    }

    #[test]
    fn host_dirs_string_is_rejected() {
        let mut value = valid();
        value["host_dirs"] = json!("bootstack-template.internal");
        let err = validate(&value).unwrap_err();
        assert!(matches!(err, SpecError::NotAList { key: "host_dirs", .. }), "got: {err}");
        assert!(err.offending_keys().contains("host_dirs"));
    }

    #[test]
    fn missing_keys_are_all_reported() {
        let value = json!({ "host_dirs": [] , "extra": 1 });
        let err = validate(&value).unwrap_err();
        let SpecError::MissingKeys { missing, present } = &err else {
            panic!("expected MissingKeys, got {err}");
        };
        let expected: BTreeSet<String> = ["dist_user", "key_file", "local_dir"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(missing, &expected);
        assert!(present.contains("extra"));
    }

    #[test]
    fn relative_local_dir_is_rejected() {
        let mut value = valid();
        value["local_dir"] = json!("relative/hosts");
        let err = validate(&value).unwrap_err();
        assert!(err.offending_keys().contains("local_dir"), "got: {err}");
    }

    #[test]
    fn root_local_dir_is_rejected() {
        let mut value = valid();
        value["local_dir"] = json!("/");
        assert!(validate(&value).is_err());
    }

    #[test]
    fn parent_dir_in_host_dir_is_rejected() {
        let mut value = valid();
        value["host_dirs"] = json!(["../etc"]);
        let err = validate(&value).unwrap_err();
        assert!(err.to_string().contains("`..`"), "got: {err}");
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(SpecFormat::from_path(Path::new("spec.yaml")), SpecFormat::Yaml);
        assert_eq!(SpecFormat::from_path(Path::new("spec.YML")), SpecFormat::Yaml);
        assert_eq!(SpecFormat::from_path(Path::new("spec.json")), SpecFormat::Json);
        assert_eq!(SpecFormat::from_path(Path::new("spec")), SpecFormat::Json);
    }

    #[test]
    fn from_reader_parses_json() {
        let text = valid().to_string();
        let spec = from_reader(text.as_bytes(), SpecFormat::Json, "<stdin>").expect("parse");
        assert_eq!(spec.key_file(), Path::new("/root/.ssh/id_rsa"));
    }

    #[test]
    fn parse_error_names_origin() {
        let err = parse_str("{ not json", SpecFormat::Json, "<stdin>").unwrap_err();
        assert!(matches!(err, SpecError::Json { .. }));
        assert!(err.to_string().contains("<stdin>"));
        assert!(err.offending_keys().is_empty());
    }
}
