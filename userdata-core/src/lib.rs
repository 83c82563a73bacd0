//! userdata core library — sync spec types, validation, errors.
//!
//! - [`types`] — newtypes and the validated [`SyncSpec`]
//! - [`error`] — [`SpecError`]
//! - [`spec`] — validation and loading from JSON / YAML

pub mod error;
pub mod spec;
pub mod types;

pub use error::SpecError;
pub use spec::{SpecFormat, REQUIRED_KEYS};
pub use types::{DistUser, HostDir, SyncSpec};
