//! # userdata-publish
//!
//! Fetch, merge, and atomically publish a per-host user-data tree.
//!
//! Call [`pipeline::run`] with a validated [`userdata_core::SyncSpec`] to run
//! one cycle, or [`publish::publish`] to swap an already populated staging
//! directory into place.

pub mod error;
pub mod inspect;
pub mod overrides;
pub mod ownership;
pub mod paths;
pub mod pipeline;
pub mod plan;
pub mod publish;
pub mod report;
pub mod staging;
pub mod transfer;

pub use error::{OverrideError, OwnershipError, PublishError, SyncError, TransferError};
pub use inspect::{inspect, SwapHealth, SwapStatus};
pub use ownership::{ChownCommand, Ownership};
pub use pipeline::{run, Backends, CycleReport, SystemBackends};
pub use publish::{publish, OsFs, PublishOutcome, PublishState, SwapFs, SwapKind};
pub use report::{CycleEvent, LogReporter, Reporter};
pub use transfer::{RsyncTransfer, Transfer, TransferConfig};
