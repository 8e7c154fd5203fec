//! Error types used by the importer, the reporter tree and batch operations.
//!
//! - [`MigrateError`]: per-item outcome of a provider call: a skippable
//!   [`MigrateError::Warning`], an unexpected [`MigrateError::Fail`], or either
//!   one wrapped with item context.
//! - [`ErrorGroup`]: collects per-item errors of a batch without aborting it;
//!   escalates only when a non-warning error is present.
//! - [`ReportError`]: misuse of the reporter tree (double attach, cycles).

mod error;
mod group;

pub use error::{MigrateError, ReportError};
pub use group::ErrorGroup;

pub(crate) use error::panic_message;
