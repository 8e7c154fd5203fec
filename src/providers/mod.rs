//! # Provider abstractions.
//!
//! - [`Record`]: an item of the external system with a stable string id
//! - [`Provider`]: capability set for one migrated object kind, bound to the
//!   old and new remote accounts by the caller
//! - [`ObjectOrId`]: argument of the `*_by_object_or_id` importer calls

mod object_or_id;
mod provider;

pub use object_or_id::ObjectOrId;
pub use provider::{Provider, Record};
