//! # Provider trait: remote capabilities for one object kind.
//!
//! A provider is bound to the old (source) and new (destination) remote
//! accounts at construction and exposes four required capabilities plus two
//! optional ones advertised through [`Provider::supports`].
//!
//! | Capability       | Required | Used by                          |
//! |------------------|----------|----------------------------------|
//! | `get_by_id`      | yes      | `*_by_id`, `*_by_object_or_id`   |
//! | `get_all`        | yes      | `*_all` batch calls              |
//! | `find_existing`  | yes      | every phase (idempotency check)  |
//! | `recreate`       | yes      | recreate                         |
//! | `revert`         | no       | revert, confirm of canceled item |
//! | `confirm`        | no       | confirm                          |
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use futures::stream::{self, BoxStream, StreamExt};
//! use objmigrate::{MigrateError, Provider, Record, ReportTags};
//!
//! #[derive(Clone)]
//! struct Coupon { id: String }
//!
//! impl Record for Coupon {
//!     fn id(&self) -> &str { &self.id }
//! }
//!
//! struct Coupons { old: Vec<Coupon> }
//!
//! #[async_trait]
//! impl Provider for Coupons {
//!     type Item = Coupon;
//!
//!     async fn get_by_id(&self, old_id: &str) -> Result<Coupon, MigrateError> {
//!         self.old.iter().find(|c| c.id == old_id).cloned()
//!             .ok_or_else(|| MigrateError::warning(format!("coupon {old_id} not found")))
//!     }
//!
//!     fn get_all(&self) -> BoxStream<'_, Result<Coupon, MigrateError>> {
//!         stream::iter(self.old.iter().cloned().map(Ok)).boxed()
//!     }
//!
//!     async fn find_existing(&self, _old: &Coupon) -> Result<Option<Coupon>, MigrateError> {
//!         Ok(None)
//!     }
//!
//!     async fn recreate(&self, old: &Coupon, tags: &mut ReportTags) -> Result<String, MigrateError> {
//!         tags.push("kind", "coupon");
//!         Ok(format!("new_{}", old.id))
//!     }
//! }
//! ```

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::core::Phase;
use crate::errors::MigrateError;
use crate::reporting::ReportTags;

/// Item of the external system, identified by a stable string id.
pub trait Record: Clone + Send + Sync + 'static {
    /// Stable id within its account.
    fn id(&self) -> &str;
}

/// Remote capabilities for one migrated object kind.
///
/// Return [`MigrateError::Warning`] for expected, skippable conditions and any
/// other [`MigrateError`] for unexpected failures. Timeouts and retries of the
/// remote client belong here, not in the importer.
#[async_trait]
pub trait Provider: Send + Sync + 'static {
    /// Item type of both accounts.
    type Item: Record;

    /// Fetches one source item.
    async fn get_by_id(&self, old_id: &str) -> Result<Self::Item, MigrateError>;

    /// Opens a fresh enumeration of all source items.
    ///
    /// Every call starts a new remote cursor; the stream is lazy and finite.
    fn get_all(&self) -> BoxStream<'_, Result<Self::Item, MigrateError>>;

    /// Finds the destination item previously created for `old`, if any.
    ///
    /// Matches by a stable marker stored on the destination item, not by id
    /// equality. This is the idempotency check across runs.
    async fn find_existing(&self, old: &Self::Item) -> Result<Option<Self::Item>, MigrateError>;

    /// Creates the destination item for `old` and returns its id.
    ///
    /// `tags` is a side channel for report observations.
    async fn recreate(
        &self,
        old: &Self::Item,
        tags: &mut ReportTags,
    ) -> Result<String, MigrateError>;

    /// Advertises optional capabilities. Default: only [`Phase::Recreate`].
    fn supports(&self, phase: Phase) -> bool {
        matches!(phase, Phase::Recreate)
    }

    /// Undoes `new` (delete/cancel in the destination).
    async fn revert(
        &self,
        old: &Self::Item,
        new: &Self::Item,
        tags: &mut ReportTags,
    ) -> Result<(), MigrateError> {
        let _ = (old, new, tags);
        Err(MigrateError::fail("revert is not supported by this provider"))
    }

    /// Finalizes `new` as authoritative.
    async fn confirm(
        &self,
        old: &Self::Item,
        new: &Self::Item,
        tags: &mut ReportTags,
    ) -> Result<(), MigrateError> {
        let _ = (old, new, tags);
        Err(MigrateError::fail("confirm is not supported by this provider"))
    }

    /// True if the source item's own status became "canceled" during migration.
    ///
    /// Consulted by confirm right before finalizing. Default: `false`.
    async fn is_canceled(&self, old: &Self::Item) -> Result<bool, MigrateError> {
        let _ = old;
        Ok(false)
    }
}
