//! # objmigrate
//!
//! **objmigrate** is a concurrency-safe, idempotent engine for migrating
//! records between two accounts of an external system.
//!
//! Each migrated object kind implements a [`Provider`]; an [`Importer`] drives
//! it through a three-phase, commit-like protocol (recreate, then revert or
//! confirm) so that every item migrates exactly once, partial failures never
//! abort unrelated work, and outcomes are collected into a [`Reporter`] tree
//! for operator summaries.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   Provider   │   │   Provider   │   │   Provider   │
//!     │ (Customer)   │   │(Subscription)│   │  (Coupon)    │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   Importer   │   │   Importer   │   │   Importer   │
//!     │ - Queue      │   │ - Queue      │   │ - Queue      │
//!     │ - ReuseLast  │   │ - ReuseLast  │   │ - ReuseLast  │
//!     │   Call × 3   │   │   Call × 3   │   │   Call × 3   │
//!     │ - id maps    │   │ - id maps    │   │ - id maps    │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            │ report           │ report           │ report
//!            ▼                  ▼                  ▼
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   Reporter   │   │   Reporter   │   │   Reporter   │
//!     │  "Customer"  │   │"Subscription"│   │   "Coupon"   │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            └──────────────────┼──────────────────┘
//!                               ▼ propagate up
//!                    ┌────────────────────┐        ┌─────────────────┐
//!                    │  Reporter "Total"  │──Bus──►│   ListenerSet   │
//!                    └────────────────────┘        │ (per-listener   │
//!                                                  │  queues)        │
//!                                                  └─────────────────┘
//! ```
//!
//! ### Item lifecycle
//! ```text
//! recreate ──► find_existing? ──► hit  ──► reuse id             [recreate, skipped]
//!                            └──► miss ──► provider.recreate ──► [recreate, succeeded | skipped | failed]
//!
//! revert   ──► find_existing? ──► miss ──► "Not yet created"    [revert, skipped]
//!                            └──► hit  ──► provider.revert  ──► [revert, succeeded | skipped | failed]
//!
//! confirm  ──► find_existing? ──► hit  ──► source canceled? ──► revert instead, Warning
//!                                                          └──► provider.confirm ─► [confirm, ...]
//! ```
//!
//! ## Features
//! | Area             | Description                                                | Key types / traits                          |
//! |------------------|------------------------------------------------------------|---------------------------------------------|
//! | **Importer**     | Idempotent recreate/revert/confirm, single item or batch.  | [`Importer`], [`ImporterBuilder`]           |
//! | **Providers**    | Remote capabilities of one object kind.                    | [`Provider`], [`Record`], [`ObjectOrId`]    |
//! | **Scheduling**   | Bounded concurrency and in-flight call coalescing.         | [`Queue`], [`ReuseLastCall`]                |
//! | **Reporting**    | Hierarchical counters, tag histograms, listeners.          | [`Reporter`], [`ReportTags`], [`ReportListener`] |
//! | **Errors**       | Warning vs failure, batch aggregation.                     | [`MigrateError`], [`ErrorGroup`]            |
//! | **Stats**        | End-of-run success counters per object kind.               | [`StatsSink`], [`MigrationStats`]           |
//! | **Configuration**| Per-importer settings.                                     | [`ImporterConfig`]                          |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogListener`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use futures::stream::{self, BoxStream, StreamExt};
//! use objmigrate::{Importer, ImporterConfig, MigrateError, Provider, Record, ReportTags, Reporter};
//!
//! #[derive(Clone)]
//! struct Coupon { id: String }
//!
//! impl Record for Coupon {
//!     fn id(&self) -> &str { &self.id }
//! }
//!
//! struct Coupons;
//!
//! #[async_trait]
//! impl Provider for Coupons {
//!     type Item = Coupon;
//!
//!     async fn get_by_id(&self, old_id: &str) -> Result<Coupon, MigrateError> {
//!         Ok(Coupon { id: old_id.to_string() })
//!     }
//!
//!     fn get_all(&self) -> BoxStream<'_, Result<Coupon, MigrateError>> {
//!         stream::iter(["1", "2"].map(|id| Ok(Coupon { id: id.to_string() }))).boxed()
//!     }
//!
//!     async fn find_existing(&self, _old: &Coupon) -> Result<Option<Coupon>, MigrateError> {
//!         Ok(None)
//!     }
//!
//!     async fn recreate(&self, old: &Coupon, _tags: &mut ReportTags) -> Result<String, MigrateError> {
//!         Ok(format!("new_{}", old.id))
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let total = Reporter::root();
//!     let importer = Importer::builder(Coupons)
//!         .with_config(ImporterConfig::new("Coupon"))
//!         .with_parent(&total)
//!         .build()?;
//!
//!     let summary = importer.recreate_all().await?;
//!     assert_eq!(summary.attempted, 2);
//!     assert_eq!(total.count(&["Coupon", "recreate", "succeeded"]), 2);
//!     total.print();
//!     Ok(())
//! }
//! ```
mod core;
mod errors;
mod providers;
mod reporting;
mod stats;

// ---- Public re-exports ----

pub use core::{
    BatchSummary, Importer, ImporterBuilder, ImporterConfig, Outcome, Phase, Queue, ReuseLastCall,
};
pub use errors::{ErrorGroup, MigrateError, ReportError};
pub use providers::{ObjectOrId, Provider, Record};
pub use reporting::{
    Bus, ListenerSet, ReportEvent, ReportEventKind, ReportListener, Reporter, ReportingCategory,
    ReportTags,
};
pub use stats::{MigrationStats, ObjectStats, StatsSink};

// Optional: expose a simple built-in logger listener (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use reporting::LogListener;
