//! # Events published by a [`Reporter`](crate::Reporter) on every change.
//!
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Workers of different listeners run independently, so use
//! `seq` to restore the exact order across listeners.
//!
//! ## Example
//! ```rust
//! use objmigrate::{ReportEvent, ReportEventKind, ReportTags};
//!
//! let ev = ReportEvent::new(ReportEventKind::Reported, "Subscription")
//!     .with_path(["recreate", "succeeded"])
//!     .with_tags(ReportTags::new().with("status", "active"))
//!     .with_total(3);
//!
//! assert_eq!(ev.reporter.as_ref(), "Subscription");
//! assert_eq!(ev.path_string(), "recreate/succeeded");
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use super::ReportTags;

/// Global sequence counter for event ordering.
static REPORT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of reporter events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportEventKind {
    /// An outcome was filed under `path` (relative to `reporter`).
    ///
    /// Sets `path`, `tags`, and `total` (reporter total after the update).
    Reported,

    /// A child reporter was attached.
    ///
    /// Sets `path` to the single key of the new child.
    ChildAttached,
}

/// Change notification with metadata.
#[derive(Debug, Clone)]
pub struct ReportEvent {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: ReportEventKind,
    /// Category key of the reporter that published the event.
    pub reporter: Arc<str>,
    /// Category path relative to `reporter`.
    pub path: Arc<[String]>,
    /// Tags of the filed outcome.
    pub tags: ReportTags,
    /// Total count of `reporter` after the change.
    pub total: u64,
}

impl ReportEvent {
    /// Creates an event with the current timestamp and next sequence number.
    pub fn new(kind: ReportEventKind, reporter: impl Into<Arc<str>>) -> Self {
        Self {
            seq: REPORT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            reporter: reporter.into(),
            path: Arc::from(Vec::<String>::new()),
            tags: ReportTags::new(),
            total: 0,
        }
    }

    #[inline]
    pub fn with_path<I, S>(mut self, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.path = path.into_iter().map(Into::into).collect::<Vec<_>>().into();
        self
    }

    #[inline]
    pub fn with_tags(mut self, tags: ReportTags) -> Self {
        self.tags = tags;
        self
    }

    #[inline]
    pub fn with_total(mut self, total: u64) -> Self {
        self.total = total;
        self
    }

    /// Path segments joined with `/`.
    pub fn path_string(&self) -> String {
        self.path.join("/")
    }
}
