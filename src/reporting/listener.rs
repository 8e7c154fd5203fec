//! # Reporter listener trait.
//!
//! [`ReportListener`] is the extension point for reacting to reporter changes
//! (progress displays, metrics export, audit logs).
//!
//! Each listener attached through a [`ListenerSet`](crate::ListenerSet) gets:
//! - a **dedicated worker task**,
//! - a **bounded queue** (capacity via [`ReportListener::queue_capacity`]),
//! - **panic isolation** (panics are caught and logged).
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use objmigrate::{ReportEvent, ReportListener};
//!
//! struct Progress;
//!
//! #[async_trait]
//! impl ReportListener for Progress {
//!     async fn on_report(&self, ev: &ReportEvent) {
//!         if ev.path.last().map(String::as_str) == Some("failed") {
//!             // bump a failure gauge, etc.
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "progress" }
//! }
//! ```

use async_trait::async_trait;

use super::ReportEvent;

/// Listener of [`ReportEvent`]s.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor.
/// - Handle errors internally; do not panic.
/// - Slow processing only affects this listener's queue.
#[async_trait]
pub trait ReportListener: Send + Sync + 'static {
    /// Processes one event. Events arrive in FIFO order per listener.
    async fn on_report(&self, event: &ReportEvent);

    /// Name used in logs when the queue overflows or the listener panics.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred queue capacity (clamped to at least 1). Default: 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
