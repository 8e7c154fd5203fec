//! # LogListener: writes reporter events through `tracing`.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO objmigrate::reporting::log: reported reporter=Subscription path=recreate/succeeded total=3 tags=status="active"
//! INFO objmigrate::reporting::log: child attached reporter=Total child=Subscription
//! ```

use async_trait::async_trait;

use super::{ReportEvent, ReportEventKind, ReportListener};

/// Reporter listener that logs every event at `info` level.
#[derive(Default)]
pub struct LogListener;

impl LogListener {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ReportListener for LogListener {
    async fn on_report(&self, e: &ReportEvent) {
        match e.kind {
            ReportEventKind::Reported => {
                tracing::info!(
                    reporter = %e.reporter,
                    path = %e.path_string(),
                    total = e.total,
                    tags = %e.tags,
                    "reported"
                );
            }
            ReportEventKind::ChildAttached => {
                tracing::info!(reporter = %e.reporter, child = %e.path_string(), "child attached");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogListener"
    }
}
