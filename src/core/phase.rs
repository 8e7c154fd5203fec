//! Migration phases and per-item outcomes, as used for report paths.

use crate::reporting::ReportingCategory;

/// One phase of the three-phase migration protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Create the destination item.
    Recreate,
    /// Undo a previously recreated item.
    Revert,
    /// Finalize a previously recreated item.
    Confirm,
}

impl Phase {
    /// Stable label, also the report category key.
    pub fn as_label(&self) -> &'static str {
        match self {
            Phase::Recreate => "recreate",
            Phase::Revert => "revert",
            Phase::Confirm => "confirm",
        }
    }

    pub fn category(&self) -> ReportingCategory {
        ReportingCategory::new(self.as_label())
    }
}

/// Terminal outcome of one item within one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Succeeded,
    Skipped,
    Failed,
}

impl Outcome {
    /// Stable label, also the report category key.
    pub fn as_label(&self) -> &'static str {
        match self {
            Outcome::Succeeded => "succeeded",
            Outcome::Skipped => "skipped",
            Outcome::Failed => "failed",
        }
    }

    pub fn category(&self) -> ReportingCategory {
        ReportingCategory::new(self.as_label())
    }
}
