//! # ErrorGroup: per-item failures of one batch.
//!
//! A batch operation pushes every per-item error into the group and keeps
//! going. After the batch drained, [`ErrorGroup::into_result`] decides:
//!
//! ```text
//! group empty or warnings only  ──► Ok(group)   (non-fatal, reportable)
//! at least one non-warning      ──► Err(group)  (escalate once)
//! ```

use std::fmt;

use super::MigrateError;

/// Collection of [`MigrateError`]s gathered from a batch without aborting it.
#[derive(Debug, Default, Clone)]
pub struct ErrorGroup {
    errors: Vec<MigrateError>,
}

impl ErrorGroup {
    /// Creates an empty group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one error.
    pub fn push(&mut self, err: MigrateError) {
        self.errors.push(err);
    }

    /// All recorded errors in insertion order.
    pub fn errors(&self) -> &[MigrateError] {
        &self.errors
    }

    /// Recorded warnings.
    pub fn warnings(&self) -> impl Iterator<Item = &MigrateError> {
        self.errors.iter().filter(|e| e.is_warning())
    }

    /// Recorded non-warning errors.
    pub fn failures(&self) -> impl Iterator<Item = &MigrateError> {
        self.errors.iter().filter(|e| !e.is_warning())
    }

    /// True if at least one recorded error is not a warning.
    pub fn has_fatal(&self) -> bool {
        self.errors.iter().any(|e| !e.is_warning())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Escalates only if the group holds a fatal error.
    ///
    /// # Example
    /// ```
    /// use objmigrate::{ErrorGroup, MigrateError};
    ///
    /// let mut group = ErrorGroup::new();
    /// group.push(MigrateError::warning("canceled"));
    /// let group = group.into_result().expect("warnings only");
    ///
    /// let mut group = group;
    /// group.push(MigrateError::fail("boom"));
    /// assert!(group.into_result().is_err());
    /// ```
    pub fn into_result(self) -> Result<Self, Self> {
        if self.has_fatal() { Err(self) } else { Ok(self) }
    }
}

impl Extend<MigrateError> for ErrorGroup {
    fn extend<I: IntoIterator<Item = MigrateError>>(&mut self, iter: I) {
        self.errors.extend(iter);
    }
}

impl fmt::Display for ErrorGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let failures = self.failures().count();
        let warnings = self.errors.len() - failures;
        write!(f, "{failures} failed, {warnings} skipped")?;
        for err in &self.errors {
            write!(f, "\n  - {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorGroup {}
