use std::any::Any;
use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

use crate::reporting::ReportTags;

/// # Outcome of a failed migration step for one item.
///
/// Providers return these from their capability methods; the importer files
/// them into the reporter and hands them back to the caller (single-item calls)
/// or into an [`ErrorGroup`](crate::ErrorGroup) (batch calls).
///
/// The type is `Clone` so that a coalesced call can hand the identical settled
/// outcome to every waiter; underlying causes are shared through `Arc`.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum MigrateError {
    /// Skip this item, not a bug: disqualifying status, unmet precondition,
    /// missing resource.
    #[error("skipped: {message}")]
    Warning {
        /// Why the item was skipped.
        message: String,
        /// Observations folded into the skip report.
        tags: ReportTags,
    },

    /// Unexpected failure for this item (remote failure or bug).
    #[error("failed: {message}")]
    Fail {
        /// What went wrong.
        message: String,
        /// Underlying cause, if any.
        #[source]
        cause: Option<Arc<dyn StdError + Send + Sync + 'static>>,
    },

    /// Any of the above, wrapped with item context.
    #[error("{context}: {source}")]
    Context {
        /// Context line, e.g. `"Subscription sub_123: recreate"`.
        context: String,
        /// Wrapped error.
        #[source]
        source: Box<MigrateError>,
    },
}

impl MigrateError {
    /// Creates a warning without tags.
    pub fn warning(message: impl Into<String>) -> Self {
        MigrateError::Warning {
            message: message.into(),
            tags: ReportTags::new(),
        }
    }

    /// Creates a warning that carries report tags.
    pub fn warning_with_tags(message: impl Into<String>, tags: ReportTags) -> Self {
        MigrateError::Warning {
            message: message.into(),
            tags,
        }
    }

    /// Creates a fatal error from a message.
    pub fn fail(message: impl Into<String>) -> Self {
        MigrateError::Fail {
            message: message.into(),
            cause: None,
        }
    }

    /// Creates a fatal error that keeps `cause` as its source.
    pub fn fail_with(
        message: impl Into<String>,
        cause: impl StdError + Send + Sync + 'static,
    ) -> Self {
        MigrateError::Fail {
            message: message.into(),
            cause: Some(Arc::new(cause)),
        }
    }

    /// Wraps `self` with a context line; classification is preserved.
    pub fn context(self, context: impl Into<String>) -> Self {
        MigrateError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, skipping context layers.
    pub fn root(&self) -> &MigrateError {
        match self {
            MigrateError::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// True if the innermost error is a [`MigrateError::Warning`].
    ///
    /// # Example
    /// ```
    /// use objmigrate::MigrateError;
    ///
    /// let err = MigrateError::warning("customer deleted").context("Subscription sub_1: recreate");
    /// assert!(err.is_warning());
    /// assert!(!MigrateError::fail("boom").is_warning());
    /// ```
    pub fn is_warning(&self) -> bool {
        matches!(self.root(), MigrateError::Warning { .. })
    }

    /// Tags carried by the innermost warning, if any.
    pub fn tags(&self) -> Option<&ReportTags> {
        match self.root() {
            MigrateError::Warning { tags, .. } => Some(tags),
            _ => None,
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self.root() {
            MigrateError::Warning { .. } => "migrate_warning",
            _ => "migrate_failed",
        }
    }

    /// Returns the innermost message without the context chain.
    pub fn as_message(&self) -> String {
        match self.root() {
            MigrateError::Warning { message, .. } => message.clone(),
            MigrateError::Fail {
                message,
                cause: Some(cause),
            } => format!("{message}: {cause}"),
            MigrateError::Fail { message, .. } => message.clone(),
            MigrateError::Context { context, .. } => context.clone(),
        }
    }
}

/// # Misuse of the reporter tree.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    /// The child reporter already has a parent.
    #[error("reporter `{category}` is already attached to a parent")]
    AlreadyAttached {
        /// Category key of the child.
        category: String,
    },

    /// The parent already has a child (reporter or category) under this key.
    #[error("category `{category}` already exists under `{parent}`")]
    DuplicateCategory {
        /// Category key of the parent.
        parent: String,
        /// Conflicting child key.
        category: String,
    },

    /// Attaching would make the reporter its own ancestor.
    #[error("reporter `{category}` cannot be attached below itself")]
    Cycle {
        /// Category key of the child.
        category: String,
    },
}

impl ReportError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ReportError::AlreadyAttached { .. } => "reporter_already_attached",
            ReportError::DuplicateCategory { .. } => "reporter_duplicate_category",
            ReportError::Cycle { .. } => "reporter_cycle",
        }
    }
}

/// Extracts a readable message from a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
