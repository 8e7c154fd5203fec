//! # Importer configuration.
//!
//! Provides [`ImporterConfig`], the construction options of one
//! [`Importer`](crate::Importer).
//!
//! ## Sentinel values
//! - `max_concurrent = 0` → unlimited (no semaphore created by the batch queue)

/// Construction options for an importer.
///
/// ## Field semantics
/// - `object_name`: reporting label of the migrated object kind (e.g. `"Subscription"`);
///   also the category key of the importer's reporter
/// - `max_concurrent`: in-flight provider jobs per batch call (`0` = unlimited)
/// - `verbose`: log the full error chain (`Debug`) instead of the message only
#[derive(Clone, Debug)]
pub struct ImporterConfig {
    /// Reporting label of the migrated object kind.
    pub object_name: String,

    /// Maximum number of items processed concurrently by batch calls.
    ///
    /// - `0` = unlimited
    /// - `n > 0` = at most `n` items in flight, admitted FIFO
    pub max_concurrent: usize,

    /// Log full error chains.
    pub verbose: bool,
}

impl ImporterConfig {
    /// Creates the default configuration for `object_name`.
    pub fn new(object_name: impl Into<String>) -> Self {
        Self {
            object_name: object_name.into(),
            ..Self::default()
        }
    }

    /// Returns the batch concurrency limit as an `Option`.
    ///
    /// - `None` → unlimited
    /// - `Some(n)` → at most `n` concurrent items
    #[inline]
    pub fn concurrency_limit(&self) -> Option<usize> {
        if self.max_concurrent == 0 {
            None
        } else {
            Some(self.max_concurrent)
        }
    }
}

impl Default for ImporterConfig {
    /// Default configuration:
    ///
    /// - `object_name = "Object"`
    /// - `max_concurrent = 10` (keeps remote rate limits in check)
    /// - `verbose = false`
    fn default() -> Self {
        Self {
            object_name: "Object".to_string(),
            max_concurrent: 10,
            verbose: false,
        }
    }
}
