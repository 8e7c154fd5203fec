use std::sync::Arc;

use super::{Importer, ImporterConfig};
use crate::errors::ReportError;
use crate::providers::Provider;
use crate::reporting::{ReportingCategory, Reporter};
use crate::stats::StatsSink;

/// Builder for constructing an [`Importer`] with optional wiring.
pub struct ImporterBuilder<P: Provider> {
    provider: P,
    cfg: ImporterConfig,
    parent: Option<Reporter>,
    stats: Option<Arc<dyn StatsSink>>,
}

impl<P: Provider> ImporterBuilder<P> {
    /// Creates a builder with [`ImporterConfig::default`].
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            cfg: ImporterConfig::default(),
            parent: None,
            stats: None,
        }
    }

    pub fn with_config(mut self, cfg: ImporterConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Attaches the importer's reporter under `parent` at build time.
    ///
    /// Reports then propagate to `parent` for cross-object-kind aggregation.
    pub fn with_parent(mut self, parent: &Reporter) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    /// Sets the sink incremented on every successful mutation.
    pub fn with_stats(mut self, stats: Arc<dyn StatsSink>) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Builds the importer.
    ///
    /// # Errors
    /// [`ReportError::DuplicateCategory`] if the parent already has a child
    /// named like `object_name`.
    pub fn build(self) -> Result<Arc<Importer<P>>, ReportError> {
        let reporter = Reporter::new(ReportingCategory::new(self.cfg.object_name.clone()));
        if let Some(parent) = &self.parent {
            parent.add_child_reporter(&reporter)?;
        }
        Ok(Arc::new(Importer::new_internal(
            self.provider,
            self.cfg,
            reporter,
            self.stats,
        )))
    }
}
