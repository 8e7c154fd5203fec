//! # Importer: idempotent recreate/revert/confirm of one object kind.
//!
//! The [`Importer`] drives a [`Provider`] through the three-phase migration
//! protocol. Every outcome is filed into the importer's own [`Reporter`]
//! (category = `object_name`) and every successful mutation is counted by the
//! optional [`StatsSink`].
//!
//! ## Recreate of one item
//! ```text
//! recreate(item)
//!   ├─ recreated[id] known ─────────────────────────────► cached id   (no report)
//!   └─ ReuseLastCall("id") ── one execution per id ──┐
//!        ├─ find_existing hit ──► cache ──► [recreate, skipped]  reason="Already created in previous runs"
//!        └─ provider.recreate
//!             ├─ Ok(new_id) ────► cache ──► [recreate, succeeded]
//!             ├─ Warning ───────────────► [recreate, skipped]   reason=<message>  → Err(context)
//!             └─ Fail ──────────────────► [recreate, failed]                      → Err(context)
//! ```
//!
//! ## Batch calls
//! ```text
//! *_all() ──► get_all() ──► Queue::admit (max_concurrent) ──► one job per item
//!                                                         └─ Err → ErrorGroup
//! enumeration pauses while all slots are taken
//! drain ──► ErrorGroup::into_result ──► Ok(BatchSummary) | Err(group)  (fatal only)
//! ```
//!
//! ## Rules
//! - At most one in-flight provider mutation per id per phase; two callers
//!   racing on the same id observe the identical result.
//! - A settled recreate is never re-attempted by this importer; a successful
//!   revert forgets the destination id so the item can be recreated again.
//! - Revert and confirm are no-ops when the provider lacks the capability.
//! - No state lock is held across an `.await`.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::{FutureExt, StreamExt};

use super::{ImporterBuilder, ImporterConfig, Outcome, Phase, Queue, ReuseLastCall};
use crate::errors::{ErrorGroup, MigrateError, panic_message};
use crate::providers::{ObjectOrId, Provider, Record};
use crate::reporting::{ReportTags, Reporter};
use crate::stats::StatsSink;

const REASON_REUSED: &str = "Already created in previous runs";
const REASON_NOT_CREATED: &str = "Not yet created";
const REASON_SOURCE_CANCELED: &str = "Destination undone because source was canceled mid-flight";

/// Result of a batch call without fatal errors.
#[derive(Debug, Clone)]
pub struct BatchSummary {
    /// Phase the batch ran.
    pub phase: Phase,
    /// Number of items enumerated and enqueued.
    pub attempted: usize,
    /// Skips collected along the way (never fatal).
    pub warnings: ErrorGroup,
}

#[derive(Default)]
struct ImporterState {
    /// old id → new id.
    recreated: HashMap<String, String>,
    reverted: HashSet<String>,
    confirmed: HashSet<String>,
}

/// Orchestrator for one migrated object kind.
///
/// Built through [`Importer::builder`]; shared as `Arc<Importer<P>>` because
/// batch jobs and coalesced calls hold their own handle.
pub struct Importer<P: Provider> {
    provider: P,
    cfg: ImporterConfig,
    reporter: Reporter,
    stats: Option<Arc<dyn StatsSink>>,
    state: Mutex<ImporterState>,
    recreate_calls: ReuseLastCall<Result<String, MigrateError>>,
    revert_calls: ReuseLastCall<Result<(), MigrateError>>,
    confirm_calls: ReuseLastCall<Result<(), MigrateError>>,
}

impl<P: Provider> Importer<P> {
    /// Starts building an importer around `provider`.
    pub fn builder(provider: P) -> ImporterBuilder<P> {
        ImporterBuilder::new(provider)
    }

    pub(crate) fn new_internal(
        provider: P,
        cfg: ImporterConfig,
        reporter: Reporter,
        stats: Option<Arc<dyn StatsSink>>,
    ) -> Self {
        Self {
            provider,
            cfg,
            reporter,
            stats,
            state: Mutex::new(ImporterState::default()),
            recreate_calls: ReuseLastCall::new(),
            revert_calls: ReuseLastCall::new(),
            confirm_calls: ReuseLastCall::new(),
        }
    }

    /// Reporter receiving this importer's outcomes.
    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    pub fn config(&self) -> &ImporterConfig {
        &self.cfg
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Destination id recorded for `old_id` by this importer, if any.
    pub fn recreated_id(&self, old_id: &str) -> Option<String> {
        self.lock().recreated.get(old_id).cloned()
    }

    pub fn is_reverted(&self, old_id: &str) -> bool {
        self.lock().reverted.contains(old_id)
    }

    pub fn is_confirmed(&self, old_id: &str) -> bool {
        self.lock().confirmed.contains(old_id)
    }

    // ---- recreate ----

    /// Fetches the source item and recreates it.
    pub async fn recreate_by_id(self: &Arc<Self>, old_id: &str) -> Result<String, MigrateError> {
        let item = self.fetch(Phase::Recreate, old_id).await?;
        self.recreate(&item).await
    }

    pub async fn recreate_by_object_or_id(
        self: &Arc<Self>,
        target: ObjectOrId<P::Item>,
    ) -> Result<String, MigrateError> {
        match target {
            ObjectOrId::Object(item) => self.recreate(&item).await,
            ObjectOrId::Id(id) => self.recreate_by_id(&id).await,
        }
    }

    /// Recreates `item` in the destination and returns the destination id.
    ///
    /// # Errors
    /// The provider's [`MigrateError`], wrapped with `"<object> <id>: recreate"`.
    pub async fn recreate(self: &Arc<Self>, item: &P::Item) -> Result<String, MigrateError> {
        let id = item.id().to_string();
        if let Some(new_id) = self.recreated_id(&id) {
            tracing::debug!(object = %self.cfg.object_name, id = %id, "recreate cache hit");
            return Ok(new_id);
        }

        let this = Arc::clone(self);
        let item = item.clone();
        self.recreate_calls
            .schedule(&id, move || async move { this.recreate_once(item).await })
            .await
    }

    /// Recreates `item`, then confirms it.
    pub async fn recreate_and_confirm(
        self: &Arc<Self>,
        item: &P::Item,
    ) -> Result<String, MigrateError> {
        let new_id = self.recreate(item).await?;
        self.confirm(item).await?;
        Ok(new_id)
    }

    /// Recreates every source item.
    ///
    /// # Errors
    /// The collected [`ErrorGroup`] if at least one item failed with a
    /// non-warning error or the enumeration itself failed.
    pub async fn recreate_all(self: &Arc<Self>) -> Result<BatchSummary, ErrorGroup> {
        self.run_all(Phase::Recreate, |this, item| async move {
            this.recreate(&item).await.map(|_| ())
        })
        .await
    }

    // ---- revert ----

    pub async fn revert_by_id(self: &Arc<Self>, old_id: &str) -> Result<(), MigrateError> {
        if !self.provider.supports(Phase::Revert) {
            return Ok(());
        }
        let item = self.fetch(Phase::Revert, old_id).await?;
        self.revert(&item).await
    }

    pub async fn revert_by_object_or_id(
        self: &Arc<Self>,
        target: ObjectOrId<P::Item>,
    ) -> Result<(), MigrateError> {
        match target {
            ObjectOrId::Object(item) => self.revert(&item).await,
            ObjectOrId::Id(id) => self.revert_by_id(&id).await,
        }
    }

    /// Undoes the destination item of `item`.
    ///
    /// An item that was never recreated is reported as a skip and is not an error.
    pub async fn revert(self: &Arc<Self>, item: &P::Item) -> Result<(), MigrateError> {
        if !self.provider.supports(Phase::Revert) {
            return Ok(());
        }
        let id = item.id().to_string();
        if self.is_reverted(&id) {
            tracing::debug!(object = %self.cfg.object_name, id = %id, "already reverted");
            return Ok(());
        }

        let this = Arc::clone(self);
        let item = item.clone();
        self.revert_calls
            .schedule(&id, move || async move { this.revert_once(item).await })
            .await
    }

    pub async fn revert_all(self: &Arc<Self>) -> Result<BatchSummary, ErrorGroup> {
        if !self.provider.supports(Phase::Revert) {
            return Ok(BatchSummary::empty(Phase::Revert));
        }
        self.run_all(Phase::Revert, |this, item| async move { this.revert(&item).await })
            .await
    }

    // ---- confirm ----

    pub async fn confirm_by_id(self: &Arc<Self>, old_id: &str) -> Result<(), MigrateError> {
        if !self.provider.supports(Phase::Confirm) {
            return Ok(());
        }
        let item = self.fetch(Phase::Confirm, old_id).await?;
        self.confirm(&item).await
    }

    pub async fn confirm_by_object_or_id(
        self: &Arc<Self>,
        target: ObjectOrId<P::Item>,
    ) -> Result<(), MigrateError> {
        match target {
            ObjectOrId::Object(item) => self.confirm(&item).await,
            ObjectOrId::Id(id) => self.confirm_by_id(&id).await,
        }
    }

    /// Finalizes the destination item of `item`.
    ///
    /// If the source item was canceled meanwhile, the destination item is
    /// reverted instead and a warning is returned.
    pub async fn confirm(self: &Arc<Self>, item: &P::Item) -> Result<(), MigrateError> {
        if !self.provider.supports(Phase::Confirm) {
            return Ok(());
        }
        let id = item.id().to_string();
        if self.is_confirmed(&id) {
            tracing::debug!(object = %self.cfg.object_name, id = %id, "already confirmed");
            return Ok(());
        }

        let this = Arc::clone(self);
        let item = item.clone();
        self.confirm_calls
            .schedule(&id, move || async move { this.confirm_once(item).await })
            .await
    }

    pub async fn confirm_all(self: &Arc<Self>) -> Result<BatchSummary, ErrorGroup> {
        if !self.provider.supports(Phase::Confirm) {
            return Ok(BatchSummary::empty(Phase::Confirm));
        }
        self.run_all(Phase::Confirm, |this, item| async move { this.confirm(&item).await })
            .await
    }

    // ---- single executions (run inside ReuseLastCall) ----

    async fn recreate_once(&self, item: P::Item) -> Result<String, MigrateError> {
        let phase = Phase::Recreate;
        let id = item.id();
        if let Some(new_id) = self.recreated_id(id) {
            return Ok(new_id);
        }

        let mut tags = ReportTags::new();
        match self.provider.find_existing(&item).await {
            Ok(Some(existing)) => {
                let new_id = existing.id().to_string();
                self.remember_recreated(id, &new_id);
                tags.push("reason", REASON_REUSED);
                self.report(phase, Outcome::Skipped, &tags);
                self.track(|s, object| s.track_reused(object));
                tracing::info!(
                    object = %self.cfg.object_name, id, new_id = %new_id,
                    "reused destination item from a previous run"
                );
                return Ok(new_id);
            }
            Ok(None) => {}
            Err(err) => return Err(self.failed(phase, id, err, tags)),
        }

        match self.provider.recreate(&item, &mut tags).await {
            Ok(new_id) => {
                self.remember_recreated(id, &new_id);
                self.report(phase, Outcome::Succeeded, &tags);
                self.track(|s, object| s.track_imported(object));
                tracing::info!(object = %self.cfg.object_name, id, new_id = %new_id, "recreated");
                Ok(new_id)
            }
            Err(err) => Err(self.failed(phase, id, err, tags)),
        }
    }

    async fn revert_once(&self, item: P::Item) -> Result<(), MigrateError> {
        let phase = Phase::Revert;
        let id = item.id();
        if self.is_reverted(id) {
            return Ok(());
        }

        let mut tags = ReportTags::new();
        let existing = match self.provider.find_existing(&item).await {
            Ok(Some(existing)) => existing,
            Ok(None) => {
                self.not_yet_created(phase, id, tags);
                return Ok(());
            }
            Err(err) => return Err(self.failed(phase, id, err, tags)),
        };

        if let Err(err) = self.provider.revert(&item, &existing, &mut tags).await {
            return Err(self.failed(phase, id, err, tags));
        }
        self.remember_reverted(id);
        self.report(phase, Outcome::Succeeded, &tags);
        self.track(|s, object| s.track_reverted(object));
        tracing::info!(object = %self.cfg.object_name, id, new_id = existing.id(), "reverted");
        Ok(())
    }

    async fn confirm_once(&self, item: P::Item) -> Result<(), MigrateError> {
        let phase = Phase::Confirm;
        let id = item.id();
        if self.is_confirmed(id) {
            return Ok(());
        }

        let mut tags = ReportTags::new();
        let existing = match self.provider.find_existing(&item).await {
            Ok(Some(existing)) => existing,
            Ok(None) => {
                self.not_yet_created(phase, id, tags);
                return Ok(());
            }
            Err(err) => return Err(self.failed(phase, id, err, tags)),
        };

        match self.provider.is_canceled(&item).await {
            Ok(false) => {}
            Ok(true) => {
                if self.provider.supports(Phase::Revert) {
                    if let Err(err) = self.provider.revert(&item, &existing, &mut tags).await {
                        return Err(self.failed(phase, id, err, tags));
                    }
                    self.remember_reverted(id);
                    self.track(|s, object| s.track_reverted(object));
                }
                let warning = MigrateError::warning(REASON_SOURCE_CANCELED);
                return Err(self.failed(phase, id, warning, tags));
            }
            Err(err) => return Err(self.failed(phase, id, err, tags)),
        }

        if let Err(err) = self.provider.confirm(&item, &existing, &mut tags).await {
            return Err(self.failed(phase, id, err, tags));
        }
        self.lock().confirmed.insert(id.to_string());
        self.report(phase, Outcome::Succeeded, &tags);
        self.track(|s, object| s.track_confirmed(object));
        tracing::info!(object = %self.cfg.object_name, id, new_id = existing.id(), "confirmed");
        Ok(())
    }

    // ---- batch ----

    async fn run_all<F, Fut>(self: &Arc<Self>, phase: Phase, op: F) -> Result<BatchSummary, ErrorGroup>
    where
        F: Fn(Arc<Self>, P::Item) -> Fut,
        Fut: Future<Output = Result<(), MigrateError>> + Send + 'static,
    {
        let queue = Queue::new(self.cfg.concurrency_limit());
        let errors = Arc::new(Mutex::new(ErrorGroup::new()));
        let mut attempted = 0usize;

        let mut items = self.provider.get_all();
        while let Some(next) = items.next().await {
            let item = match next {
                Ok(item) => item,
                Err(err) => {
                    tracing::error!(
                        object = %self.cfg.object_name, phase = phase.as_label(), error = %err,
                        "enumeration failed"
                    );
                    let err = err.context(format!("{} enumeration", self.cfg.object_name));
                    lock_group(&errors).push(err);
                    break;
                }
            };

            attempted += 1;
            let id = item.id().to_string();
            let job = op(Arc::clone(self), item);
            let this = Arc::clone(self);
            let errors = Arc::clone(&errors);
            queue
                .admit(async move {
                    let err = match std::panic::AssertUnwindSafe(job).catch_unwind().await {
                        Ok(Ok(())) => return,
                        Ok(Err(err)) => err,
                        Err(panic_err) => {
                            let panicked = MigrateError::fail(format!(
                                "panicked: {}",
                                panic_message(&*panic_err)
                            ));
                            this.failed(phase, &id, panicked, ReportTags::new())
                        }
                    };
                    lock_group(&errors).push(err);
                })
                .await;
        }
        drop(items);

        queue.wait_until_finished().await;
        let group = std::mem::take(&mut *lock_group(&errors));
        tracing::debug!(
            object = %self.cfg.object_name, phase = phase.as_label(), attempted,
            errors = group.len(), "batch drained"
        );
        group.into_result().map(|warnings| BatchSummary {
            phase,
            attempted,
            warnings,
        })
    }

    // ---- internals ----

    async fn fetch(&self, phase: Phase, old_id: &str) -> Result<P::Item, MigrateError> {
        self.provider
            .get_by_id(old_id)
            .await
            .map_err(|err| self.failed(phase, old_id, err, ReportTags::new()))
    }

    /// Files a skip or failure, logs it and returns the error with item context.
    fn failed(&self, phase: Phase, id: &str, err: MigrateError, mut tags: ReportTags) -> MigrateError {
        let object = &self.cfg.object_name;
        if let Some(extra) = err.tags() {
            tags.extend_from(extra);
        }

        if err.is_warning() {
            tags.push("reason", err.as_message());
            self.report(phase, Outcome::Skipped, &tags);
            if self.cfg.verbose {
                tracing::warn!(object = %object, id, phase = phase.as_label(), error = ?err, "skipped");
            } else {
                tracing::warn!(object = %object, id, phase = phase.as_label(), reason = %err.as_message(), "skipped");
            }
        } else {
            self.report(phase, Outcome::Failed, &tags);
            if self.cfg.verbose {
                tracing::error!(object = %object, id, phase = phase.as_label(), error = ?err, "failed");
            } else {
                tracing::error!(object = %object, id, phase = phase.as_label(), error = %err, "failed");
            }
        }

        err.context(format!("{object} {id}: {}", phase.as_label()))
    }

    fn not_yet_created(&self, phase: Phase, id: &str, mut tags: ReportTags) {
        tags.push("reason", REASON_NOT_CREATED);
        self.report(phase, Outcome::Skipped, &tags);
        tracing::warn!(
            object = %self.cfg.object_name, id, phase = phase.as_label(),
            "skipped: destination item not found"
        );
    }

    fn report(&self, phase: Phase, outcome: Outcome, tags: &ReportTags) {
        self.reporter
            .report([phase.category(), outcome.category()], tags);
    }

    fn track(&self, f: impl FnOnce(&dyn StatsSink, &str)) {
        if let Some(stats) = &self.stats {
            f(stats.as_ref(), &self.cfg.object_name);
        }
    }

    fn remember_recreated(&self, old_id: &str, new_id: &str) {
        let mut st = self.lock();
        st.recreated.insert(old_id.to_string(), new_id.to_string());
        st.reverted.remove(old_id);
    }

    fn remember_reverted(&self, old_id: &str) {
        let mut st = self.lock();
        st.recreated.remove(old_id);
        st.confirmed.remove(old_id);
        st.reverted.insert(old_id.to_string());
    }

    fn lock(&self) -> MutexGuard<'_, ImporterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BatchSummary {
    fn empty(phase: Phase) -> Self {
        Self {
            phase,
            attempted: 0,
            warnings: ErrorGroup::new(),
        }
    }
}

fn lock_group(errors: &Mutex<ErrorGroup>) -> MutexGuard<'_, ErrorGroup> {
    errors.lock().unwrap_or_else(PoisonError::into_inner)
}
