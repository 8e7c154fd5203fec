use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use objmigrate::{
    Importer, ImporterConfig, MigrateError, MigrationStats, ObjectOrId, Phase, Provider, Record,
    ReportError, ReportTags, Reporter, StatsSink,
};

#[derive(Clone, Debug)]
struct Sub {
    id: String,
    status: &'static str,
}

impl Record for Sub {
    fn id(&self) -> &str {
        &self.id
    }
}

fn sub(id: &str) -> Sub {
    Sub {
        id: id.to_string(),
        status: "active",
    }
}

enum Plan {
    Create(&'static str),
    Warn(&'static str),
    Fail(&'static str),
    Panic,
}

fn planned(plan: Option<&Plan>) -> Result<(), MigrateError> {
    match plan {
        Some(Plan::Warn(msg)) => Err(MigrateError::warning(*msg)),
        Some(Plan::Fail(msg)) => Err(MigrateError::fail(*msg)),
        Some(Plan::Panic) => panic!("provider exploded"),
        Some(Plan::Create(_)) | None => Ok(()),
    }
}

/// In-memory provider: `old` is the source account, `destination` maps a
/// source id to the id of the item created for it.
#[derive(Default)]
struct FakeProvider {
    old: Vec<Sub>,
    plans: HashMap<String, Plan>,
    revert_plans: HashMap<String, Plan>,
    confirm_plans: HashMap<String, Plan>,
    broken_cancel_check: bool,
    destination: Mutex<HashMap<String, String>>,
    canceled: Mutex<HashSet<String>>,
    supported: HashSet<Phase>,
    broken_enumeration_after: Option<usize>,
    delay: Duration,

    recreates: AtomicUsize,
    reverts: AtomicUsize,
    confirms: AtomicUsize,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeProvider {
    fn with_items(ids: &[&str]) -> Self {
        Self {
            old: ids.iter().map(|id| sub(id)).collect(),
            ..Self::default()
        }
    }

    fn plan(mut self, id: &str, plan: Plan) -> Self {
        self.plans.insert(id.to_string(), plan);
        self
    }

    fn revert_plan(mut self, id: &str, plan: Plan) -> Self {
        self.revert_plans.insert(id.to_string(), plan);
        self
    }

    fn confirm_plan(mut self, id: &str, plan: Plan) -> Self {
        self.confirm_plans.insert(id.to_string(), plan);
        self
    }

    fn existing(self, old_id: &str, new_id: &str) -> Self {
        self.destination
            .lock()
            .unwrap()
            .insert(old_id.to_string(), new_id.to_string());
        self
    }

    fn supporting(mut self, phases: &[Phase]) -> Self {
        self.supported.extend(phases.iter().copied());
        self
    }

    fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn cancel(&self, id: &str) {
        self.canceled.lock().unwrap().insert(id.to_string());
    }
}

#[async_trait]
impl Provider for FakeProvider {
    type Item = Sub;

    async fn get_by_id(&self, old_id: &str) -> Result<Sub, MigrateError> {
        self.old
            .iter()
            .find(|s| s.id == old_id)
            .cloned()
            .ok_or_else(|| MigrateError::warning(format!("subscription {old_id} does not exist")))
    }

    fn get_all(&self) -> BoxStream<'_, Result<Sub, MigrateError>> {
        let mut items: Vec<Result<Sub, MigrateError>> = self.old.iter().cloned().map(Ok).collect();
        if let Some(n) = self.broken_enumeration_after {
            items.insert(n, Err(MigrateError::fail("list subscriptions: page token expired")));
        }
        stream::iter(items).boxed()
    }

    async fn find_existing(&self, old: &Sub) -> Result<Option<Sub>, MigrateError> {
        Ok(self.destination.lock().unwrap().get(&old.id).map(|new_id| Sub {
            id: new_id.clone(),
            status: old.status,
        }))
    }

    async fn recreate(&self, old: &Sub, tags: &mut ReportTags) -> Result<String, MigrateError> {
        self.recreates.fetch_add(1, Ordering::SeqCst);
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.running.fetch_sub(1, Ordering::SeqCst);

        tags.push("status", old.status);
        let new_id = match self.plans.get(&old.id) {
            Some(Plan::Warn(msg)) => return Err(MigrateError::warning(*msg)),
            Some(Plan::Fail(msg)) => return Err(MigrateError::fail(*msg)),
            Some(Plan::Panic) => panic!("provider exploded"),
            Some(Plan::Create(new_id)) => new_id.to_string(),
            None => format!("new_{}", old.id),
        };
        self.destination
            .lock()
            .unwrap()
            .insert(old.id.clone(), new_id.clone());
        Ok(new_id)
    }

    fn supports(&self, phase: Phase) -> bool {
        phase == Phase::Recreate || self.supported.contains(&phase)
    }

    async fn revert(&self, old: &Sub, _new: &Sub, _tags: &mut ReportTags) -> Result<(), MigrateError> {
        self.reverts.fetch_add(1, Ordering::SeqCst);
        planned(self.revert_plans.get(&old.id))?;
        self.destination.lock().unwrap().remove(&old.id);
        Ok(())
    }

    async fn confirm(&self, old: &Sub, _new: &Sub, _tags: &mut ReportTags) -> Result<(), MigrateError> {
        self.confirms.fetch_add(1, Ordering::SeqCst);
        planned(self.confirm_plans.get(&old.id))
    }

    async fn is_canceled(&self, old: &Sub) -> Result<bool, MigrateError> {
        if self.broken_cancel_check {
            return Err(MigrateError::fail("fetch subscription status: timed out"));
        }
        Ok(self.canceled.lock().unwrap().contains(&old.id))
    }
}

fn importer(provider: FakeProvider) -> Arc<Importer<FakeProvider>> {
    Importer::builder(provider)
        .with_config(ImporterConfig::new("Subscription"))
        .build()
        .unwrap()
}

fn importer_with_stats(provider: FakeProvider, stats: Arc<MigrationStats>) -> Arc<Importer<FakeProvider>> {
    Importer::builder(provider)
        .with_config(ImporterConfig::new("Subscription"))
        .with_stats(stats as Arc<dyn StatsSink>)
        .build()
        .unwrap()
}

#[tokio::test]
async fn warning_in_batch_is_reported_as_skip() {
    let provider = FakeProvider::with_items(&["1", "2"])
        .plan("1", Plan::Warn("customer is deleted"))
        .plan("2", Plan::Create("newid2"));
    let imp = importer(provider);

    let summary = imp.recreate_all().await.unwrap();
    assert_eq!(summary.phase, Phase::Recreate);
    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.warnings.len(), 1);

    let reporter = imp.reporter();
    assert_eq!(reporter.total_count(), 2);
    assert_eq!(reporter.count(&["recreate", "skipped"]), 1);
    assert_eq!(reporter.count(&["recreate", "succeeded"]), 1);
    assert_eq!(
        reporter.histogram(&["recreate", "skipped"], "reason"),
        vec![("customer is deleted".to_string(), 1)]
    );
    assert_eq!(imp.recreated_id("2").as_deref(), Some("newid2"));
}

#[tokio::test]
async fn failure_in_batch_escalates_after_drain() {
    let provider = FakeProvider::with_items(&["1", "2"])
        .plan("1", Plan::Fail("card declined"))
        .plan("2", Plan::Create("newid2"));
    let imp = importer(provider);

    let group = imp.recreate_all().await.unwrap_err();
    assert!(group.has_fatal());
    assert_eq!(group.failures().count(), 1);
    assert!(group.to_string().contains("Subscription 1: recreate"), "{group}");

    assert_eq!(imp.reporter().total_count(), 2);
    assert_eq!(imp.reporter().count(&["recreate", "failed"]), 1);
    assert_eq!(imp.recreated_id("2").as_deref(), Some("newid2"));
}

#[tokio::test]
async fn existing_destination_item_is_reused() {
    let stats = Arc::new(MigrationStats::new());
    let provider = FakeProvider::with_items(&["1"]).existing("1", "prev_1");
    let imp = importer_with_stats(provider, stats.clone());

    assert_eq!(imp.recreate_by_id("1").await.unwrap(), "prev_1");
    assert_eq!(imp.provider().recreates.load(Ordering::SeqCst), 0);
    assert_eq!(
        imp.reporter().histogram(&["recreate", "skipped"], "reason"),
        vec![("Already created in previous runs".to_string(), 1)]
    );
    assert_eq!(stats.get("Subscription").reused, 1);
    assert_eq!(stats.get("Subscription").imported, 0);
}

#[tokio::test]
async fn concurrent_recreate_of_one_item_mutates_once() {
    let provider = FakeProvider::with_items(&["1"]).delayed(Duration::from_millis(20));
    let imp = importer(provider);
    let item = sub("1");

    let results = futures::future::join_all((0..10).map(|_| imp.recreate(&item))).await;
    for result in results {
        assert_eq!(result.unwrap(), "new_1");
    }
    assert_eq!(imp.provider().recreates.load(Ordering::SeqCst), 1);
    assert_eq!(imp.reporter().total_count(), 1);
}

#[tokio::test]
async fn sequential_recreate_hits_the_cache() {
    let imp = importer(FakeProvider::with_items(&["1"]));
    let item = sub("1");

    assert_eq!(imp.recreate(&item).await.unwrap(), "new_1");
    assert_eq!(imp.recreate(&item).await.unwrap(), "new_1");
    assert_eq!(imp.provider().recreates.load(Ordering::SeqCst), 1);
    assert_eq!(imp.reporter().total_count(), 1);
}

#[tokio::test]
async fn single_item_errors_carry_context() {
    let provider = FakeProvider::with_items(&["1"]).plan("1", Plan::Fail("card declined"));
    let imp = importer(provider);

    let err = imp.recreate_by_object_or_id(ObjectOrId::object(sub("1"))).await.unwrap_err();
    assert!(!err.is_warning());
    assert_eq!(err.to_string(), "Subscription 1: recreate: failed: card declined");

    let err = imp.recreate_by_object_or_id(ObjectOrId::id("missing")).await.unwrap_err();
    assert!(err.is_warning());
    assert_eq!(imp.reporter().count(&["recreate", "skipped"]), 1);
}

#[tokio::test]
async fn batch_respects_max_concurrent() {
    let provider = FakeProvider::with_items(&["1", "2", "3", "4", "5", "6"])
        .delayed(Duration::from_millis(10));
    let mut cfg = ImporterConfig::new("Subscription");
    cfg.max_concurrent = 2;
    let imp = Importer::builder(provider).with_config(cfg).build().unwrap();

    let summary = imp.recreate_all().await.unwrap();
    assert_eq!(summary.attempted, 6);
    assert!(summary.warnings.is_empty());
    assert!(imp.provider().peak.load(Ordering::SeqCst) <= 2);
    assert_eq!(imp.reporter().count(&["recreate", "succeeded"]), 6);
}

#[tokio::test]
async fn enumeration_failure_is_fatal_and_stops_enumeration() {
    let mut provider = FakeProvider::with_items(&["1", "2"]);
    provider.broken_enumeration_after = Some(1);
    let imp = importer(provider);

    let group = imp.recreate_all().await.unwrap_err();
    assert_eq!(group.len(), 1);
    assert!(group.to_string().contains("page token expired"), "{group}");
    assert_eq!(imp.recreated_id("1").as_deref(), Some("new_1"));
    assert_eq!(imp.recreated_id("2"), None);
}

#[tokio::test]
async fn revert_and_confirm_are_noops_when_unsupported() {
    let imp = importer(FakeProvider::with_items(&["1"]));
    imp.recreate_by_id("1").await.unwrap();

    let summary = imp.revert_all().await.unwrap();
    assert_eq!(summary.attempted, 0);
    imp.confirm(&sub("1")).await.unwrap();
    imp.revert_by_id("1").await.unwrap();
    imp.confirm_all().await.unwrap();

    assert_eq!(imp.reporter().total_count(), 1);
    assert_eq!(imp.provider().reverts.load(Ordering::SeqCst), 0);
    assert_eq!(imp.recreated_id("1").as_deref(), Some("new_1"));
}

#[tokio::test]
async fn revert_of_never_created_item_is_a_skip() {
    let provider = FakeProvider::with_items(&["1"]).supporting(&[Phase::Revert]);
    let imp = importer(provider);

    imp.revert_by_id("1").await.unwrap();
    assert_eq!(imp.provider().reverts.load(Ordering::SeqCst), 0);
    assert_eq!(
        imp.reporter().histogram(&["revert", "skipped"], "reason"),
        vec![("Not yet created".to_string(), 1)]
    );
}

#[tokio::test]
async fn revert_forgets_the_destination_item() {
    let stats = Arc::new(MigrationStats::new());
    let provider = FakeProvider::with_items(&["1", "2"]).supporting(&[Phase::Revert]);
    let imp = importer_with_stats(provider, stats.clone());

    imp.recreate_all().await.unwrap();
    let summary = imp.revert_all().await.unwrap();
    assert_eq!(summary.attempted, 2);
    assert!(imp.is_reverted("1"));
    assert_eq!(imp.recreated_id("1"), None);
    assert_eq!(imp.reporter().count(&["revert", "succeeded"]), 2);

    // reverting again is already settled
    imp.revert_by_id("1").await.unwrap();
    assert_eq!(imp.provider().reverts.load(Ordering::SeqCst), 2);

    assert_eq!(imp.recreate_by_id("1").await.unwrap(), "new_1");
    assert_eq!(imp.provider().recreates.load(Ordering::SeqCst), 3);
    assert!(!imp.is_reverted("1"));

    let counts = stats.get("Subscription");
    assert_eq!((counts.imported, counts.reverted), (3, 2));
}

#[tokio::test]
async fn recreate_and_confirm_finalizes_once() {
    let stats = Arc::new(MigrationStats::new());
    let provider = FakeProvider::with_items(&["1"]).supporting(&[Phase::Confirm]);
    let imp = importer_with_stats(provider, stats.clone());

    assert_eq!(imp.recreate_and_confirm(&sub("1")).await.unwrap(), "new_1");
    assert!(imp.is_confirmed("1"));
    imp.confirm_by_object_or_id(ObjectOrId::id("1")).await.unwrap();

    assert_eq!(imp.provider().confirms.load(Ordering::SeqCst), 1);
    assert_eq!(imp.reporter().count(&["confirm", "succeeded"]), 1);
    let counts = stats.get("Subscription");
    assert_eq!((counts.imported, counts.confirmed), (1, 1));
}

#[tokio::test]
async fn confirm_of_canceled_source_reverts_instead() {
    let stats = Arc::new(MigrationStats::new());
    let provider =
        FakeProvider::with_items(&["1"]).supporting(&[Phase::Revert, Phase::Confirm]);
    let imp = importer_with_stats(provider, stats.clone());

    imp.recreate_by_id("1").await.unwrap();
    imp.provider().cancel("1");

    let err = imp.confirm_by_id("1").await.unwrap_err();
    assert!(err.is_warning());
    assert_eq!(
        err.as_message(),
        "Destination undone because source was canceled mid-flight"
    );
    assert_eq!(imp.provider().reverts.load(Ordering::SeqCst), 1);
    assert_eq!(imp.provider().confirms.load(Ordering::SeqCst), 0);
    assert!(imp.is_reverted("1"));
    assert!(!imp.is_confirmed("1"));
    assert_eq!(imp.reporter().count(&["confirm", "skipped"]), 1);
    assert_eq!(stats.get("Subscription").reverted, 1);
}

#[tokio::test]
async fn canceled_sources_in_batch_confirm_are_not_fatal() {
    let provider =
        FakeProvider::with_items(&["1", "2"]).supporting(&[Phase::Revert, Phase::Confirm]);
    let imp = importer(provider);
    imp.recreate_all().await.unwrap();
    imp.provider().cancel("2");

    let summary = imp.confirm_all().await.unwrap();
    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.warnings.len(), 1);
    assert!(imp.is_confirmed("1"));
    assert!(imp.is_reverted("2"));
}

#[tokio::test]
async fn reports_propagate_to_parent_reporter() {
    let total = Reporter::root();
    let subs = Importer::builder(FakeProvider::with_items(&["1", "2"]))
        .with_config(ImporterConfig::new("Subscription"))
        .with_parent(&total)
        .build()
        .unwrap();
    let coupons = Importer::builder(FakeProvider::with_items(&["c1"]).plan("c1", Plan::Warn("expired")))
        .with_config(ImporterConfig::new("Coupon"))
        .with_parent(&total)
        .build()
        .unwrap();

    subs.recreate_all().await.unwrap();
    coupons.recreate_all().await.unwrap();

    assert_eq!(total.total_count(), 3);
    assert_eq!(total.count(&["Subscription", "recreate", "succeeded"]), 2);
    assert_eq!(total.count(&["Coupon", "recreate", "skipped"]), 1);
    assert_eq!(total.histogram(&[], "status"), vec![("active".to_string(), 3)]);

    let duplicate = Importer::builder(FakeProvider::default())
        .with_config(ImporterConfig::new("Coupon"))
        .with_parent(&total)
        .build();
    assert!(matches!(
        duplicate,
        Err(ReportError::DuplicateCategory { .. })
    ));
}

#[tokio::test]
async fn revert_failures_are_isolated_and_escalated() {
    let provider = FakeProvider::with_items(&["1", "2", "3"])
        .supporting(&[Phase::Revert])
        .revert_plan("1", Plan::Fail("delete rejected"))
        .revert_plan("2", Plan::Warn("already deleted by hand"));
    let imp = importer(provider);
    imp.recreate_all().await.unwrap();

    let group = imp.revert_all().await.unwrap_err();
    assert!(group.has_fatal());
    assert_eq!(group.failures().count(), 1);
    assert_eq!(group.warnings().count(), 1);

    let reporter = imp.reporter();
    assert_eq!(reporter.count(&["revert", "failed"]), 1);
    assert_eq!(reporter.count(&["revert", "skipped"]), 1);
    assert_eq!(reporter.count(&["revert", "succeeded"]), 1);

    for id in ["1", "2"] {
        assert!(!imp.is_reverted(id));
        assert_eq!(imp.recreated_id(id), Some(format!("new_{id}")));
    }
    assert!(imp.is_reverted("3"));
}

#[tokio::test]
async fn single_revert_warning_is_returned_with_context() {
    let provider = FakeProvider::with_items(&["1"])
        .supporting(&[Phase::Revert])
        .revert_plan("1", Plan::Warn("already deleted by hand"));
    let imp = importer(provider);
    imp.recreate_by_id("1").await.unwrap();

    let err = imp.revert_by_id("1").await.unwrap_err();
    assert!(err.is_warning());
    assert_eq!(err.to_string(), "Subscription 1: revert: skipped: already deleted by hand");
    assert_eq!(
        imp.reporter().histogram(&["revert", "skipped"], "reason"),
        vec![("already deleted by hand".to_string(), 1)]
    );
    assert!(!imp.is_reverted("1"));
}

#[tokio::test]
async fn confirm_failures_leave_items_unconfirmed() {
    let stats = Arc::new(MigrationStats::new());
    let provider = FakeProvider::with_items(&["1", "2"])
        .supporting(&[Phase::Confirm])
        .confirm_plan("1", Plan::Fail("finalize rejected"))
        .confirm_plan("2", Plan::Warn("plan no longer sold"));
    let imp = importer_with_stats(provider, stats.clone());
    imp.recreate_all().await.unwrap();

    let group = imp.confirm_all().await.unwrap_err();
    assert!(group.has_fatal());
    assert_eq!(imp.reporter().count(&["confirm", "failed"]), 1);
    assert_eq!(imp.reporter().count(&["confirm", "skipped"]), 1);
    assert!(!imp.is_confirmed("1"));
    assert!(!imp.is_confirmed("2"));
    assert_eq!(stats.get("Subscription").confirmed, 0);
}

#[tokio::test]
async fn canceled_source_without_revert_support_is_not_counted_as_reverted() {
    let stats = Arc::new(MigrationStats::new());
    let provider = FakeProvider::with_items(&["1"]).supporting(&[Phase::Confirm]);
    let imp = importer_with_stats(provider, stats.clone());
    imp.recreate_by_id("1").await.unwrap();
    imp.provider().cancel("1");

    let err = imp.confirm_by_id("1").await.unwrap_err();
    assert!(err.is_warning());
    assert_eq!(imp.reporter().count(&["confirm", "skipped"]), 1);
    assert_eq!(imp.provider().reverts.load(Ordering::SeqCst), 0);
    assert_eq!(imp.provider().confirms.load(Ordering::SeqCst), 0);
    assert_eq!(stats.get("Subscription").reverted, 0);
    assert!(!imp.is_reverted("1"));
    assert!(!imp.is_confirmed("1"));
    assert_eq!(imp.recreated_id("1").as_deref(), Some("new_1"));
}

#[tokio::test]
async fn failing_cancel_check_fails_the_confirm() {
    let mut provider = FakeProvider::with_items(&["1"]).supporting(&[Phase::Confirm]);
    provider.broken_cancel_check = true;
    let imp = importer(provider);
    imp.recreate_by_id("1").await.unwrap();

    let err = imp.confirm_by_id("1").await.unwrap_err();
    assert!(!err.is_warning());
    assert_eq!(err.as_message(), "fetch subscription status: timed out");
    assert_eq!(imp.reporter().count(&["confirm", "failed"]), 1);
    assert_eq!(imp.provider().confirms.load(Ordering::SeqCst), 0);
    assert!(!imp.is_confirmed("1"));
}

#[tokio::test]
async fn panicking_provider_fails_only_its_item() {
    let provider = FakeProvider::with_items(&["1", "2"]).plan("1", Plan::Panic);
    let imp = importer(provider);

    let group = imp.recreate_all().await.unwrap_err();
    assert!(group.has_fatal());
    assert_eq!(group.len(), 1);
    assert!(group.to_string().contains("panicked"), "{group}");
    assert_eq!(imp.reporter().count(&["recreate", "failed"]), 1);
    assert_eq!(imp.reporter().count(&["recreate", "succeeded"]), 1);
    assert_eq!(imp.recreated_id("2").as_deref(), Some("new_2"));
    assert_eq!(imp.recreated_id("1"), None);
}
