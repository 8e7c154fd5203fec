//! # Example: Two-kind migration with reporting
//!
//! Migrates customers and subscriptions between two in-memory "accounts",
//! confirms them, then prints the reporter tree and the stats summary.
//!
//! Run with:
//! ```text
//! RUST_LOG=info cargo run --example migrate_demo --features logging
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use tracing_subscriber::EnvFilter;

use objmigrate::{
    Importer, ImporterConfig, ListenerSet, LogListener, MigrateError, MigrationStats, Phase,
    Provider, Record, ReportListener, ReportTags, Reporter, StatsSink,
};

#[derive(Clone, Debug)]
struct Item {
    id: String,
    status: &'static str,
}

impl Record for Item {
    fn id(&self) -> &str {
        &self.id
    }
}

/// One object kind of a fake remote system.
struct Account {
    prefix: &'static str,
    old: Vec<Item>,
    /// Destination items keyed by the source id stored on them as a marker.
    new: Mutex<HashMap<String, Item>>,
}

impl Account {
    fn new(prefix: &'static str, old: &[(&str, &'static str)]) -> Self {
        Self {
            prefix,
            old: old
                .iter()
                .map(|&(id, status)| Item {
                    id: id.to_string(),
                    status,
                })
                .collect(),
            new: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl Provider for Account {
    type Item = Item;

    async fn get_by_id(&self, old_id: &str) -> Result<Item, MigrateError> {
        self.old
            .iter()
            .find(|i| i.id == old_id)
            .cloned()
            .ok_or_else(|| MigrateError::warning(format!("{old_id} not found")))
    }

    fn get_all(&self) -> BoxStream<'_, Result<Item, MigrateError>> {
        stream::iter(self.old.iter().cloned().map(Ok)).boxed()
    }

    async fn find_existing(&self, old: &Item) -> Result<Option<Item>, MigrateError> {
        Ok(self
            .new
            .lock()
            .map_err(|_| MigrateError::fail("destination lock poisoned"))?
            .get(&old.id)
            .cloned())
    }

    async fn recreate(&self, old: &Item, tags: &mut ReportTags) -> Result<String, MigrateError> {
        tags.push("status", old.status);
        tokio::time::sleep(Duration::from_millis(20)).await;
        match old.status {
            "canceled" => return Err(MigrateError::warning("source is canceled")),
            "broken" => return Err(MigrateError::fail("remote rejected the payload")),
            _ => {}
        }
        let new = Item {
            id: format!("{}_new_{}", self.prefix, old.id),
            status: old.status,
        };
        let new_id = new.id.clone();
        self.new
            .lock()
            .map_err(|_| MigrateError::fail("destination lock poisoned"))?
            .insert(old.id.clone(), new);
        Ok(new_id)
    }

    fn supports(&self, phase: Phase) -> bool {
        matches!(phase, Phase::Recreate | Phase::Confirm)
    }

    async fn confirm(&self, _old: &Item, new: &Item, tags: &mut ReportTags) -> Result<(), MigrateError> {
        tags.push("confirmed", new.id.clone());
        Ok(())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let total = Reporter::root();
    let listeners: Vec<Arc<dyn ReportListener>> = vec![Arc::new(LogListener::new())];
    let listener_set = ListenerSet::attach(&total, listeners);
    let stats = Arc::new(MigrationStats::new());

    let customers = Importer::builder(Account::new(
        "cus",
        &[("c1", "active"), ("c2", "active"), ("c3", "canceled")],
    ))
    .with_config(ImporterConfig::new("Customer"))
    .with_parent(&total)
    .with_stats(stats.clone() as Arc<dyn StatsSink>)
    .build()?;

    let mut cfg = ImporterConfig::new("Subscription");
    cfg.max_concurrent = 2;
    cfg.verbose = true;
    let subscriptions = Importer::builder(Account::new(
        "sub",
        &[("s1", "active"), ("s2", "trialing"), ("s3", "broken")],
    ))
    .with_config(cfg)
    .with_parent(&total)
    .with_stats(stats.clone() as Arc<dyn StatsSink>)
    .build()?;

    let summary = customers.recreate_all().await?;
    println!("customers: {} attempted, {} skipped", summary.attempted, summary.warnings.len());

    if let Err(group) = subscriptions.recreate_all().await {
        println!("subscriptions failed:\n{group}");
    }

    // second run is served from the cache and the destination account
    subscriptions.recreate_by_id("s1").await?;

    customers.confirm_all().await?;
    match subscriptions.confirm_all().await {
        Ok(summary) => println!(
            "subscriptions confirmed: {} attempted, {} skipped",
            summary.attempted,
            summary.warnings.len()
        ),
        Err(group) => println!("subscription confirm failed:\n{group}"),
    }

    listener_set.shutdown().await;

    println!("\n{total}");
    println!("\n{stats}");
    Ok(())
}
