//! # Cross-cutting migration statistics.
//!
//! The importer calls a [`StatsSink`] after every successful mutation, so one
//! sink can aggregate several object kinds for the end-of-run summary.
//! [`MigrationStats`] is the built-in sink.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

/// Receiver of per-object-kind success counters.
pub trait StatsSink: Send + Sync + 'static {
    /// A destination item was created.
    fn track_imported(&self, object: &str);
    /// A destination item from a previous run was reused.
    fn track_reused(&self, object: &str);
    /// A destination item was reverted.
    fn track_reverted(&self, object: &str);
    /// A destination item was confirmed.
    fn track_confirmed(&self, object: &str);
}

/// Counters of one object kind.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ObjectStats {
    pub imported: u64,
    pub reused: u64,
    pub reverted: u64,
    pub confirmed: u64,
}

impl ObjectStats {
    pub fn has_any(&self) -> bool {
        self.imported > 0 || self.reused > 0 || self.reverted > 0 || self.confirmed > 0
    }
}

/// In-memory [`StatsSink`] keyed by object name.
#[derive(Debug, Default)]
pub struct MigrationStats {
    groups: Mutex<BTreeMap<String, ObjectStats>>,
}

impl MigrationStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters for `object` (all zero if never tracked).
    pub fn get(&self, object: &str) -> ObjectStats {
        self.lock().get(object).copied().unwrap_or_default()
    }

    /// Sum over all object kinds.
    pub fn totals(&self) -> ObjectStats {
        self.lock()
            .values()
            .fold(ObjectStats::default(), |acc, s| ObjectStats {
                imported: acc.imported + s.imported,
                reused: acc.reused + s.reused,
                reverted: acc.reverted + s.reverted,
                confirmed: acc.confirmed + s.confirmed,
            })
    }

    fn update(&self, object: &str, mutator: impl FnOnce(&mut ObjectStats)) {
        let mut groups = self.lock();
        if let Some(group) = groups.get_mut(object) {
            mutator(group);
        } else {
            let mut group = ObjectStats::default();
            mutator(&mut group);
            groups.insert(object.to_string(), group);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, ObjectStats>> {
        self.groups.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StatsSink for MigrationStats {
    fn track_imported(&self, object: &str) {
        self.update(object, |s| s.imported += 1);
    }

    fn track_reused(&self, object: &str) {
        self.update(object, |s| s.reused += 1);
    }

    fn track_reverted(&self, object: &str) {
        self.update(object, |s| s.reverted += 1);
    }

    fn track_confirmed(&self, object: &str) {
        self.update(object, |s| s.confirmed += 1);
    }
}

impl fmt::Display for ObjectStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut messages = Vec::new();
        if self.imported > 0 {
            messages.push(format!("{} IMPORTED", self.imported));
        }
        if self.reused > 0 {
            messages.push(format!("{} REUSED from previous runs", self.reused));
        }
        if self.reverted > 0 {
            messages.push(format!("{} REVERTED", self.reverted));
        }
        if self.confirmed > 0 {
            messages.push(format!("{} CONFIRMED", self.confirmed));
        }
        if messages.is_empty() {
            f.write_str("no changes")
        } else {
            f.write_str(&messages.join("; "))
        }
    }
}

impl fmt::Display for MigrationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let groups = self.lock();
        if groups.is_empty() {
            return f.write_str("no changes");
        }
        for (i, (object, stats)) in groups.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{object}: {stats}")?;
        }
        Ok(())
    }
}
