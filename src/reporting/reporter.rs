//! # Reporter: hierarchical outcome counters with tag histograms.
//!
//! A [`Reporter`] is a tree of categories. Filing an outcome under a category
//! path increments the total count and folds the outcome's [`ReportTags`] into
//! per-key value histograms at **every** node on the path. Missing category
//! nodes are created on first use.
//!
//! ## Propagation
//! ```text
//! root (Total)                        root.total += 1           (walk up)
//!  └── Subscription  (attached child) sub.total  += 1  ◄── sub.report(["recreate", "succeeded"], tags)
//!       └── recreate (category node)  recreate   += 1           (walk down)
//!            └── succeeded            succeeded  += 1
//! ```
//! - [`Reporter::add_child_reporter`] wires a sub-tree under a parent so that
//!   its **future** reports propagate upward; counts filed before attaching stay
//!   local to the child.
//! - Every reporter touched by a report publishes a [`ReportEvent`] on its own
//!   [`Bus`], with the path relative to that reporter.
//!
//! ## Locking
//! Each reporter guards its tally with a `std::sync::Mutex`. Descending into an
//! attached child locks parent before child; the upward walk releases the
//! child before locking the parent. No lock is held across an `.await`.
//! Attaching takes one process-wide lock, so two opposite attaches racing on
//! different threads cannot both pass the cycle check.
//!
//! ## Rendering
//! `Display` renders one line per node, tag histograms one level deeper:
//! ```text
//! 3 Subscription
//!   by status: active: 2, trialing: 1
//!   3 recreate
//!     by status: active: 2, trialing: 1
//!     3 succeeded
//!       by status: active: 2, trialing: 1
//! ```
//! A key with a single distinct value renders as `by k: v (n/N)`, where `n`
//! counts the occurrences and `N` is the node total.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::broadcast;

use super::bus::{Bus, DEFAULT_BUS_CAPACITY};
use super::event::{ReportEvent, ReportEventKind};
use super::{ReportTags, ReportingCategory};
use crate::errors::ReportError;

/// Serializes tree rewiring so a cycle check and the parent link it guards
/// happen atomically across all reporters.
static ATTACH_LOCK: Mutex<()> = Mutex::new(());

/// Counters of one node.
#[derive(Default)]
struct Tally {
    total: u64,
    /// key → value → occurrences.
    histograms: BTreeMap<String, BTreeMap<String, u64>>,
    /// Children in insertion order.
    children: Vec<Child>,
}

enum Child {
    /// Node created implicitly by a report path.
    Category {
        category: ReportingCategory,
        tally: Tally,
    },
    /// Reporter wired in by [`Reporter::add_child_reporter`].
    Attached(Reporter),
}

impl Child {
    fn key(&self) -> &str {
        match self {
            Child::Category { category, .. } => &category.key,
            Child::Attached(r) => &r.inner.category.key,
        }
    }
}

impl Tally {
    fn fold(&mut self, tags: &ReportTags) {
        self.total += 1;
        for (k, v) in tags.iter() {
            *self
                .histograms
                .entry(k.to_string())
                .or_default()
                .entry(v.to_string())
                .or_default() += 1;
        }
    }

    fn apply(&mut self, path: &[ReportingCategory], tags: &ReportTags) {
        self.fold(tags);
        let Some((head, rest)) = path.split_first() else {
            return;
        };
        match self.children.iter_mut().find(|c| c.key() == head.key) {
            Some(Child::Category { tally, .. }) => tally.apply(rest, tags),
            Some(Child::Attached(reporter)) => reporter.apply(rest, tags),
            None => {
                let mut tally = Tally::default();
                tally.apply(rest, tags);
                self.children.push(Child::Category {
                    category: head.clone(),
                    tally,
                });
            }
        }
    }

    fn find(&self, key: &str) -> Option<&Child> {
        self.children.iter().find(|c| c.key() == key)
    }
}

struct Inner {
    category: ReportingCategory,
    state: Mutex<Tally>,
    parent: Mutex<Option<Weak<Inner>>>,
    bus: Bus,
}

/// Shared handle to a reporter node; clones refer to the same tree.
#[derive(Clone)]
pub struct Reporter {
    inner: Arc<Inner>,
}

impl Reporter {
    /// Creates a detached reporter for `category`.
    pub fn new(category: impl Into<ReportingCategory>) -> Self {
        Self {
            inner: Arc::new(Inner {
                category: category.into(),
                state: Mutex::new(Tally::default()),
                parent: Mutex::new(None),
                bus: Bus::new(DEFAULT_BUS_CAPACITY),
            }),
        }
    }

    /// Creates the conventional top-level reporter (`"Total"`).
    pub fn root() -> Self {
        Self::new(ReportingCategory::new("Total"))
    }

    /// Category of this reporter.
    pub fn category(&self) -> &ReportingCategory {
        &self.inner.category
    }

    /// Files one outcome under `path` (relative to this reporter).
    ///
    /// ```rust
    /// use objmigrate::{Reporter, ReportTags};
    ///
    /// let reporter = Reporter::new("Subscription");
    /// reporter.report(["recreate", "succeeded"], &ReportTags::new().with("status", "active"));
    /// assert_eq!(reporter.total_count(), 1);
    /// assert_eq!(reporter.count(&["recreate", "succeeded"]), 1);
    /// ```
    pub fn report<I, C>(&self, path: I, tags: &ReportTags)
    where
        I: IntoIterator<Item = C>,
        C: Into<ReportingCategory>,
    {
        let path: Vec<ReportingCategory> = path.into_iter().map(Into::into).collect();
        self.apply(&path, tags);

        let mut rel: Vec<String> = path.iter().map(|c| c.key.to_string()).collect();
        let mut child_key = self.inner.category.key.to_string();
        let mut next = self.parent();
        while let Some(ancestor) = next {
            rel.insert(0, child_key);
            let total = {
                let mut st = ancestor.lock();
                st.fold(tags);
                st.total
            };
            ancestor.publish(
                ReportEvent::new(ReportEventKind::Reported, ancestor.key())
                    .with_path(rel.iter().cloned())
                    .with_tags(tags.clone())
                    .with_total(total),
            );
            child_key = ancestor.inner.category.key.to_string();
            next = ancestor.parent();
        }
    }

    /// Wires `child` under this reporter so its future reports propagate upward.
    ///
    /// # Errors
    /// - [`ReportError::AlreadyAttached`] if `child` already has a parent
    ///   (including attaching the same child twice);
    /// - [`ReportError::DuplicateCategory`] if a child with the same key exists;
    /// - [`ReportError::Cycle`] if `child` is this reporter or one of its ancestors.
    pub fn add_child_reporter(&self, child: &Reporter) -> Result<(), ReportError> {
        let child_key = child.inner.category.key.to_string();
        let _attaching = ATTACH_LOCK.lock().unwrap_or_else(PoisonError::into_inner);

        let mut cursor = Some(self.clone());
        while let Some(node) = cursor {
            if Arc::ptr_eq(&node.inner, &child.inner) {
                return Err(ReportError::Cycle {
                    category: child_key,
                });
            }
            cursor = node.parent();
        }

        let mut parent_slot = child
            .inner
            .parent
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if parent_slot.is_some() {
            return Err(ReportError::AlreadyAttached {
                category: child_key,
            });
        }

        {
            let mut st = self.lock();
            if st.find(&child_key).is_some() {
                return Err(ReportError::DuplicateCategory {
                    parent: self.key().to_string(),
                    category: child_key,
                });
            }
            st.children.push(Child::Attached(child.clone()));
        }
        *parent_slot = Some(Arc::downgrade(&self.inner));
        drop(parent_slot);

        self.publish(ReportEvent::new(ReportEventKind::ChildAttached, self.key()).with_path([child_key]));
        Ok(())
    }

    /// Total number of outcomes filed at this node.
    pub fn total_count(&self) -> u64 {
        self.lock().total
    }

    /// Total count of the node at `path`, `0` if it does not exist.
    pub fn count(&self, path: &[&str]) -> u64 {
        self.visit(path, |tally| tally.total).unwrap_or(0)
    }

    /// Value histogram for `key` at `path`, sorted by value.
    pub fn histogram(&self, path: &[&str], key: &str) -> Vec<(String, u64)> {
        self.visit(path, |tally| {
            tally
                .histograms
                .get(key)
                .map(|values| values.iter().map(|(v, n)| (v.clone(), *n)).collect())
                .unwrap_or_default()
        })
        .unwrap_or_default()
    }

    /// Attached child reporter registered under `key`.
    pub fn child_reporter(&self, key: &str) -> Option<Reporter> {
        match self.lock().find(key) {
            Some(Child::Attached(r)) => Some(r.clone()),
            _ => None,
        }
    }

    /// Subscribes to change notifications of this reporter.
    pub fn subscribe(&self) -> broadcast::Receiver<ReportEvent> {
        self.inner.bus.subscribe()
    }

    /// Event bus of this reporter.
    pub fn bus(&self) -> &Bus {
        &self.inner.bus
    }

    /// Writes the rendered tree to stdout.
    pub fn print(&self) {
        println!("{self}");
    }

    // ---- internals ----

    fn key(&self) -> &str {
        &self.inner.category.key
    }

    fn lock(&self) -> MutexGuard<'_, Tally> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn parent(&self) -> Option<Reporter> {
        self.inner
            .parent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|inner| Reporter { inner })
    }

    fn publish(&self, ev: ReportEvent) {
        self.inner.bus.publish(ev);
    }

    /// Applies a report to this reporter and its sub-tree, without walking up.
    fn apply(&self, path: &[ReportingCategory], tags: &ReportTags) {
        let total = {
            let mut st = self.lock();
            st.apply(path, tags);
            st.total
        };
        self.publish(
            ReportEvent::new(ReportEventKind::Reported, self.key())
                .with_path(path.iter().map(|c| c.key.to_string()))
                .with_tags(tags.clone())
                .with_total(total),
        );
    }

    fn visit<R>(&self, path: &[&str], f: impl FnOnce(&Tally) -> R) -> Option<R> {
        let st = self.lock();
        let mut tally: &Tally = &st;
        for (i, key) in path.iter().enumerate() {
            match tally.find(key)? {
                Child::Category { tally: next, .. } => tally = next,
                Child::Attached(reporter) => return reporter.visit(&path[i + 1..], f),
            }
        }
        Some(f(tally))
    }
}

impl fmt::Debug for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reporter")
            .field("category", &self.inner.category.key)
            .field("total", &self.total_count())
            .finish()
    }
}

impl fmt::Display for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        render(f, &self.inner.category, &self.lock(), 0, &mut first)
    }
}

fn render(
    f: &mut fmt::Formatter<'_>,
    category: &ReportingCategory,
    tally: &Tally,
    depth: usize,
    first: &mut bool,
) -> fmt::Result {
    line(f, depth, first)?;
    if category.show_count {
        write!(f, "{} {}", tally.total, category.title)?;
    } else {
        f.write_str(&category.title)?;
    }

    for (key, values) in &tally.histograms {
        line(f, depth + 1, first)?;
        write!(f, "by {key}: ")?;
        write_histogram(f, values, tally.total)?;
    }

    let child_depth = if category.indent_children { depth + 1 } else { depth };
    for child in &tally.children {
        match child {
            Child::Category { category, tally } => render(f, category, tally, child_depth, first)?,
            Child::Attached(reporter) => render(
                f,
                &reporter.inner.category,
                &reporter.lock(),
                child_depth,
                first,
            )?,
        }
    }
    Ok(())
}

fn line(f: &mut fmt::Formatter<'_>, depth: usize, first: &mut bool) -> fmt::Result {
    if !*first {
        f.write_str("\n")?;
    }
    *first = false;
    write!(f, "{:width$}", "", width = depth * 2)
}

fn write_histogram(
    f: &mut fmt::Formatter<'_>,
    values: &BTreeMap<String, u64>,
    total: u64,
) -> fmt::Result {
    if values.len() == 1 {
        if let Some((value, n)) = values.iter().next() {
            return write!(f, "{value} ({n}/{total})");
        }
    }
    for (i, (value, n)) in values.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{value}: {n}")?;
    }
    Ok(())
}
