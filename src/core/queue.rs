//! # Queue: bounded-concurrency runner for a growing list of jobs.
//!
//! Jobs are spawned onto the runtime immediately and wait for a permit of the
//! optional semaphore before running. Running jobs may hold a clone of the
//! queue and add more jobs; [`Queue::wait_until_finished`] only resolves once
//! nothing is pending or running, including those late additions.
//!
//! ## Flow
//! ```text
//! add(job) ──► tracker.spawn ──► acquire permit (FIFO) ──► job.await ──► release
//!                                                             │
//!                                                             └─ panic caught → logged, counted as done
//!
//! admit(job).await ──► acquire permit (FIFO) ──► tracker.spawn ──► job.await ──► release
//!
//! wait_until_finished() ──► tracker.close() ──► tracker.wait()   (closed && no tasks left)
//! ```
//!
//! ## Rules
//! - Failures are the job's business: jobs return `()` and must record their own errors.
//! - A panicking job never stops the queue.
//! - Admission into free slots is FIFO (tokio's semaphore is fair); completion order is not.

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;

use crate::errors::panic_message;

struct QueueInner {
    tracker: TaskTracker,
    semaphore: Option<Arc<Semaphore>>,
}

/// Cloneable handle to a job queue; clones share slots and bookkeeping.
#[derive(Clone)]
pub struct Queue {
    inner: Arc<QueueInner>,
}

impl Queue {
    /// Creates a queue running at most `limit` jobs at a time (`None` = unlimited).
    ///
    /// A limit of `0` is clamped to `1`.
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                tracker: TaskTracker::new(),
                semaphore: limit.map(|n| Arc::new(Semaphore::new(n.max(1)))),
            }),
        }
    }

    /// Creates a queue without a concurrency ceiling.
    pub fn unbounded() -> Self {
        Self::new(None)
    }

    /// Enqueues a job. Must be called from within a tokio runtime.
    pub fn add<F>(&self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let semaphore = self.inner.semaphore.clone();
        self.inner.tracker.spawn(async move {
            let _permit = match semaphore {
                Some(sem) => match sem.acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(_closed) => return,
                },
                None => None,
            };
            run_isolated(job).await;
        });
    }

    /// Waits for a free slot, then enqueues the job holding that slot.
    ///
    /// A producer feeding the queue through `admit` is throttled to the
    /// concurrency limit, so at most `limit` jobs exist at a time. Do not call
    /// it from a job of the same queue: the job's own slot is still taken.
    pub async fn admit<F>(&self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permit = match &self.inner.semaphore {
            Some(sem) => match Arc::clone(sem).acquire_owned().await {
                Ok(permit) => Some(permit),
                Err(_closed) => return,
            },
            None => None,
        };
        self.inner.tracker.spawn(async move {
            let _permit = permit;
            run_isolated(job).await;
        });
    }

    /// Number of jobs pending or running.
    pub fn in_flight(&self) -> usize {
        self.inner.tracker.len()
    }

    /// True if no job is pending or running.
    pub fn is_idle(&self) -> bool {
        self.inner.tracker.is_empty()
    }

    /// Resolves once no job is pending or running.
    ///
    /// Jobs added while waiting (for instance by running jobs) are waited for as well.
    /// The queue stays usable afterwards.
    pub async fn wait_until_finished(&self) {
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
    }
}

async fn run_isolated<F: Future<Output = ()>>(job: F) {
    if let Err(panic_err) = std::panic::AssertUnwindSafe(job).catch_unwind().await {
        tracing::error!(info = %panic_message(&*panic_err), "queued job panicked");
    }
}

impl Default for Queue {
    fn default() -> Self {
        Self::unbounded()
    }
}
