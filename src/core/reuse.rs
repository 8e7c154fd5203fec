//! # ReuseLastCall: keyed in-flight call coalescing.
//!
//! Concurrent calls sharing a key share one execution and observe the
//! identical settled result.
//!
//! ```text
//! schedule("sub_1", f)  ──► no record ──► run f() as Shared future, record it ─┐
//! schedule("sub_1", g)  ──► record found ──► await the same Shared future ─────┤
//!                                                                              ▼
//!                                     settled ──► record cleared ──► both callers get the result
//! schedule("sub_1", h)  ──► no record ──► fresh execution
//! ```
//!
//! ## Rules
//! - The record is cleared by the operation itself at settlement (success,
//!   failure or panic), before waiters observe the result; a call racing just
//!   after settlement starts a fresh execution.
//! - Only in-process concurrent calls are coalesced. Sequential idempotency is
//!   the caller's business (the importer keeps its own id maps).

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

type InFlight<T> = Shared<BoxFuture<'static, T>>;
type Calls<T> = Mutex<HashMap<String, (u64, InFlight<T>)>>;

fn lock<T>(calls: &Calls<T>) -> MutexGuard<'_, HashMap<String, (u64, InFlight<T>)>> {
    calls.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Removes the record of one execution when that execution ends.
struct ClearOnSettle<T> {
    calls: Weak<Calls<T>>,
    key: String,
    call_id: u64,
}

impl<T> Drop for ClearOnSettle<T> {
    fn drop(&mut self) {
        let Some(calls) = self.calls.upgrade() else {
            return;
        };
        let mut calls = lock(&calls);
        if calls
            .get(&self.key)
            .is_some_and(|(id, _)| *id == self.call_id)
        {
            calls.remove(&self.key);
        }
    }
}

/// Coalesces concurrent executions per key.
pub struct ReuseLastCall<T>
where
    T: Clone + Send + Sync + 'static,
{
    calls: Arc<Calls<T>>,
    next_id: AtomicU64,
}

impl<T> ReuseLastCall<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Runs `factory()` unless an execution for `key` is in flight, in which
    /// case the in-flight result is awaited instead.
    pub async fn schedule<F, Fut>(&self, key: &str, factory: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let shared = {
            let mut calls = lock(&self.calls);
            match calls.get(key) {
                Some((_, in_flight)) => {
                    tracing::debug!(key, "joining in-flight call");
                    in_flight.clone()
                }
                None => {
                    let call_id = self.next_id.fetch_add(1, AtomicOrdering::Relaxed);
                    let guard = ClearOnSettle {
                        calls: Arc::downgrade(&self.calls),
                        key: key.to_string(),
                        call_id,
                    };
                    let run = factory();
                    let shared = async move {
                        let out = std::panic::AssertUnwindSafe(run).catch_unwind().await;
                        drop(guard);
                        match out {
                            Ok(value) => value,
                            Err(panic_err) => std::panic::resume_unwind(panic_err),
                        }
                    }
                    .boxed()
                    .shared();
                    calls.insert(key.to_string(), (call_id, shared.clone()));
                    shared
                }
            }
        };
        shared.await
    }

    /// Number of keys with an execution in flight.
    pub fn in_flight(&self) -> usize {
        lock(&self.calls).len()
    }

    /// True if an execution for `key` is in flight.
    pub fn is_in_flight(&self, key: &str) -> bool {
        lock(&self.calls).contains_key(key)
    }
}

impl<T> Default for ReuseLastCall<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
