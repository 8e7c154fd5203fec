//! # ListenerSet: non-blocking fan-out of reporter events.
//!
//! [`ListenerSet`] subscribes to a reporter's [`Bus`](super::Bus) and
//! distributes each [`ReportEvent`] to multiple listeners **without awaiting**
//! their processing.
//!
//! ## What it guarantees
//! - Per-listener FIFO (queue order).
//! - A full or closed listener queue drops the event for that listener only.
//! - Panics inside listeners are caught and logged (isolation).
//! - [`ListenerSet::shutdown`] forwards every event already published on the
//!   bus before closing the queues and joining the workers.
//!
//! ## Diagram
//! ```text
//!  Reporter ── publish ──► Bus ──► forwarder ─┬──► [queue L1] ─► worker L1 ─► on_report()
//!                                             ├──► [queue L2] ─► worker L2 ─► on_report()
//!                                             └──► [queue LN] ─► worker LN ─► on_report()
//! ```

use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{ReportEvent, ReportListener, Reporter};
use crate::errors::panic_message;

/// Per-listener channel with metadata.
struct ListenerChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<ReportEvent>>,
}

impl ListenerChannel {
    fn emit(&self, ev: &Arc<ReportEvent>) {
        match self.sender.try_send(Arc::clone(ev)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(listener = self.name, reason = "full", "report listener dropped event");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!(listener = self.name, reason = "closed", "report listener dropped event");
            }
        }
    }
}

/// Fan-out with per-listener bounded queues and worker tasks.
pub struct ListenerSet {
    forwarder: JoinHandle<()>,
    workers: Vec<JoinHandle<()>>,
    stop: CancellationToken,
    len: usize,
}

impl ListenerSet {
    /// Subscribes to `reporter` and spawns one worker per listener.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn attach(reporter: &Reporter, listeners: Vec<Arc<dyn ReportListener>>) -> Self {
        let len = listeners.len();
        let mut channels = Vec::with_capacity(len);
        let mut workers = Vec::with_capacity(len);

        for listener in listeners {
            let cap = listener.queue_capacity().max(1);
            let name = listener.name();
            let (tx, mut rx) = mpsc::channel::<Arc<ReportEvent>>(cap);

            let handle = tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = listener.on_report(ev.as_ref());
                    if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                        tracing::error!(
                            listener = listener.name(),
                            info = %panic_message(&*panic_err),
                            "report listener panicked"
                        );
                    }
                }
            });

            channels.push(ListenerChannel { name, sender: tx });
            workers.push(handle);
        }

        let stop = CancellationToken::new();
        let forwarder = tokio::spawn(forward(reporter.subscribe(), channels, stop.clone()));

        Self {
            forwarder,
            workers,
            stop,
            len,
        }
    }

    /// Graceful shutdown: forward pending events, close all queues, await workers.
    pub async fn shutdown(self) {
        self.stop.cancel();
        let _ = self.forwarder.await;
        for h in self.workers {
            let _ = h.await;
        }
    }

    /// True if there are no listeners.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }
}

async fn forward(
    mut rx: broadcast::Receiver<ReportEvent>,
    channels: Vec<ListenerChannel>,
    stop: CancellationToken,
) {
    let fan_out = |ev: ReportEvent| {
        let ev = Arc::new(ev);
        for channel in &channels {
            channel.emit(&ev);
        }
    };

    loop {
        tokio::select! {
            biased;
            msg = rx.recv() => match msg {
                Ok(ev) => fan_out(ev),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "report forwarder lagged behind");
                }
                Err(broadcast::error::RecvError::Closed) => return,
            },
            _ = stop.cancelled() => break,
        }
    }

    loop {
        match rx.try_recv() {
            Ok(ev) => fan_out(ev),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "report forwarder lagged behind");
            }
            Err(_) => return,
        }
    }
}
