//! # Broadcast bus for reporter events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`]. Every
//! [`Reporter`](crate::Reporter) owns one; publishing never blocks and does
//! not need a runtime, so reporters stay usable from synchronous code.
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` calls `broadcast::Sender::send` and
//!   drops the event when nobody listens.
//! - **Bounded capacity**: one ring buffer shared by all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n`
//!   oldest events.

use tokio::sync::broadcast;

use super::event::ReportEvent;

/// Default ring buffer size of a reporter bus.
pub const DEFAULT_BUS_CAPACITY: usize = 1024;

/// Broadcast channel for [`ReportEvent`]s.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<ReportEvent>,
}

impl Bus {
    /// Creates a new bus; capacity is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<ReportEvent>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    pub fn publish(&self, ev: ReportEvent) {
        let _ = self.tx.send(ev);
    }

    /// Creates a receiver that observes subsequently published events.
    pub fn subscribe(&self) -> broadcast::Receiver<ReportEvent> {
        self.tx.subscribe()
    }

    /// Number of live receivers.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}
