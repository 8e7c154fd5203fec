//! # Outcome reporting.
//!
//! - [`ReportTags`]: key/value observations attached to one outcome
//! - [`ReportingCategory`]: display/aggregation behaviour of a node
//! - [`Reporter`]: tree of counters and tag histograms with upward propagation
//! - [`ReportEvent`], [`Bus`]: change notifications published by every reporter
//! - [`ReportListener`], [`ListenerSet`]: per-listener workers fed from a bus
//!
//! ## Event flow
//! ```text
//! Importer ── report(path, tags) ──► Reporter ──► Bus ──► ListenerSet ──► listener.on_report()
//!                                       │
//!                                       └── walk up ──► parent Reporter ──► parent Bus ──► ...
//! ```

mod bus;
mod category;
mod event;
mod listener;
mod listener_set;
#[cfg(feature = "logging")]
mod log;
mod reporter;
mod tags;

pub use bus::Bus;
pub use category::ReportingCategory;
pub use event::{ReportEvent, ReportEventKind};
pub use listener::ReportListener;
pub use listener_set::ListenerSet;
#[cfg(feature = "logging")]
pub use log::LogListener;
pub use reporter::Reporter;
pub use tags::ReportTags;
