//! Migration core: orchestration and scheduling.
//!
//! The only entry point most callers need is [`Importer`], built through
//! [`ImporterBuilder`].
//!
//! Internal modules:
//! - [`queue`]: bounded-concurrency job runner with "wait until drained";
//! - [`reuse`]: per-key coalescing of in-flight calls;
//! - [`importer`]: recreate/revert/confirm of one object kind;
//! - [`builder`]: wiring of provider, config, parent reporter and stats;
//! - [`phase`]: phase and outcome labels used as report paths.

mod builder;
mod config;
mod importer;
mod phase;
mod queue;
mod reuse;

pub use builder::ImporterBuilder;
pub use config::ImporterConfig;
pub use importer::{BatchSummary, Importer};
pub use phase::{Outcome, Phase};
pub use queue::Queue;
pub use reuse::ReuseLastCall;
