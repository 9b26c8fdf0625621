//! # CV-05 Anchor Scheduler
//!
//! Batches pending anchor requests into two priced classes before handing
//! them to the proof-cycle orchestrator.
//!
//! ## Classes
//!
//! - `on_demand`: single-request batches, flushed immediately.
//! - `on_cadence`: periodic batches (~15 min) with a minimum size trigger;
//!   an aging request forces a batch once it has waited a full cadence
//!   interval.
//!
//! Pricing tiers are declarative configuration, not behavior.
//!
//! ## Request lifecycle
//!
//! `pending → batched → processing → completed`, with `failed` requests
//! re-queued (fixed delay) until `max_retries` is exhausted, then terminal.
//!
//! Batches are emitted on a single ready channel; a batch is sealed exactly
//! once and its membership and order never change after seal.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod domain;
pub mod error;
pub mod service;

// Re-exports
pub use config::SchedulerConfig;
pub use domain::{AnchorRequest, BatchOutcome, RequestStatus};
pub use error::{SchedulerError, SchedulerResult};
pub use service::{AnchorScheduler, SchedulerStats};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
