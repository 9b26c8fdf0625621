//! # CV-08 Lifecycle Manager
//!
//! Maintains the proof state machine
//! `pending → batched → anchored → attested → verified | failed` and
//! journals every transition as a custody-chain event hash-linked to its
//! predecessor, forming a per-proof tamper-evident log.
//!
//! Persistence is additive: custody events are never updated in place.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod custody;
pub mod error;
pub mod service;

// Re-exports
pub use custody::{CustodyChain, CustodyEvent};
pub use error::{LifecycleError, LifecycleResult};
pub use service::{LifecycleManager, ProofLifecycle};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
