//! # CV-09 Audit & Sync
//!
//! Per-user append-only audit trail with the same hash-link discipline as
//! custody events, plus an outward "sync" channel that emits one status
//! snapshot per lifecycle phase, each snapshot hash-linked to the previous
//! snapshot for the same intent.
//!
//! Audit writes are best-effort from the orchestrator's point of view:
//! failures are logged, never aborting a cycle.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod service;
pub mod sync;
pub mod trail;

// Re-exports
pub use error::{AuditError, AuditResult};
pub use service::AuditService;
pub use sync::SyncSnapshot;
pub use trail::{AuditEntry, AuditTrail};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
