//! # CV-06 Proof-Cycle Orchestrator
//!
//! Drives one batch from anchor observation through attestation and
//! write-back, then materializes the proof bundle.
//!
//! ## Phases
//!
//! - **Phase 7 (observation).** Every transaction in the request is observed
//!   to finality under the cycle deadline; each observation is persisted as
//!   a `chain_execution_results` row (workflow step 1).
//! - **Phase 8 (attestation).** An [`AttestationMessage`] is signed locally,
//!   fanned out to every configured peer in parallel, and each returned
//!   attestation is verified before admission. The accepted set is
//!   aggregated and the threshold policy applied.
//! - **Phase 9 (write-back).** When enabled and configured, a synthetic
//!   source-ledger transaction carrying the bundle hash and aggregated
//!   signature is signed and submitted. Missing configuration is not an
//!   error.
//!
//! Each phase reports `(result, error, fail_phase)`; phases never retry
//! internally; retries are a scheduler concern. Bundle materialization and
//! audit writes are best-effort and never abort a cycle.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod domain;
pub mod error;
pub mod materialize;
pub mod ports;
pub mod service;

// Re-exports
pub use config::{OrchestratorConfig, PartitionRouting, PeerConfig, WriteBackConfig};
pub use domain::{AttestationMessage, CycleOutcome, CycleRequest, IntentRef};
pub use error::{CycleError, CycleResult};
pub use ports::{
    HttpPeerClient, MockPeerClient, MockSourceLedger, PeerAttestationRequest,
    PeerAttestationResponse, PeerClient, SourceLedger, SyntheticTransaction,
};
pub use service::ProofCycleOrchestrator;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
