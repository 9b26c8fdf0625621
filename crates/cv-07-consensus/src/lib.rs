//! # CV-07 Consensus State Machine
//!
//! Validates and commits validator blocks arriving over the BFT replication
//! layer, persisting the consensus log and the durable ABCI state so the
//! process can resume exactly where it stopped.
//!
//! ## Commit pipeline
//!
//! 1. Parse the block JSON.
//! 2. Override header-derived fields (`block_height`, `timestamp`,
//!    `validator_id`) from the replication layer.
//! 3. Structural invariants: non-empty `bundle_id` and
//!    `operation_commitment`, proof class strictly
//!    `on_demand`/`on_cadence`, governance-level monotonicity.
//! 4. Commit: advance height, fold the bundle id into the
//!    order-independent XOR application hash, persist ABCI state, insert the
//!    consensus entry (idempotent per `(bundle_id, height)`), record the
//!    replication-derived quorum for the batch.
//!
//! Mutations are serialized through a single writer; the in-memory block
//! cache is capped and pruned oldest-height first.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod domain;
pub mod error;
pub mod service;
pub mod validation;

// Re-exports
pub use domain::{
    BlockGovernance, CommitResult, ConsensusState, ExecutionProof, RawValidatorBlock,
    ReplicationHeader, ValidatorBlock, BLOCK_CACHE_CAPACITY,
};
pub use error::{ConsensusError, ConsensusResult, RejectCode};
pub use service::ConsensusService;
pub use validation::validate_block;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
