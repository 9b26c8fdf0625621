//! # Shared Storage
//!
//! Persistence ports over the validator's authoritative tables, with an
//! in-memory adapter backing tests and a Postgres adapter for deployment.
//!
//! ## Tables
//!
//! `proof_artifacts`, `proof_bundles`, `anchor_references`,
//! `chained_proof_layers`, `governance_proof_levels`,
//! `validator_attestations`, `verification_history`, `unified_attestations`,
//! `aggregated_attestations`, `chain_execution_results`, `consensus_entries`,
//! `batch_attestations`, `custody_chain_events`, `audit_trail`, plus the
//! key-valued consensus (ABCI) state.
//!
//! Time columns are TIMESTAMPTZ, binary columns BYTEA, JSON columns JSONB
//! and never NULL where declared NOT NULL (`[]`, `{}` or `null` literals).
//! Migrations are idempotent.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod error;
pub mod migrations;
pub mod ports;
pub mod rows;

// Re-exports
pub use adapters::{MemoryStore, PostgresStore};
pub use error::{StorageError, StorageResult};
pub use ports::{
    AttestationStore, ConsensusStore, ExecutionStore, JournalStore, ProofStore, ValidatorStore,
};
pub use rows::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
