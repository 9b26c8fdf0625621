//! # CV-01 Proof Model
//!
//! The four-component proof bundle and its cryptographic invariants.
//!
//! ## Purpose
//!
//! Produce and verify the self-contained artifact a validator emits for each
//! witnessed intent:
//!
//! - **Merkle inclusion** of the intent's leaf in its batch root
//! - **Anchor reference** binding the root to an external-chain transaction
//! - **Chained proof** (L1/L2/L3) from the transaction to the source network
//!   root
//! - **Governance proof** (G0/G1/G2) of increasing authority strength
//!
//! ## Module Structure
//!
//! ```text
//! cv-01-proof-model/
//! ├── domain/          # ChainedProof, GovernanceProof, AnchorBinding, ProofBundle
//! ├── identity.rs      # Operation id and canonical 4-blob hashing
//! ├── verify.rs        # Fail-closed verification of every component
//! └── codec.rs         # Bundle JSON + gzip transport encoding
//! ```
//!
//! All verification is fail-closed: a missing component, type mismatch or
//! length violation rejects the whole bundle.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod domain;
pub mod identity;
pub mod verify;

// Re-exports
pub use codec::{decode_bundle, encode_bundle, gunzip_bundle, gzip_bundle};
pub use domain::{
    AnchorBinding, AnchorReference, AuthorityProofError, BundleAttestation, BundleComponents,
    BundleIntegrity, ChainedProof, EffectCheck, EffectKind, GovernanceLevel, GovernanceProof,
    KeyPageRef, MerkleInclusion, OutcomeBinding, ProofBundle, ProofEntry, ProofError, ProofLayer,
    ProofResult, SignerEntry, StateProofError, BUNDLE_SCHEMA_VERSION,
};
pub use identity::{
    compute_canonical_blob_hash, compute_intent_payload_hash, compute_operation_id,
};
pub use verify::{
    verify_anchor_binding, verify_authority_proof, verify_bundle_integrity,
    verify_merkle_inclusion, verify_state_proof,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
