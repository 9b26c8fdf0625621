//! # CV-04 Attestation Strategy
//!
//! Validator attestation signing, verification, aggregation and threshold
//! policy over a pluggable signature scheme.
//!
//! ## Schemes
//!
//! | Scheme | Aggregation | Participants |
//! |--------|-------------|--------------|
//! | BLS12-381 | True signature aggregation (single group element) | bitfield |
//! | Ed25519 | List of signature entries, no compression | bitfield as dedup index |
//!
//! No state is shared between scheme implementations.
//!
//! ## Threshold
//!
//! Default quorum is ⅔+1 by weight: `threshold_weight(total) =
//! ceil(2·total/3) + 1`. Meeting the threshold is necessary but not
//! sufficient; every member signature must also individually verify.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bls;
pub mod domain;
pub mod ed25519;
pub mod error;
pub mod strategy;

// Re-exports
pub use bls::BlsAttestationStrategy;
pub use domain::{
    threshold_weight, AggregatedAttestation, Attestation, RosterEntry, SignatureEntry,
    ValidatorRoster,
};
pub use ed25519::Ed25519AttestationStrategy;
pub use error::AttestationError;
pub use strategy::AttestationStrategy;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
