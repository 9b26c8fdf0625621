//! Attestation entities.

use bitvec::prelude::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_types::{AttestationScheme, Hash32, ValidatorId};

/// A validator's signed endorsement of a message hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestation {
    /// Attesting validator.
    pub validator_id: ValidatorId,
    /// Public key bytes under `scheme`.
    #[serde(with = "hex::serde")]
    pub public_key: Vec<u8>,
    /// Signature over `message_hash`.
    #[serde(with = "hex::serde")]
    pub signature: Vec<u8>,
    /// The hash that was signed.
    pub message_hash: Hash32,
    /// Voting weight at signing time.
    pub weight: u64,
    /// When the attestation was produced.
    pub timestamp: DateTime<Utc>,
    /// Scheme the signature was produced under.
    pub scheme: AttestationScheme,
}

/// One member signature inside a non-aggregatable (Ed25519) aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureEntry {
    /// Signing validator.
    pub validator_id: ValidatorId,
    /// Public key bytes.
    #[serde(with = "hex::serde")]
    pub public_key: Vec<u8>,
    /// Signature over the aggregate's message hash.
    #[serde(with = "hex::serde")]
    pub signature: Vec<u8>,
}

/// Aggregated quorum evidence for one message hash.
///
/// Under BLS the aggregate signature and aggregate public key are single
/// group elements and `signatures` is empty. Under Ed25519 the aggregate is
/// the `signatures` list itself and the participant bitfield is purely a
/// deduplication index, never compression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedAttestation {
    /// Scheme the aggregate was produced under.
    pub scheme: AttestationScheme,
    /// The hash every member signed.
    pub message_hash: Hash32,
    /// BLS aggregate signature (single group element).
    #[serde(with = "hex::serde")]
    pub aggregate_signature: Vec<u8>,
    /// BLS aggregate public key (single group element).
    #[serde(with = "hex::serde")]
    pub aggregate_public_key: Vec<u8>,
    /// Ed25519 member signatures (empty under BLS).
    pub signatures: Vec<SignatureEntry>,
    /// Participation bitfield indexed by roster position.
    pub participants: BitVec<u8, Msb0>,
    /// Participating validator ids in roster order.
    pub participant_ids: Vec<ValidatorId>,
    /// Accumulated weight of the participants.
    pub achieved_weight: u64,
    /// Weight the threshold policy requires.
    pub required_weight: u64,
    /// Whether `achieved_weight >= required_weight`.
    pub threshold_met: bool,
    /// When the aggregate was assembled.
    pub timestamp: DateTime<Utc>,
}

impl AggregatedAttestation {
    /// Number of participants set in the bitfield.
    pub fn participant_count(&self) -> usize {
        self.participants.count_ones()
    }
}
