//! Ed25519 attestation strategy.
//!
//! Ed25519 has no signature aggregation; the aggregate is the list of
//! individual signature entries. The validator bitfield exists purely as a
//! deduplication index.

use crate::domain::{
    threshold_weight, AggregatedAttestation, Attestation, SignatureEntry, ValidatorRoster,
};
use crate::error::AttestationError;
use crate::strategy::AttestationStrategy;
use bitvec::prelude::*;
use chrono::Utc;
use shared_crypto::hashing::sha256;
use shared_crypto::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
use shared_types::{AttestationScheme, ValidatorId};

/// Ed25519 attestation strategy bound to a local keypair and a roster.
pub struct Ed25519AttestationStrategy {
    validator_id: ValidatorId,
    keypair: Ed25519KeyPair,
    roster: ValidatorRoster,
}

impl Ed25519AttestationStrategy {
    /// Create a strategy. The local validator must be a roster member whose
    /// registered key matches the keypair.
    pub fn new(
        validator_id: ValidatorId,
        keypair: Ed25519KeyPair,
        roster: ValidatorRoster,
    ) -> Result<Self, AttestationError> {
        let entry = roster
            .get(&validator_id)
            .ok_or_else(|| AttestationError::UnknownValidator {
                validator_id: validator_id.clone(),
            })?;
        if entry.public_key != keypair.public_key().as_bytes().to_vec() {
            return Err(AttestationError::PublicKeyMismatch {
                validator_id: validator_id.clone(),
            });
        }
        Ok(Self {
            validator_id,
            keypair,
            roster,
        })
    }

    /// The roster this strategy aggregates against.
    pub fn roster(&self) -> &ValidatorRoster {
        &self.roster
    }

    fn verify_entry(
        &self,
        entry: &SignatureEntry,
        message_hash: &shared_types::Hash32,
    ) -> bool {
        let Some(member) = self.roster.get(&entry.validator_id) else {
            return false;
        };
        if member.public_key != entry.public_key {
            return false;
        }
        let Ok(public_key) = Ed25519PublicKey::from_slice(&entry.public_key) else {
            return false;
        };
        let Ok(signature) = Ed25519Signature::from_slice(&entry.signature) else {
            return false;
        };
        public_key.verify(message_hash.as_bytes(), &signature).is_ok()
    }
}

impl AttestationStrategy for Ed25519AttestationStrategy {
    fn scheme(&self) -> AttestationScheme {
        AttestationScheme::Ed25519
    }

    fn sign(&self, message: &[u8]) -> Result<Attestation, AttestationError> {
        let entry = self.roster.get(&self.validator_id).ok_or_else(|| {
            AttestationError::UnknownValidator {
                validator_id: self.validator_id.clone(),
            }
        })?;
        let message_hash = sha256(message);
        let signature = self.keypair.sign(message_hash.as_bytes());
        Ok(Attestation {
            validator_id: self.validator_id.clone(),
            public_key: self.keypair.public_key().as_bytes().to_vec(),
            signature: signature.as_bytes().to_vec(),
            message_hash,
            weight: entry.weight,
            timestamp: Utc::now(),
            scheme: AttestationScheme::Ed25519,
        })
    }

    fn verify(&self, attestation: &Attestation) -> bool {
        if attestation.scheme != AttestationScheme::Ed25519 {
            return false;
        }
        self.verify_entry(
            &SignatureEntry {
                validator_id: attestation.validator_id.clone(),
                public_key: attestation.public_key.clone(),
                signature: attestation.signature.clone(),
            },
            &attestation.message_hash,
        )
    }

    fn aggregate(
        &self,
        attestations: &[Attestation],
    ) -> Result<AggregatedAttestation, AttestationError> {
        if attestations.is_empty() {
            return Err(AttestationError::EmptySet);
        }
        let message_hash = attestations[0].message_hash;
        if attestations.iter().any(|a| a.message_hash != message_hash) {
            return Err(AttestationError::MixedMessageHashes);
        }

        let mut participants: BitVec<u8, Msb0> = bitvec![u8, Msb0; 0; self.roster.len()];
        let mut signatures: Vec<SignatureEntry> = Vec::new();
        let mut achieved_weight: u64 = 0;

        for attestation in attestations {
            if attestation.scheme != AttestationScheme::Ed25519 {
                return Err(AttestationError::SchemeMismatch {
                    expected: AttestationScheme::Ed25519.to_string(),
                    actual: attestation.scheme.to_string(),
                });
            }
            let index = self.roster.index_of(&attestation.validator_id).ok_or_else(|| {
                AttestationError::UnknownValidator {
                    validator_id: attestation.validator_id.clone(),
                }
            })?;
            if participants[index] {
                continue;
            }
            if !self.verify(attestation) {
                return Err(AttestationError::MemberVerificationFailed {
                    validator_id: attestation.validator_id.clone(),
                });
            }
            participants.set(index, true);
            achieved_weight += attestation.weight;
            signatures.push(SignatureEntry {
                validator_id: attestation.validator_id.clone(),
                public_key: attestation.public_key.clone(),
                signature: attestation.signature.clone(),
            });
        }

        // List order follows roster order for a canonical aggregate.
        signatures.sort_by(|a, b| {
            self.roster
                .index_of(&a.validator_id)
                .cmp(&self.roster.index_of(&b.validator_id))
        });
        let participant_ids: Vec<ValidatorId> =
            signatures.iter().map(|s| s.validator_id.clone()).collect();
        let required_weight = threshold_weight(self.roster.total_weight());

        Ok(AggregatedAttestation {
            scheme: AttestationScheme::Ed25519,
            message_hash,
            aggregate_signature: Vec::new(),
            aggregate_public_key: Vec::new(),
            signatures,
            participants,
            participant_ids,
            achieved_weight,
            required_weight,
            threshold_met: achieved_weight >= required_weight,
            timestamp: Utc::now(),
        })
    }

    fn verify_aggregated(&self, aggregated: &AggregatedAttestation) -> bool {
        if aggregated.scheme != AttestationScheme::Ed25519 {
            return false;
        }
        if aggregated.signatures.is_empty() {
            return false;
        }
        // The bitfield is a dedup index; it must agree with the entry list.
        if aggregated.participant_count() != aggregated.signatures.len() {
            return false;
        }
        for entry in &aggregated.signatures {
            let Some(index) = self.roster.index_of(&entry.validator_id) else {
                return false;
            };
            if !aggregated.participants[index] {
                return false;
            }
            if !self.verify_entry(entry, &aggregated.message_hash) {
                return false;
            }
        }
        true
    }
}
