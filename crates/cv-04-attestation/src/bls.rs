//! BLS12-381 attestation strategy.
//!
//! Aggregation here is true signature aggregation: the aggregate signature
//! and aggregate public key are single group elements. The participant
//! bitfield records which roster members contributed.

use crate::domain::{
    threshold_weight, AggregatedAttestation, Attestation, ValidatorRoster,
};
use crate::error::AttestationError;
use crate::strategy::AttestationStrategy;
use bitvec::prelude::*;
use chrono::Utc;
use shared_crypto::hashing::sha256;
use shared_crypto::{BlsKeyPair, BlsPublicKey, BlsSignature};
use shared_types::{AttestationScheme, ValidatorId};

/// BLS attestation strategy bound to a local keypair and a roster.
pub struct BlsAttestationStrategy {
    validator_id: ValidatorId,
    keypair: BlsKeyPair,
    roster: ValidatorRoster,
}

impl BlsAttestationStrategy {
    /// Create a strategy. The local validator must be a roster member whose
    /// registered key matches the keypair.
    pub fn new(
        validator_id: ValidatorId,
        keypair: BlsKeyPair,
        roster: ValidatorRoster,
    ) -> Result<Self, AttestationError> {
        let entry = roster
            .get(&validator_id)
            .ok_or_else(|| AttestationError::UnknownValidator {
                validator_id: validator_id.clone(),
            })?;
        if entry.public_key != keypair.public_key().to_bytes().to_vec() {
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

    fn roster_key(&self, validator_id: &str) -> Option<BlsPublicKey> {
        let entry = self.roster.get(validator_id)?;
        BlsPublicKey::from_slice(&entry.public_key).ok()
    }
}

impl AttestationStrategy for BlsAttestationStrategy {
    fn scheme(&self) -> AttestationScheme {
        AttestationScheme::Bls12381
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
            public_key: self.keypair.public_key().to_bytes().to_vec(),
            signature: signature.to_bytes().to_vec(),
            message_hash,
            weight: entry.weight,
            timestamp: Utc::now(),
            scheme: AttestationScheme::Bls12381,
        })
    }

    fn verify(&self, attestation: &Attestation) -> bool {
        if attestation.scheme != AttestationScheme::Bls12381 {
            return false;
        }
        let Some(entry) = self.roster.get(&attestation.validator_id) else {
            return false;
        };
        if entry.public_key != attestation.public_key {
            return false;
        }
        let Ok(public_key) = BlsPublicKey::from_slice(&attestation.public_key) else {
            return false;
        };
        let Ok(signature) = BlsSignature::from_slice(&attestation.signature) else {
            return false;
        };
        public_key.verify(attestation.message_hash.as_bytes(), &signature)
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
        let mut signatures = Vec::new();
        let mut public_keys = Vec::new();
        let mut participant_ids: Vec<ValidatorId> = Vec::new();
        let mut achieved_weight: u64 = 0;

        for attestation in attestations {
            if attestation.scheme != AttestationScheme::Bls12381 {
                return Err(AttestationError::SchemeMismatch {
                    expected: AttestationScheme::Bls12381.to_string(),
                    actual: attestation.scheme.to_string(),
                });
            }
            let index = self.roster.index_of(&attestation.validator_id).ok_or_else(|| {
                AttestationError::UnknownValidator {
                    validator_id: attestation.validator_id.clone(),
                }
            })?;
            // Bitfield doubles as the dedup index.
            if participants[index] {
                continue;
            }
            if !self.verify(attestation) {
                return Err(AttestationError::MemberVerificationFailed {
                    validator_id: attestation.validator_id.clone(),
                });
            }
            participants.set(index, true);
            signatures.push(BlsSignature::from_slice(&attestation.signature)?);
            public_keys.push(BlsPublicKey::from_slice(&attestation.public_key)?);
            achieved_weight += attestation.weight;
        }

        for (index, bit) in participants.iter().enumerate() {
            if *bit {
                participant_ids.push(self.roster.entries()[index].validator_id.clone());
            }
        }

        let aggregate_signature = BlsSignature::aggregate(&signatures)?;
        let aggregate_public_key = BlsPublicKey::aggregate(&public_keys)?;
        let required_weight = threshold_weight(self.roster.total_weight());

        Ok(AggregatedAttestation {
            scheme: AttestationScheme::Bls12381,
            message_hash,
            aggregate_signature: aggregate_signature.to_bytes().to_vec(),
            aggregate_public_key: aggregate_public_key.to_bytes().to_vec(),
            signatures: Vec::new(),
            participants,
            participant_ids,
            achieved_weight,
            required_weight,
            threshold_met: achieved_weight >= required_weight,
            timestamp: Utc::now(),
        })
    }

    fn verify_aggregated(&self, aggregated: &AggregatedAttestation) -> bool {
        if aggregated.scheme != AttestationScheme::Bls12381 {
            return false;
        }
        if aggregated.participants.not_any() {
            return false;
        }

        // The bitfield must reproduce the aggregate public key exactly.
        let mut member_keys = Vec::new();
        for (index, bit) in aggregated.participants.iter().enumerate() {
            if !*bit {
                continue;
            }
            let Some(entry) = self.roster.entries().get(index) else {
                return false;
            };
            let Some(key) = self.roster_key(&entry.validator_id) else {
                return false;
            };
            member_keys.push(key);
        }
        let Ok(expected_key) = BlsPublicKey::aggregate(&member_keys) else {
            return false;
        };
        if expected_key.to_bytes().to_vec() != aggregated.aggregate_public_key {
            return false;
        }

        let Ok(signature) = BlsSignature::from_slice(&aggregated.aggregate_signature) else {
            return false;
        };
        expected_key.verify(aggregated.message_hash.as_bytes(), &signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RosterEntry;

    fn fixture(n: usize) -> (Vec<BlsKeyPair>, ValidatorRoster) {
        let keypairs: Vec<BlsKeyPair> = (0..n).map(|_| BlsKeyPair::generate()).collect();
        let entries = keypairs
            .iter()
            .enumerate()
            .map(|(i, kp)| RosterEntry {
                validator_id: format!("validator-{}", i + 1),
                public_key: kp.public_key().to_bytes().to_vec(),
                weight: 1,
            })
            .collect();
        (keypairs, ValidatorRoster::new(entries))
    }

    fn strategy_for(index: usize, keypairs: &[BlsKeyPair], roster: &ValidatorRoster) -> BlsAttestationStrategy {
        BlsAttestationStrategy::new(
            format!("validator-{}", index + 1),
            BlsKeyPair::from_secret_bytes(&keypairs[index].secret_bytes()).unwrap(),
            roster.clone(),
        )
        .unwrap()
    }

    #[test]
    fn sign_verify_roundtrip() {
        let (keypairs, roster) = fixture(4);
        let strategy = strategy_for(0, &keypairs, &roster);
        let attestation = strategy.sign(b"attest this").unwrap();
        assert!(strategy.verify(&attestation));
    }

    #[test]
    fn verify_rejects_key_not_in_roster() {
        let (keypairs, roster) = fixture(4);
        let strategy = strategy_for(0, &keypairs, &roster);
        let mut attestation = strategy.sign(b"attest this").unwrap();
        attestation.validator_id = "validator-99".into();
        assert!(!strategy.verify(&attestation));
    }

    #[test]
    fn quorum_of_four_over_four_is_met_and_verifies() {
        let (keypairs, roster) = fixture(4);
        let strategy = strategy_for(0, &keypairs, &roster);
        let attestations: Vec<Attestation> = (0..4)
            .map(|i| strategy_for(i, &keypairs, &roster).sign(b"msg").unwrap())
            .collect();
        let aggregated = strategy.aggregate(&attestations).unwrap();
        assert_eq!(aggregated.achieved_weight, 4);
        assert_eq!(aggregated.required_weight, 4);
        assert!(aggregated.threshold_met);
        assert!(strategy.verify_aggregated(&aggregated));
        assert_eq!(aggregated.participant_count(), 4);
        assert!(aggregated.signatures.is_empty());
    }

    #[test]
    fn three_of_four_misses_threshold_but_still_verifies() {
        let (keypairs, roster) = fixture(4);
        let strategy = strategy_for(0, &keypairs, &roster);
        let attestations: Vec<Attestation> = (0..3)
            .map(|i| strategy_for(i, &keypairs, &roster).sign(b"msg").unwrap())
            .collect();
        let aggregated = strategy.aggregate(&attestations).unwrap();
        assert_eq!(aggregated.achieved_weight, 3);
        assert_eq!(aggregated.required_weight, 4);
        assert!(!aggregated.threshold_met);
        // Cryptographic verification is independent of the threshold policy.
        assert!(strategy.verify_aggregated(&aggregated));
    }

    #[test]
    fn duplicate_attestations_are_deduplicated() {
        let (keypairs, roster) = fixture(4);
        let strategy = strategy_for(0, &keypairs, &roster);
        let att = strategy.sign(b"msg").unwrap();
        let aggregated = strategy.aggregate(&[att.clone(), att]).unwrap();
        assert_eq!(aggregated.participant_count(), 1);
        assert_eq!(aggregated.achieved_weight, 1);
    }

    #[test]
    fn empty_set_rejected() {
        let (keypairs, roster) = fixture(4);
        let strategy = strategy_for(0, &keypairs, &roster);
        assert!(matches!(
            strategy.aggregate(&[]),
            Err(AttestationError::EmptySet)
        ));
    }

    #[test]
    fn tampered_member_fails_aggregation() {
        let (keypairs, roster) = fixture(4);
        let strategy = strategy_for(0, &keypairs, &roster);
        let mut att = strategy_for(1, &keypairs, &roster).sign(b"msg").unwrap();
        att.message_hash = sha256(b"msg"); // unchanged hash, tamper the signature
        att.signature[0] ^= 0xff;
        let err = strategy.aggregate(&[att]).unwrap_err();
        assert!(matches!(err, AttestationError::MemberVerificationFailed { .. })
            || matches!(err, AttestationError::Crypto(_)));
    }

    #[test]
    fn aggregate_with_wrong_bitfield_fails_verification() {
        let (keypairs, roster) = fixture(4);
        let strategy = strategy_for(0, &keypairs, &roster);
        let attestations: Vec<Attestation> = (0..2)
            .map(|i| strategy_for(i, &keypairs, &roster).sign(b"msg").unwrap())
            .collect();
        let mut aggregated = strategy.aggregate(&attestations).unwrap();
        // Claim an extra participant that never signed.
        aggregated.participants.set(3, true);
        assert!(!strategy.verify_aggregated(&aggregated));
    }
}
