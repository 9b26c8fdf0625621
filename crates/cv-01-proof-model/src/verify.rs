//! Fail-closed verification of every proof component.
//!
//! Any missing input, length violation or hash mismatch is a rejection;
//! "missing" is never treated as "ok".

use crate::domain::{
    AnchorBinding, AuthorityProofError, ChainedProof, GovernanceLevel, GovernanceProof,
    MerkleInclusion, ProofBundle, ProofError, ProofResult, StateProofError,
};
use shared_crypto::canonical::canonical_sha256;
use shared_crypto::hashing::sha256;
use shared_crypto::{Ed25519PublicKey, Ed25519Signature};

/// Verify chain continuity and per-layer anchor recomputation of a chained
/// proof.
///
/// Continuity is checked at each boundary before the next layer's fold, so a
/// tampered `l2.start` surfaces as a layer-2 discontinuity rather than a
/// layer-2 anchor mismatch.
pub fn verify_state_proof(proof: &ChainedProof) -> Result<(), StateProofError> {
    let recomputed = proof.l1.recompute_anchor();
    if recomputed != proof.l1.anchor {
        return Err(StateProofError::new(1, "anchor mismatch"));
    }

    if proof.l1.anchor != proof.l2.start {
        return Err(StateProofError::new(2, "chain discontinuity"));
    }
    if proof.l2.recompute_anchor() != proof.l2.anchor {
        return Err(StateProofError::new(2, "anchor mismatch"));
    }

    if proof.l2.anchor != proof.l3.start {
        return Err(StateProofError::new(3, "chain discontinuity"));
    }
    if proof.l3.recompute_anchor() != proof.l3.anchor {
        return Err(StateProofError::new(3, "anchor mismatch"));
    }

    if proof.l3.anchor != proof.network_root {
        return Err(StateProofError::new(3, "network root mismatch"));
    }

    Ok(())
}

/// Verify a governance proof at its declared level.
///
/// G1 and above iterate the signer set, accumulating weight; every signature
/// must verify individually and the accumulated weight must reach the
/// required threshold. G2 additionally checks the outcome binding.
pub fn verify_authority_proof(proof: &GovernanceProof) -> Result<(), AuthorityProofError> {
    if proof.level == GovernanceLevel::G0 {
        if !proof.anchor_finalized {
            return Err(AuthorityProofError::new(0, "anchor not finalized"));
        }
        return Ok(());
    }

    // G1+: anchor finality carries forward.
    if !proof.anchor_finalized {
        return Err(AuthorityProofError::new(0, "anchor not finalized"));
    }
    if proof.key_page.is_none() {
        return Err(AuthorityProofError::new(0, "missing key page reference"));
    }
    if proof.signers.is_empty() {
        return Err(AuthorityProofError::new(0, "empty signer set"));
    }

    let mut accumulated: u64 = 0;
    for (index, signer) in proof.signers.iter().enumerate() {
        let key_bytes = hex::decode(&signer.public_key)
            .map_err(|_| AuthorityProofError::new(index, "public key is not valid hex"))?;

        if sha256(&key_bytes) != signer.public_key_hash {
            return Err(AuthorityProofError::new(index, "public key hash mismatch"));
        }

        let public_key = Ed25519PublicKey::from_slice(&key_bytes)
            .map_err(|_| AuthorityProofError::new(index, "invalid public key"))?;
        let sig_bytes = hex::decode(&signer.signature)
            .map_err(|_| AuthorityProofError::new(index, "signature is not valid hex"))?;
        let signature = Ed25519Signature::from_slice(&sig_bytes)
            .map_err(|_| AuthorityProofError::new(index, "invalid signature format"))?;

        public_key
            .verify(signer.signed_hash.as_bytes(), &signature)
            .map_err(|_| AuthorityProofError::new(index, "signature verification failed"))?;

        accumulated = accumulated.saturating_add(signer.weight);
    }

    if accumulated < proof.required_threshold {
        return Err(AuthorityProofError::new(
            proof.signers.len(),
            format!(
                "threshold not met: accumulated {} < required {}",
                accumulated, proof.required_threshold
            ),
        ));
    }

    if proof.level == GovernanceLevel::G2 {
        let outcome = proof
            .outcome
            .as_ref()
            .ok_or_else(|| AuthorityProofError::new(0, "missing outcome binding"))?;
        if outcome.payload_hash != outcome.expected_payload_hash {
            return Err(AuthorityProofError::new(0, "payload hash mismatch"));
        }
        for (index, effect) in outcome.effects.iter().enumerate() {
            if effect.expected != effect.observed {
                return Err(AuthorityProofError::new(
                    index,
                    "effect does not match expectation",
                ));
            }
        }
        if !outcome.receipt_finalized {
            return Err(AuthorityProofError::new(
                0,
                "receipt not bound to a finalized block",
            ));
        }
    }

    Ok(())
}

/// Verify an anchor binding: recompute the binding hash and check the
/// coordinator signature over it.
pub fn verify_anchor_binding(binding: &AnchorBinding) -> ProofResult<()> {
    let recomputed = AnchorBinding::compute_hash(
        &binding.merkle_root_hash,
        &binding.anchor_tx_hash,
        binding.anchor_block_num,
        binding.anchor_chain_id,
    )?;
    if recomputed != binding.binding_hash {
        return Err(ProofError::Binding("binding hash mismatch".into()));
    }

    let key_bytes = hex::decode(&binding.coordinator_public_key)
        .map_err(|_| ProofError::Binding("coordinator key is not valid hex".into()))?;
    let public_key = Ed25519PublicKey::from_slice(&key_bytes)
        .map_err(|_| ProofError::Binding("invalid coordinator public key".into()))?;
    let sig_bytes = hex::decode(&binding.signature)
        .map_err(|_| ProofError::Binding("signature is not valid hex".into()))?;
    let signature = Ed25519Signature::from_slice(&sig_bytes)
        .map_err(|_| ProofError::Binding("invalid signature format".into()))?;

    public_key
        .verify(binding.binding_hash.as_bytes(), &signature)
        .map_err(|_| ProofError::Binding("coordinator signature verification failed".into()))?;

    Ok(())
}

/// Verify that a Merkle inclusion path folds to its stored root.
pub fn verify_merkle_inclusion(inclusion: &MerkleInclusion) -> ProofResult<()> {
    if inclusion.recompute_root() != inclusion.root {
        return Err(ProofError::Inclusion("path does not fold to root".into()));
    }
    Ok(())
}

/// Recompute the bundle's artifact hash over its components and compare with
/// the stored integrity value.
pub fn verify_bundle_integrity(bundle: &ProofBundle) -> ProofResult<()> {
    if bundle.integrity.artifact_hash.is_zero() {
        return Err(ProofError::Integrity("artifact hash missing".into()));
    }
    let recomputed = canonical_sha256(&bundle.components)?;
    if recomputed != bundle.integrity.artifact_hash {
        return Err(ProofError::Integrity("artifact hash mismatch".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        AnchorReference, BundleComponents, BundleIntegrity, EffectCheck, EffectKind, KeyPageRef,
        OutcomeBinding, ProofEntry, ProofLayer, SignerEntry,
    };
    use shared_crypto::hashing::fold_step;
    use shared_crypto::Ed25519KeyPair;
    use shared_types::Hash32;

    fn layer_from(start: Hash32, seeds: &[(&str, bool)]) -> ProofLayer {
        let entries: Vec<ProofEntry> = seeds
            .iter()
            .map(|(tag, right)| ProofEntry {
                hash: sha256(tag.as_bytes()),
                right: *right,
            })
            .collect();
        let anchor = entries
            .iter()
            .fold(start, |acc, e| fold_step(acc, e.hash, e.right));
        ProofLayer {
            start,
            entries,
            anchor,
        }
    }

    pub(crate) fn valid_chained_proof() -> ChainedProof {
        let l1 = layer_from(sha256(b"tx"), &[("a", true), ("b", false)]);
        let l2 = layer_from(l1.anchor, &[("c", true)]);
        let l3 = layer_from(l2.anchor, &[("d", false), ("e", true)]);
        let network_root = l3.anchor;
        ChainedProof {
            l1,
            l2,
            l3,
            network_root,
        }
    }

    fn signer(keypair: &Ed25519KeyPair, signed_hash: Hash32, weight: u64) -> SignerEntry {
        let key_bytes = *keypair.public_key().as_bytes();
        SignerEntry {
            public_key: hex::encode(key_bytes),
            public_key_hash: sha256(&key_bytes),
            signature: hex::encode(keypair.sign(signed_hash.as_bytes()).as_bytes()),
            signed_hash,
            weight,
        }
    }

    fn g1_proof(signed_hash: Hash32, keys: &[Ed25519KeyPair], threshold: u64) -> GovernanceProof {
        GovernanceProof {
            level: GovernanceLevel::G1,
            anchor_finalized: true,
            key_page: Some(KeyPageRef {
                url: "acc://demo/book/1".into(),
                version: 3,
            }),
            signers: keys.iter().map(|k| signer(k, signed_hash, 1)).collect(),
            required_threshold: threshold,
            outcome: None,
        }
    }

    #[test]
    fn valid_chain_verifies() {
        assert!(verify_state_proof(&valid_chained_proof()).is_ok());
    }

    #[test]
    fn tampered_l2_start_is_layer_2_discontinuity() {
        let mut proof = valid_chained_proof();
        proof.l2.start = sha256(b"tampered");
        let err = verify_state_proof(&proof).unwrap_err();
        assert_eq!(err.layer, 2);
        assert_eq!(err.reason, "chain discontinuity");
    }

    #[test]
    fn tampered_l1_anchor_is_layer_1_mismatch() {
        let mut proof = valid_chained_proof();
        proof.l1.anchor = sha256(b"tampered");
        let err = verify_state_proof(&proof).unwrap_err();
        assert_eq!(err.layer, 1);
        assert_eq!(err.reason, "anchor mismatch");
    }

    #[test]
    fn wrong_network_root_is_layer_3_failure() {
        let mut proof = valid_chained_proof();
        proof.network_root = sha256(b"other root");
        let err = verify_state_proof(&proof).unwrap_err();
        assert_eq!(err.layer, 3);
        assert_eq!(err.reason, "network root mismatch");
    }

    #[test]
    fn g1_meets_threshold() {
        let keys: Vec<Ed25519KeyPair> = (0..3).map(|_| Ed25519KeyPair::generate()).collect();
        let proof = g1_proof(sha256(b"message"), &keys, 3);
        assert!(verify_authority_proof(&proof).is_ok());
    }

    #[test]
    fn g1_below_threshold_fails() {
        let keys: Vec<Ed25519KeyPair> = (0..2).map(|_| Ed25519KeyPair::generate()).collect();
        let proof = g1_proof(sha256(b"message"), &keys, 3);
        let err = verify_authority_proof(&proof).unwrap_err();
        assert!(err.reason.contains("threshold not met"));
    }

    #[test]
    fn g1_bad_signature_names_index() {
        let keys: Vec<Ed25519KeyPair> = (0..2).map(|_| Ed25519KeyPair::generate()).collect();
        let mut proof = g1_proof(sha256(b"message"), &keys, 2);
        proof.signers[1].signed_hash = sha256(b"different message");
        let err = verify_authority_proof(&proof).unwrap_err();
        assert_eq!(err.signature_index, 1);
        assert_eq!(err.reason, "signature verification failed");
    }

    #[test]
    fn g1_key_hash_mismatch_rejected() {
        let keys = vec![Ed25519KeyPair::generate()];
        let mut proof = g1_proof(sha256(b"message"), &keys, 1);
        proof.signers[0].public_key_hash = sha256(b"not the key");
        let err = verify_authority_proof(&proof).unwrap_err();
        assert_eq!(err.reason, "public key hash mismatch");
    }

    #[test]
    fn g1_empty_signers_rejected() {
        let proof = GovernanceProof {
            level: GovernanceLevel::G1,
            anchor_finalized: true,
            key_page: Some(KeyPageRef {
                url: "acc://demo/book/1".into(),
                version: 1,
            }),
            signers: Vec::new(),
            required_threshold: 0,
            outcome: None,
        };
        assert!(verify_authority_proof(&proof).is_err());
    }

    #[test]
    fn g2_requires_matching_outcome() {
        let keys = vec![Ed25519KeyPair::generate()];
        let mut proof = g1_proof(sha256(b"message"), &keys, 1);
        proof.level = GovernanceLevel::G2;
        proof.outcome = Some(OutcomeBinding {
            payload_hash: sha256(b"payload"),
            expected_payload_hash: sha256(b"payload"),
            effects: vec![EffectCheck {
                kind: EffectKind::Transfer,
                expected: serde_json::json!({"amount": "100"}),
                observed: serde_json::json!({"amount": "100"}),
            }],
            receipt_block_number: 18_000_000,
            receipt_finalized: true,
        });
        assert!(verify_authority_proof(&proof).is_ok());

        let outcome = proof.outcome.as_mut().unwrap();
        outcome.effects[0].observed = serde_json::json!({"amount": "99"});
        assert!(verify_authority_proof(&proof).is_err());
    }

    #[test]
    fn g2_unfinalized_receipt_rejected() {
        let keys = vec![Ed25519KeyPair::generate()];
        let mut proof = g1_proof(sha256(b"message"), &keys, 1);
        proof.level = GovernanceLevel::G2;
        proof.outcome = Some(OutcomeBinding {
            payload_hash: sha256(b"payload"),
            expected_payload_hash: sha256(b"payload"),
            effects: Vec::new(),
            receipt_block_number: 1,
            receipt_finalized: false,
        });
        assert!(verify_authority_proof(&proof).is_err());
    }

    #[test]
    fn anchor_binding_roundtrip() {
        let coordinator = Ed25519KeyPair::generate();
        let binding = AnchorBinding::sign(
            &coordinator,
            Hash32::from_bytes([9u8; 32]),
            "0xfeed".into(),
            77,
            1,
        )
        .unwrap();
        assert!(verify_anchor_binding(&binding).is_ok());
    }

    #[test]
    fn anchor_binding_tamper_rejected() {
        let coordinator = Ed25519KeyPair::generate();
        let mut binding = AnchorBinding::sign(
            &coordinator,
            Hash32::from_bytes([9u8; 32]),
            "0xfeed".into(),
            77,
            1,
        )
        .unwrap();
        binding.anchor_block_num = 78;
        assert!(verify_anchor_binding(&binding).is_err());
    }

    pub(crate) fn sample_bundle() -> ProofBundle {
        let chained = valid_chained_proof();
        let leaf = sha256(b"leaf");
        let sibling = sha256(b"sibling");
        let root = fold_step(leaf, sibling, true);
        let components = BundleComponents {
            merkle_inclusion: MerkleInclusion {
                leaf_hash: leaf,
                leaf_index: 0,
                path: vec![ProofEntry {
                    hash: sibling,
                    right: true,
                }],
                root,
            },
            anchor_reference: AnchorReference {
                tx_hash: "0xbbb".into(),
                block_number: 18_000_000,
                block_hash: "0xccc".into(),
                chain_id: 1,
                target_chain: "ethereum".into(),
                confirmations: 12,
                finalized: true,
            },
            chained_proof: chained,
            governance_proof: GovernanceProof::g0(true),
        };
        let artifact_hash = canonical_sha256(&components).unwrap();
        ProofBundle {
            version: crate::domain::BUNDLE_SCHEMA_VERSION.into(),
            tx_ref: "acc://demo/book/1@0xaaa".into(),
            components,
            attestations: Vec::new(),
            integrity: BundleIntegrity {
                artifact_hash,
                custody_chain_hash: sha256(b"custody"),
                bundle_signature: String::new(),
            },
        }
    }

    #[test]
    fn bundle_integrity_roundtrip() {
        let bundle = sample_bundle();
        assert!(verify_bundle_integrity(&bundle).is_ok());
        assert!(verify_merkle_inclusion(&bundle.components.merkle_inclusion).is_ok());
    }

    #[test]
    fn bundle_integrity_tamper_rejected() {
        let mut bundle = sample_bundle();
        bundle.components.anchor_reference.block_number += 1;
        assert!(verify_bundle_integrity(&bundle).is_err());
    }

    #[test]
    fn bundle_integrity_zero_hash_rejected() {
        let mut bundle = sample_bundle();
        bundle.integrity.artifact_hash = Hash32::ZERO;
        assert!(verify_bundle_integrity(&bundle).is_err());
    }
}
