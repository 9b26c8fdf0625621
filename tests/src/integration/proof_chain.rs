//! Proof-model end-to-end properties.

use cv_01_proof_model::{
    compute_operation_id, decode_bundle, encode_bundle, gunzip_bundle, gzip_bundle,
    verify_bundle_integrity, verify_state_proof, AnchorReference, BundleComponents,
    BundleIntegrity, ChainedProof, GovernanceProof, MerkleInclusion, ProofBundle, ProofEntry,
    ProofLayer, BUNDLE_SCHEMA_VERSION,
};
use shared_crypto::canonical::canonical_sha256;
use shared_crypto::hashing::{fold_step, sha256};

fn folded_layer(start: shared_types::Hash32, tags: &[&str]) -> ProofLayer {
    let entries: Vec<ProofEntry> = tags
        .iter()
        .map(|tag| ProofEntry {
            hash: sha256(tag.as_bytes()),
            right: true,
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

fn chained() -> ChainedProof {
    let l1 = folded_layer(sha256(b"tx"), &["a1", "a2"]);
    let l2 = folded_layer(l1.anchor, &["p1"]);
    let l3 = folded_layer(l2.anchor, &["n1", "n2", "n3"]);
    let network_root = l3.anchor;
    ChainedProof {
        l1,
        l2,
        l3,
        network_root,
    }
}

fn bundle() -> ProofBundle {
    let leaf = sha256(b"leaf");
    let sibling = sha256(b"sibling");
    let components = BundleComponents {
        merkle_inclusion: MerkleInclusion {
            leaf_hash: leaf,
            leaf_index: 0,
            path: vec![ProofEntry {
                hash: sibling,
                right: true,
            }],
            root: fold_step(leaf, sibling, true),
        },
        anchor_reference: AnchorReference {
            tx_hash: format!("0x{}", "bb".repeat(32)),
            block_number: 18_000_000,
            block_hash: format!("0x{}", "cc".repeat(32)),
            chain_id: 1,
            target_chain: "ethereum".into(),
            confirmations: 12,
            finalized: true,
        },
        chained_proof: chained(),
        governance_proof: GovernanceProof::g0(true),
    };
    let artifact_hash = canonical_sha256(&components).unwrap();
    ProofBundle {
        version: BUNDLE_SCHEMA_VERSION.into(),
        tx_ref: "acc://demo/book/1@0xaaa".into(),
        components,
        attestations: Vec::new(),
        integrity: BundleIntegrity {
            artifact_hash,
            custody_chain_hash: sha256(b"custody head"),
            bundle_signature: "ab".repeat(64),
        },
    }
}

/// A chained proof whose `l2.start` is tampered to differ from `l1.anchor`
/// fails with a layer-2 chain discontinuity.
#[test]
fn tampered_l2_start_reports_layer_2_discontinuity() {
    let mut proof = chained();
    assert!(verify_state_proof(&proof).is_ok());

    proof.l2.start = sha256(b"tampered");
    let err = verify_state_proof(&proof).unwrap_err();
    assert_eq!(err.layer, 2);
    assert_eq!(err.reason, "chain discontinuity");
}

/// Bundle → JSON → gzip → JSON → bundle is identity-preserving, and the
/// recovered bundle still passes integrity verification.
#[test]
fn bundle_round_trip_preserves_identity_and_integrity() {
    let original = bundle();
    assert!(verify_bundle_integrity(&original).is_ok());

    let json = encode_bundle(&original).unwrap();
    let from_json = decode_bundle(&json).unwrap();
    assert_eq!(from_json, original);

    let compressed = gzip_bundle(&original).unwrap();
    let from_gzip = gunzip_bundle(&compressed).unwrap();
    assert_eq!(from_gzip, original);
    assert!(verify_bundle_integrity(&from_gzip).is_ok());
}

/// Operation ids are deterministic over their inputs across runs.
#[test]
fn operation_ids_are_stable() {
    let tx_hash = format!("0x{}", "aa".repeat(32));
    let first = compute_operation_id(&tx_hash, "acc://demo/book/1", 1_234, 1_700_000_000).unwrap();
    let second = compute_operation_id(&tx_hash, "acc://demo/book/1", 1_234, 1_700_000_000).unwrap();
    assert_eq!(first, second);

    let other = compute_operation_id(&tx_hash, "acc://demo/book/2", 1_234, 1_700_000_000).unwrap();
    assert_ne!(first, other);
}

/// Custody chains in a bundle's lifecycle journal are totally ordered by
/// hash linkage.
#[test]
fn custody_chain_orders_by_linkage() {
    use cv_08_lifecycle::CustodyChain;

    let mut chain = CustodyChain::new("P1");
    for step in ["created", "batched", "anchored", "attested", "verified"] {
        chain.append(step, serde_json::json!({ "step": step })).unwrap();
    }
    assert!(chain.verify().is_ok());
    let events = chain.events();
    for pair in events.windows(2) {
        assert_eq!(pair[1].previous_hash, pair[0].current_hash);
    }
}
