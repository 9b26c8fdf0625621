//! Validator block commit and recovery flows.

use chrono::Utc;
use cv_04_attestation::{BlsAttestationStrategy, RosterEntry, ValidatorRoster};
use cv_07_consensus::{ConsensusError, ConsensusService, ReplicationHeader};
use shared_crypto::BlsKeyPair;
use shared_storage::{ConsensusStore, MemoryStore};
use std::sync::Arc;

fn service(store: Arc<MemoryStore>) -> ConsensusService<MemoryStore> {
    let keypair = BlsKeyPair::generate();
    let roster = ValidatorRoster::new(vec![RosterEntry {
        validator_id: "validator-1".into(),
        public_key: keypair.public_key().to_bytes().to_vec(),
        weight: 1,
    }]);
    let strategy = BlsAttestationStrategy::new(
        "validator-1".into(),
        BlsKeyPair::from_secret_bytes(&keypair.secret_bytes()).unwrap(),
        roster,
    )
    .unwrap();
    ConsensusService::new(store, Arc::new(strategy), "validator-1")
}

fn header(height: u64) -> ReplicationHeader {
    ReplicationHeader {
        block_height: height,
        timestamp: Utc::now(),
        validator_id: "validator-1".into(),
    }
}

fn block(bundle_id: &str, proof_class: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "bundle_id": bundle_id,
        "operation_commitment": format!("commit-{bundle_id}"),
        "merkle_root": "11".repeat(32),
        "governance_proof": {"g0": true, "g1": true, "g2": true},
        "execution_proof": {"stage": "anchored", "proof_class": proof_class},
    }))
    .unwrap()
}

/// A validator block with `proof_class = "fastest"` is rejected at
/// pre-commit with code 3 and the literal reason.
#[tokio::test]
async fn invalid_proof_class_rejected_with_code_3() {
    let store = Arc::new(MemoryStore::new());
    let consensus = service(store.clone());

    let err = consensus
        .process_block(&block("b1", "fastest"), &header(1))
        .await
        .unwrap_err();
    match err {
        ConsensusError::Rejected { code, reason } => {
            assert_eq!(code, 3);
            assert_eq!(reason, "invalid proof class 'fastest'");
        }
        other => panic!("expected rejection, got {other:?}"),
    }
    assert!(store.entries_for_bundle("b1").await.unwrap().is_empty());
}

/// Committing the same validator block twice at the same height never
/// produces two consensus entries.
#[tokio::test]
async fn double_commit_is_idempotent() {
    let store = Arc::new(MemoryStore::new());
    let consensus = service(store.clone());

    let first = consensus
        .process_block(&block("b1", "on_cadence"), &header(1))
        .await
        .unwrap();
    assert!(first.entry_inserted);

    let second = consensus
        .process_block(&block("b1", "on_cadence"), &header(1))
        .await
        .unwrap();
    assert!(!second.entry_inserted);
    assert_eq!(second.height, 1);
    assert_eq!(second.app_hash, first.app_hash);

    let entries = store.entries_for_bundle("b1").await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].state, "completed");
    assert_eq!(entries[0].governance_level, 2);
}

/// Restarting over the same store resumes exactly at the persisted height
/// and application hash.
#[tokio::test]
async fn restart_resumes_from_persisted_abci_state() {
    let store = Arc::new(MemoryStore::new());
    let consensus = service(store.clone());
    consensus
        .process_block(&block("b1", "on_demand"), &header(1))
        .await
        .unwrap();
    let committed = consensus
        .process_block(&block("b2", "on_demand"), &header(2))
        .await
        .unwrap();

    let resumed = service(store.clone());
    resumed.recover().await.unwrap();
    assert_eq!(resumed.height(), 2);
    assert_eq!(resumed.app_hash(), committed.app_hash);

    let persisted = store.load_abci_state().await.unwrap().unwrap();
    assert_eq!(persisted.last_block_height, 2);
}
