//! Source-ledger port.
//!
//! The ledger RPC client itself is an external collaborator; this is the
//! surface the orchestrator needs from it: chained-proof and
//! governance-proof construction, and synthetic-transaction write-back.

use async_trait::async_trait;
use cv_01_proof_model::{ChainedProof, GovernanceProof};
use serde::{Deserialize, Serialize};
use shared_types::Hash32;

/// A synthetic source-ledger transaction recording a cycle's outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticTransaction {
    /// Principal account the transaction is addressed to.
    pub principal: String,
    /// Bundle the transaction records.
    pub bundle_id: String,
    /// SHA-256 of the gzipped bundle.
    pub bundle_hash: Hash32,
    /// Aggregated attestation signature, hex encoded.
    pub aggregate_signature: String,
    /// The submitting validator's own Ed25519 signature over
    /// `bundle_hash`, hex encoded.
    pub validator_signature: String,
    /// Submitting validator id.
    pub validator_id: String,
}

/// Source-ledger surface used by the orchestrator.
#[async_trait]
pub trait SourceLedger: Send + Sync {
    /// Build the L1/L2/L3 chained proof for a transaction through the given
    /// partition.
    async fn chained_proof(
        &self,
        account_url: &str,
        tx_hash: &str,
        partition: &str,
    ) -> Result<ChainedProof, String>;

    /// Build the governance proof for an operation.
    async fn governance_proof(&self, operation_id: &Hash32) -> Result<GovernanceProof, String>;

    /// Submit a synthetic transaction, returning its ledger hash.
    async fn submit_synthetic_transaction(
        &self,
        tx: &SyntheticTransaction,
    ) -> Result<String, String>;
}

// =============================================================================
// Mock Implementation for Testing
// =============================================================================

/// Scripted source ledger.
#[derive(Default)]
pub struct MockSourceLedger {
    inner: parking_lot::Mutex<MockLedgerState>,
}

#[derive(Default)]
struct MockLedgerState {
    fail_chained_proof: bool,
    fail_write_back: bool,
    governance: Option<GovernanceProof>,
    submitted: Vec<SyntheticTransaction>,
}

impl MockSourceLedger {
    /// Fresh mock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make chained-proof construction fail.
    pub fn set_fail_chained_proof(&self, fail: bool) {
        self.inner.lock().fail_chained_proof = fail;
    }

    /// Make write-back fail.
    pub fn set_fail_write_back(&self, fail: bool) {
        self.inner.lock().fail_write_back = fail;
    }

    /// Script the governance proof returned for every operation.
    pub fn set_governance(&self, proof: GovernanceProof) {
        self.inner.lock().governance = Some(proof);
    }

    /// Synthetic transactions submitted through the mock.
    pub fn submitted(&self) -> Vec<SyntheticTransaction> {
        self.inner.lock().submitted.clone()
    }
}

#[async_trait]
impl SourceLedger for MockSourceLedger {
    async fn chained_proof(
        &self,
        account_url: &str,
        tx_hash: &str,
        _partition: &str,
    ) -> Result<ChainedProof, String> {
        if self.inner.lock().fail_chained_proof {
            return Err("receipt unavailable".to_string());
        }
        // A structurally valid chain folded from the transaction hash.
        use cv_01_proof_model::{ProofEntry, ProofLayer};
        use shared_crypto::hashing::{fold_step, sha256, sha256_concat};

        let start = sha256_concat(&[account_url.as_bytes(), tx_hash.as_bytes()]);
        let mut layers = Vec::new();
        let mut cursor = start;
        for tag in ["account", "partition", "network"] {
            let entry = ProofEntry {
                hash: sha256(tag.as_bytes()),
                right: true,
            };
            let anchor = fold_step(cursor, entry.hash, entry.right);
            layers.push(ProofLayer {
                start: cursor,
                entries: vec![entry],
                anchor,
            });
            cursor = anchor;
        }
        let l3 = layers.pop().expect("three layers");
        let l2 = layers.pop().expect("two layers");
        let l1 = layers.pop().expect("one layer");
        let network_root = l3.anchor;
        Ok(ChainedProof {
            l1,
            l2,
            l3,
            network_root,
        })
    }

    async fn governance_proof(&self, _operation_id: &Hash32) -> Result<GovernanceProof, String> {
        Ok(self
            .inner
            .lock()
            .governance
            .clone()
            .unwrap_or_else(|| GovernanceProof::g0(true)))
    }

    async fn submit_synthetic_transaction(
        &self,
        tx: &SyntheticTransaction,
    ) -> Result<String, String> {
        let mut state = self.inner.lock();
        if state.fail_write_back {
            return Err("ledger rejected synthetic transaction".to_string());
        }
        state.submitted.push(tx.clone());
        Ok(format!(
            "0x{}",
            shared_crypto::hashing::sha256(tx.bundle_id.as_bytes()).to_hex()
        ))
    }
}
