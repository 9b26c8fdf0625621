//! The chain strategy contract.

use crate::config::ChainStrategyConfig;
use crate::error::StrategyResult;
use async_trait::async_trait;
use cv_03_observer::ObservationResult;
use serde::{Deserialize, Serialize};
use shared_types::{AnchorClass, AnchorResult, ChainPlatform, Hash32};

/// Request to record a batch's Merkle root on an external chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateAnchorRequest {
    /// Batch being anchored.
    pub batch_id: String,
    /// Merkle root of the sealed batch.
    pub merkle_root: Hash32,
    /// Anchor class of the batch.
    pub class: AnchorClass,
}

/// A proof step submitted against an existing anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofSubmission {
    /// Proof the submission belongs to.
    pub proof_id: String,
    /// SHA-256 of the gzipped bundle being recorded.
    pub bundle_hash: Hash32,
    /// Opaque proof payload.
    pub payload: serde_json::Value,
}

/// Parameters for a governance-gated execution against an anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceExecutionParams {
    /// Operation being executed.
    pub operation_id: Hash32,
    /// Governance level the execution was authorized at (0-2).
    pub governance_level: u8,
    /// Opaque execution payload.
    pub payload: serde_json::Value,
}

/// Uniform contract across chain backends.
///
/// Implementations must be safe for concurrent use; one strategy instance
/// serves every cycle targeting its chain.
#[async_trait]
pub trait ChainStrategy: Send + Sync {
    /// The strategy's configuration.
    fn config(&self) -> &ChainStrategyConfig;

    /// Chain platform.
    fn platform(&self) -> ChainPlatform {
        self.config().platform
    }

    /// Numeric chain id.
    fn chain_id(&self) -> u64 {
        self.config().chain_id
    }

    /// Network name.
    fn network_name(&self) -> &str {
        &self.config().network_name
    }

    /// Confirmation depth required for finality.
    fn required_confirmations(&self) -> u64 {
        self.config().effective_required_confirmations()
    }

    /// Latest block number on the chain.
    async fn current_block(&self) -> StrategyResult<u64>;

    /// Cheap liveness probe of the backend.
    async fn health_check(&self) -> StrategyResult<()>;

    /// Record a batch Merkle root on the chain.
    async fn create_anchor(&self, request: &CreateAnchorRequest) -> StrategyResult<AnchorResult>;

    /// Submit a proof step against an existing anchor.
    async fn submit_proof(
        &self,
        anchor_id: &str,
        submission: &ProofSubmission,
    ) -> StrategyResult<AnchorResult>;

    /// Execute a governance-gated operation against an anchor.
    async fn execute_with_governance(
        &self,
        anchor_id: &str,
        params: &GovernanceExecutionParams,
    ) -> StrategyResult<AnchorResult>;

    /// Block until the transaction finalizes or the observer deadline
    /// elapses.
    async fn observe_transaction(&self, tx_hash: &str) -> StrategyResult<ObservationResult>;

    /// Current receipt state of a transaction, finalized or not.
    async fn transaction_receipt(&self, tx_hash: &str) -> StrategyResult<ObservationResult>;
}

// =============================================================================
// Mock Implementation for Testing
// =============================================================================

/// Scripted strategy for downstream tests.
pub struct MockChainStrategy {
    config: ChainStrategyConfig,
    inner: parking_lot::Mutex<MockStrategyState>,
}

#[derive(Default)]
struct MockStrategyState {
    observations: std::collections::HashMap<String, ObservationResult>,
    anchors: Vec<CreateAnchorRequest>,
    next_block: u64,
    fail_observation: bool,
}

impl MockChainStrategy {
    /// Mock strategy over a config.
    pub fn new(config: ChainStrategyConfig) -> Self {
        Self {
            config,
            inner: parking_lot::Mutex::new(MockStrategyState {
                next_block: 18_000_000,
                ..Default::default()
            }),
        }
    }

    /// Script the observation result for a transaction hash.
    pub fn script_observation(&self, tx_hash: &str, result: ObservationResult) {
        self.inner
            .lock()
            .observations
            .insert(tx_hash.to_string(), result);
    }

    /// Make observations fail with a transient error.
    pub fn set_fail_observation(&self, fail: bool) {
        self.inner.lock().fail_observation = fail;
    }

    /// Anchors created through the mock.
    pub fn created_anchors(&self) -> Vec<CreateAnchorRequest> {
        self.inner.lock().anchors.clone()
    }

    fn anchor_result(&self, tx_hash: String) -> AnchorResult {
        let block = self.inner.lock().next_block;
        AnchorResult {
            tx_hash,
            block_number: block,
            block_hash: format!("0x{:064x}", block),
            status: shared_types::AnchorStatus::Pending,
            confirmations: 0,
            gas_used: 0,
        }
    }
}

#[async_trait]
impl ChainStrategy for MockChainStrategy {
    fn config(&self) -> &ChainStrategyConfig {
        &self.config
    }

    async fn current_block(&self) -> StrategyResult<u64> {
        Ok(self.inner.lock().next_block)
    }

    async fn health_check(&self) -> StrategyResult<()> {
        Ok(())
    }

    async fn create_anchor(&self, request: &CreateAnchorRequest) -> StrategyResult<AnchorResult> {
        let tx_hash = format!(
            "0x{}",
            shared_crypto::hashing::sha256(request.batch_id.as_bytes()).to_hex()
        );
        self.inner.lock().anchors.push(request.clone());
        Ok(self.anchor_result(tx_hash))
    }

    async fn submit_proof(
        &self,
        anchor_id: &str,
        _submission: &ProofSubmission,
    ) -> StrategyResult<AnchorResult> {
        Ok(self.anchor_result(format!(
            "0x{}",
            shared_crypto::hashing::sha256(anchor_id.as_bytes()).to_hex()
        )))
    }

    async fn execute_with_governance(
        &self,
        anchor_id: &str,
        _params: &GovernanceExecutionParams,
    ) -> StrategyResult<AnchorResult> {
        Ok(self.anchor_result(format!(
            "0x{}",
            shared_crypto::hashing::sha256(anchor_id.as_bytes()).to_hex()
        )))
    }

    async fn observe_transaction(&self, tx_hash: &str) -> StrategyResult<ObservationResult> {
        let state = self.inner.lock();
        if state.fail_observation {
            return Err(cv_03_observer::ObserverError::Rpc("mock failure".into()).into());
        }
        state.observations.get(tx_hash).cloned().ok_or_else(|| {
            cv_03_observer::ObserverError::NotYetMined {
                tx_hash: tx_hash.to_string(),
            }
            .into()
        })
    }

    async fn transaction_receipt(&self, tx_hash: &str) -> StrategyResult<ObservationResult> {
        self.observe_transaction(tx_hash).await
    }
}
