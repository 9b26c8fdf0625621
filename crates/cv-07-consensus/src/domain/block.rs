//! Validator block entities.
//!
//! A validator block is the consensus-log record of one finalized bundle.
//! Header-derived fields (`block_height`, `timestamp`, `validator_id`) are
//! always overridden from the replication layer; whatever the proposer put
//! there is ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_types::{AnchorClass, Hash32};

/// Header fields supplied by the replication layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationHeader {
    /// Height the block is proposed at.
    pub block_height: u64,
    /// Replication-layer timestamp.
    pub timestamp: DateTime<Utc>,
    /// Proposing validator.
    pub validator_id: String,
}

/// Governance evidence carried by a block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockGovernance {
    /// Inclusion & finality proven.
    #[serde(default)]
    pub g0: bool,
    /// Key-page authority proven.
    #[serde(default)]
    pub g1: bool,
    /// Outcome binding proven.
    #[serde(default)]
    pub g2: bool,
    /// BLS aggregate over the governance evidence, hex encoded.
    #[serde(default)]
    pub bls_aggregate: Option<String>,
}

impl BlockGovernance {
    /// Highest proven level (0-2).
    pub fn level(&self) -> u8 {
        if self.g2 {
            2
        } else if self.g1 {
            1
        } else {
            0
        }
    }

    /// Levels must be downward-closed: G2 implies G1 implies G0.
    pub fn is_monotonic(&self) -> bool {
        !(self.g2 && !self.g1 || self.g1 && !self.g0)
    }
}

/// Execution stage evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionProof {
    /// Pipeline stage the proof was produced at.
    pub stage: String,
    /// Proof class as received; validated against the strict set.
    pub proof_class: String,
}

/// A validator block as proposed, before validation.
///
/// `proof_class` stays a raw string here so an invalid value is a
/// pre-commit rejection (code 3) rather than a parse failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawValidatorBlock {
    /// Bundle the block records.
    pub bundle_id: String,
    /// Proposer-declared height; overridden by the header.
    #[serde(default)]
    pub block_height: u64,
    /// Operation commitment.
    pub operation_commitment: String,
    /// Batch Merkle root.
    pub merkle_root: Hash32,
    /// Synthetic source-ledger transactions.
    #[serde(default)]
    pub synthetic_transactions: Vec<serde_json::Value>,
    /// Governance evidence.
    #[serde(default)]
    pub governance_proof: BlockGovernance,
    /// Cross-chain proof payload.
    #[serde(default)]
    pub cross_chain_proof: serde_json::Value,
    /// Execution stage evidence.
    pub execution_proof: ExecutionProof,
    /// Source-ledger anchor reference.
    #[serde(default)]
    pub accumulate_anchor_reference: Option<String>,
}

/// A validated validator block with header fields applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorBlock {
    /// Bundle the block records.
    pub bundle_id: String,
    /// Committed height (from the replication header).
    pub block_height: u64,
    /// Commit timestamp (from the replication header).
    pub timestamp: DateTime<Utc>,
    /// Committing validator (from the replication header).
    pub validator_id: String,
    /// Operation commitment.
    pub operation_commitment: String,
    /// Batch Merkle root.
    pub merkle_root: Hash32,
    /// Synthetic source-ledger transactions.
    pub synthetic_transactions: Vec<serde_json::Value>,
    /// Governance evidence.
    pub governance_proof: BlockGovernance,
    /// Cross-chain proof payload.
    pub cross_chain_proof: serde_json::Value,
    /// Execution stage.
    pub stage: String,
    /// Validated proof class.
    pub proof_class: AnchorClass,
    /// Source-ledger anchor reference.
    pub accumulate_anchor_reference: Option<String>,
}

impl ValidatorBlock {
    /// Consensus-entry state derived from the governance level:
    /// `collecting → quorum_met → completed`.
    pub fn derived_state(&self) -> &'static str {
        match self.governance_proof.level() {
            0 => "collecting",
            1 => "quorum_met",
            _ => "completed",
        }
    }
}
