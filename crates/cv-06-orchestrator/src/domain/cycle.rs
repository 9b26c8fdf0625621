//! Cycle request and outcome.

use cv_04_attestation::AggregatedAttestation;
use serde::{Deserialize, Serialize};
use shared_types::{AnchorResult, Batch, Hash32};

/// The intent a cycle proves, as witnessed on the source ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentRef {
    /// Source-ledger transaction hash.
    pub tx_hash: String,
    /// Source-ledger account URL.
    pub account_url: String,
    /// Source-ledger block the intent was recorded in.
    pub block_number: u64,
    /// Ledger timestamp (unix seconds).
    pub timestamp: i64,
    /// End user owning the intent, for the audit trail.
    pub user_id: String,
}

/// Everything a cycle needs to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleRequest {
    /// The sealed batch being proven.
    pub batch: Batch,
    /// Anchor submission the cycle observes to finality.
    pub anchor: AnchorResult,
    /// The intent being proven (the batch's primary member).
    pub intent: IntentRef,
}

/// What a completed cycle produced.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutcome {
    /// Cycle identifier.
    pub cycle_id: String,
    /// Proof identifier minted for this cycle.
    pub proof_id: String,
    /// Deterministic operation id of the intent.
    pub operation_id: Hash32,
    /// Bundle identifier.
    pub bundle_id: String,
    /// Artifact hash over the bundle components.
    pub artifact_hash: Hash32,
    /// Anchor transaction hash, as finalized on the external chain.
    pub anchor_tx_hash: String,
    /// Block number the anchor finalized in.
    pub anchor_block_number: u64,
    /// The aggregate assembled in phase 8.
    pub aggregated: AggregatedAttestation,
    /// Write-back transaction hash, when phase 9 ran.
    pub write_back_tx: Option<String>,
}
