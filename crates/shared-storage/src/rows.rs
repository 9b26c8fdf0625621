//! Row types mirroring the authoritative schema.
//!
//! Hash and signature columns are BYTEA (`Vec<u8>`), JSON columns JSONB
//! (`serde_json::Value`, never NULL where declared NOT NULL; use `[]`, `{}` or `null` literals),
//! time columns TIMESTAMPTZ (`DateTime<Utc>`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `proof_artifacts`: one row per materialized proof cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofArtifactRow {
    /// Artifact identifier.
    pub artifact_id: String,
    /// Proof the artifact belongs to.
    pub proof_id: String,
    /// Operation id (32 bytes).
    pub operation_id: Vec<u8>,
    /// Source-ledger transaction reference.
    pub tx_ref: String,
    /// Target chain name.
    pub target_chain: String,
    /// Artifact hash over the canonical components (32 bytes).
    pub artifact_hash: Vec<u8>,
    /// Component presence flags.
    pub includes_merkle_inclusion: bool,
    /// Anchor reference component present.
    pub includes_anchor_reference: bool,
    /// Chained proof component present.
    pub includes_chained_proof: bool,
    /// Governance proof component present.
    pub includes_governance_proof: bool,
    /// Attestations present.
    pub includes_attestations: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// `proof_bundles`: the gzipped bundle JSON with its own hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofBundleRow {
    /// Bundle identifier.
    pub bundle_id: String,
    /// Artifact the bundle materializes.
    pub artifact_id: String,
    /// Bundle schema version.
    pub schema_version: String,
    /// Gzipped bundle JSON.
    pub bundle_gzip: Vec<u8>,
    /// SHA-256 of the gzipped payload.
    pub bundle_sha256: Vec<u8>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// `anchor_references`: the external anchor component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorReferenceRow {
    /// Row identifier.
    pub id: String,
    /// Artifact the row belongs to.
    pub artifact_id: String,
    /// Anchor transaction hash.
    pub tx_hash: String,
    /// Anchor block number.
    pub block_number: i64,
    /// Anchor block hash.
    pub block_hash: String,
    /// Numeric chain id.
    pub chain_id: i64,
    /// Target chain name.
    pub target_chain: String,
    /// Confirmations at bundling time.
    pub confirmations: i64,
    /// Whether the anchor reached finality.
    pub finalized: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// `chained_proof_layers`: one row per L-level, or a failure row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainedProofLayerRow {
    /// Row identifier.
    pub id: String,
    /// Artifact the row belongs to.
    pub artifact_id: String,
    /// Layer number (1-3).
    pub layer: i16,
    /// Layer start hash (32 bytes; empty on failure rows).
    pub start_hash: Vec<u8>,
    /// Layer anchor hash (32 bytes; empty on failure rows).
    pub anchor_hash: Vec<u8>,
    /// Receipt entries as JSONB (`[]` when absent).
    pub entries: serde_json::Value,
    /// Whether layer construction failed.
    pub failed: bool,
    /// Failure reason, if failed.
    pub failure_reason: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// `governance_proof_levels`: up to three rows (G0/G1/G2) per artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceProofLevelRow {
    /// Row identifier.
    pub id: String,
    /// Artifact the row belongs to.
    pub artifact_id: String,
    /// Governance level (0-2).
    pub level: i16,
    /// Whether the underlying anchor is finalized.
    pub anchor_finalized: bool,
    /// Key page URL (G1+).
    pub key_page_url: Option<String>,
    /// Key page version (G1+).
    pub key_page_version: Option<i64>,
    /// Signer entries as JSONB (`[]` when absent).
    pub signers: serde_json::Value,
    /// Required threshold weight.
    pub required_threshold: i64,
    /// Accumulated signer weight.
    pub achieved_weight: i64,
    /// Outcome binding as JSONB (`null` below G2).
    pub outcome: serde_json::Value,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// `validator_attestations`: attestations stored with their bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorAttestationRow {
    /// Row identifier.
    pub id: String,
    /// Artifact the row belongs to.
    pub artifact_id: String,
    /// Attesting validator.
    pub validator_id: String,
    /// Public key bytes.
    pub public_key: Vec<u8>,
    /// Signature bytes.
    pub signature: Vec<u8>,
    /// Signed hash (32 bytes).
    pub signed_hash: Vec<u8>,
    /// Scheme identifier.
    pub scheme: String,
    /// Voting weight.
    pub weight: i64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// `verification_history`: one entry per materialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationHistoryRow {
    /// Row identifier.
    pub id: String,
    /// Artifact the row belongs to.
    pub artifact_id: String,
    /// Proof the row belongs to.
    pub proof_id: String,
    /// Outcome (`verified`, `failed`).
    pub outcome: String,
    /// Phase the cycle failed at, if failed.
    pub fail_phase: Option<i16>,
    /// Structured details as JSONB (`{}` when empty).
    pub details: serde_json::Value,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// `unified_attestations`: per-cycle individual attestations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedAttestationRow {
    /// Row identifier.
    pub id: String,
    /// Cycle the attestation was collected in.
    pub cycle_id: String,
    /// Attesting validator.
    pub validator_id: String,
    /// Message hash (32 bytes).
    pub message_hash: Vec<u8>,
    /// Public key bytes.
    pub public_key: Vec<u8>,
    /// Signature bytes.
    pub signature: Vec<u8>,
    /// Scheme identifier.
    pub scheme: String,
    /// Voting weight.
    pub weight: i64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// `aggregated_attestations`: one aggregate per cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedAttestationRow {
    /// Row identifier.
    pub id: String,
    /// Cycle the aggregate was assembled in.
    pub cycle_id: String,
    /// Message hash (32 bytes).
    pub message_hash: Vec<u8>,
    /// Scheme identifier.
    pub scheme: String,
    /// BLS aggregate signature (empty under Ed25519).
    pub aggregate_signature: Vec<u8>,
    /// BLS aggregate public key (empty under Ed25519).
    pub aggregate_public_key: Vec<u8>,
    /// Ed25519 signature entries as JSONB (`[]` under BLS).
    pub signatures: serde_json::Value,
    /// Participation bitfield bytes.
    pub participants: Vec<u8>,
    /// Participant ids as JSONB array.
    pub participant_ids: serde_json::Value,
    /// Accumulated weight.
    pub achieved_weight: i64,
    /// Required weight.
    pub required_weight: i64,
    /// Whether the threshold was met.
    pub threshold_met: bool,
    /// Whether the aggregate cryptographically verified.
    pub verified: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// `chain_execution_results`: one row per phase-7 observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainExecutionResultRow {
    /// Row identifier.
    pub id: String,
    /// Cycle the observation belongs to.
    pub cycle_id: String,
    /// Proof the observation belongs to.
    pub proof_id: String,
    /// Observed transaction hash.
    pub tx_hash: String,
    /// Target chain name.
    pub target_chain: String,
    /// Workflow step (observation is step 1).
    pub workflow_step: i32,
    /// Block number of inclusion.
    pub block_number: i64,
    /// Confirmations at observation time.
    pub confirmations: i64,
    /// Whether the transaction executed successfully.
    pub success: bool,
    /// Full observation as JSONB (`{}` when empty).
    pub observation: serde_json::Value,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// `consensus_entries`: one row per bundle per committed block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusEntryRow {
    /// Row identifier.
    pub id: String,
    /// Bundle the entry records.
    pub bundle_id: String,
    /// Committed block height.
    pub block_height: i64,
    /// Operation commitment.
    pub operation_commitment: String,
    /// Governance level at commit.
    pub governance_level: i16,
    /// Derived state (`collecting`, `quorum_met`, `completed`).
    pub state: String,
    /// Proof class (`on_demand`, `on_cadence`).
    pub proof_class: String,
    /// Validator that committed the entry.
    pub validator_id: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// `batch_attestations`: replication-derived quorum rows per batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchAttestationRow {
    /// Row identifier.
    pub id: String,
    /// Batch the attestation covers.
    pub batch_id: String,
    /// Block height the quorum was reached at.
    pub block_height: i64,
    /// Attesting validator.
    pub validator_id: String,
    /// BLS aggregate signature bytes.
    pub aggregate_signature: Vec<u8>,
    /// How the quorum was reached (`replication`).
    pub quorum_source: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// `custody_chain_events`: persisted custody journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustodyEventRow {
    /// Row identifier.
    pub id: String,
    /// Proof the event belongs to.
    pub proof_id: String,
    /// Position in the proof's chain.
    pub sequence: i64,
    /// Event type.
    pub event_type: String,
    /// Structured details as JSONB.
    pub details: serde_json::Value,
    /// Previous event hash (32 bytes, zero for the first).
    pub previous_hash: Vec<u8>,
    /// This event's hash (32 bytes).
    pub current_hash: Vec<u8>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// `audit_trail`: persisted per-user audit entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditTrailRow {
    /// Row identifier.
    pub id: String,
    /// End user the entry belongs to.
    pub user_id: String,
    /// Intent the entry concerns.
    pub intent_id: String,
    /// Position in the user's trail.
    pub sequence: i64,
    /// What happened.
    pub action: String,
    /// Structured details as JSONB.
    pub details: serde_json::Value,
    /// Previous entry hash (32 bytes, zero for the first).
    pub previous_hash: Vec<u8>,
    /// This entry's hash (32 bytes).
    pub current_hash: Vec<u8>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Consensus (ABCI) state persisted so the process can resume exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbciState {
    /// Last committed block height.
    pub last_block_height: i64,
    /// Application hash after the last commit (32 bytes).
    pub last_block_app_hash: Vec<u8>,
}
