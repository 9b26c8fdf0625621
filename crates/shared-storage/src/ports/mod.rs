//! Persistence ports, grouped by concern.

use crate::error::StorageResult;
use crate::rows::*;
use async_trait::async_trait;

/// Proof materialization tables: artifacts, bundles and component rows.
#[async_trait]
pub trait ProofStore: Send + Sync {
    /// Insert a `proof_artifacts` row.
    async fn insert_artifact(&self, row: ProofArtifactRow) -> StorageResult<()>;

    /// Insert a `proof_bundles` row.
    async fn insert_bundle(&self, row: ProofBundleRow) -> StorageResult<()>;

    /// Insert an `anchor_references` row.
    async fn insert_anchor_reference(&self, row: AnchorReferenceRow) -> StorageResult<()>;

    /// Insert a `chained_proof_layers` row.
    async fn insert_chained_proof_layer(&self, row: ChainedProofLayerRow) -> StorageResult<()>;

    /// Insert a `governance_proof_levels` row.
    async fn insert_governance_level(&self, row: GovernanceProofLevelRow) -> StorageResult<()>;

    /// Insert a `validator_attestations` row.
    async fn insert_validator_attestation(&self, row: ValidatorAttestationRow)
        -> StorageResult<()>;

    /// Insert a `verification_history` row.
    async fn insert_verification_history(&self, row: VerificationHistoryRow)
        -> StorageResult<()>;

    /// Fetch an artifact by id.
    async fn artifact(&self, artifact_id: &str) -> StorageResult<Option<ProofArtifactRow>>;

    /// Fetch a bundle by id.
    async fn bundle(&self, bundle_id: &str) -> StorageResult<Option<ProofBundleRow>>;

    /// Chained-proof layer rows of an artifact, by layer.
    async fn chained_proof_layers(
        &self,
        artifact_id: &str,
    ) -> StorageResult<Vec<ChainedProofLayerRow>>;
}

/// Attestation tables.
#[async_trait]
pub trait AttestationStore: Send + Sync {
    /// Insert a `unified_attestations` row.
    async fn insert_unified_attestation(&self, row: UnifiedAttestationRow) -> StorageResult<()>;

    /// Insert an `aggregated_attestations` row.
    async fn insert_aggregated_attestation(
        &self,
        row: AggregatedAttestationRow,
    ) -> StorageResult<()>;

    /// Insert a `batch_attestations` row.
    async fn insert_batch_attestation(&self, row: BatchAttestationRow) -> StorageResult<()>;

    /// Individual attestations collected in a cycle.
    async fn unified_for_cycle(&self, cycle_id: &str) -> StorageResult<Vec<UnifiedAttestationRow>>;

    /// The aggregate assembled in a cycle, if any.
    async fn aggregated_for_cycle(
        &self,
        cycle_id: &str,
    ) -> StorageResult<Option<AggregatedAttestationRow>>;
}

/// Phase-7 observation results.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Insert a `chain_execution_results` row.
    async fn insert_execution_result(&self, row: ChainExecutionResultRow) -> StorageResult<()>;

    /// Observations recorded in a cycle.
    async fn results_for_cycle(&self, cycle_id: &str)
        -> StorageResult<Vec<ChainExecutionResultRow>>;
}

/// Consensus log and durable ABCI state.
#[async_trait]
pub trait ConsensusStore: Send + Sync {
    /// Insert a `consensus_entries` row. Idempotent on
    /// `(bundle_id, block_height)`: a duplicate commit inserts nothing and
    /// reports `false`.
    async fn insert_consensus_entry(&self, row: ConsensusEntryRow) -> StorageResult<bool>;

    /// Consensus entries for a bundle.
    async fn entries_for_bundle(&self, bundle_id: &str) -> StorageResult<Vec<ConsensusEntryRow>>;

    /// Persist the ABCI state.
    async fn save_abci_state(&self, state: AbciState) -> StorageResult<()>;

    /// Load the persisted ABCI state.
    async fn load_abci_state(&self) -> StorageResult<Option<AbciState>>;
}

/// Everything a full validator node needs from its store.
pub trait ValidatorStore:
    ProofStore + AttestationStore + ExecutionStore + ConsensusStore + JournalStore
{
}

impl<T> ValidatorStore for T where
    T: ProofStore + AttestationStore + ExecutionStore + ConsensusStore + JournalStore
{
}

/// Custody and audit journals. Append-only: rows are never updated in place.
#[async_trait]
pub trait JournalStore: Send + Sync {
    /// Append a `custody_chain_events` row.
    async fn append_custody_event(&self, row: CustodyEventRow) -> StorageResult<()>;

    /// Custody events of a proof, in sequence order.
    async fn custody_events(&self, proof_id: &str) -> StorageResult<Vec<CustodyEventRow>>;

    /// Append an `audit_trail` row.
    async fn append_audit_entry(&self, row: AuditTrailRow) -> StorageResult<()>;

    /// Audit entries of a user, in sequence order.
    async fn audit_entries(&self, user_id: &str) -> StorageResult<Vec<AuditTrailRow>>;
}
