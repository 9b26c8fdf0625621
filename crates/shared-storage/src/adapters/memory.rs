//! In-memory adapter.
//!
//! Backs unit and integration tests; implements every port behind one
//! mutex-guarded state block.

use crate::error::{StorageError, StorageResult};
use crate::ports::*;
use crate::rows::*;
use async_trait::async_trait;
use parking_lot::Mutex;

#[derive(Default)]
struct MemoryState {
    artifacts: Vec<ProofArtifactRow>,
    bundles: Vec<ProofBundleRow>,
    anchor_references: Vec<AnchorReferenceRow>,
    chained_proof_layers: Vec<ChainedProofLayerRow>,
    governance_levels: Vec<GovernanceProofLevelRow>,
    validator_attestations: Vec<ValidatorAttestationRow>,
    verification_history: Vec<VerificationHistoryRow>,
    unified_attestations: Vec<UnifiedAttestationRow>,
    aggregated_attestations: Vec<AggregatedAttestationRow>,
    batch_attestations: Vec<BatchAttestationRow>,
    execution_results: Vec<ChainExecutionResultRow>,
    consensus_entries: Vec<ConsensusEntryRow>,
    custody_events: Vec<CustodyEventRow>,
    audit_entries: Vec<AuditTrailRow>,
    abci_state: Option<AbciState>,
}

/// In-memory implementation of every storage port.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProofStore for MemoryStore {
    async fn insert_artifact(&self, row: ProofArtifactRow) -> StorageResult<()> {
        let mut state = self.state.lock();
        if state.artifacts.iter().any(|a| a.artifact_id == row.artifact_id) {
            return Err(StorageError::Constraint(format!(
                "artifact {} already exists",
                row.artifact_id
            )));
        }
        state.artifacts.push(row);
        Ok(())
    }

    async fn insert_bundle(&self, row: ProofBundleRow) -> StorageResult<()> {
        self.state.lock().bundles.push(row);
        Ok(())
    }

    async fn insert_anchor_reference(&self, row: AnchorReferenceRow) -> StorageResult<()> {
        self.state.lock().anchor_references.push(row);
        Ok(())
    }

    async fn insert_chained_proof_layer(&self, row: ChainedProofLayerRow) -> StorageResult<()> {
        self.state.lock().chained_proof_layers.push(row);
        Ok(())
    }

    async fn insert_governance_level(&self, row: GovernanceProofLevelRow) -> StorageResult<()> {
        self.state.lock().governance_levels.push(row);
        Ok(())
    }

    async fn insert_validator_attestation(
        &self,
        row: ValidatorAttestationRow,
    ) -> StorageResult<()> {
        self.state.lock().validator_attestations.push(row);
        Ok(())
    }

    async fn insert_verification_history(
        &self,
        row: VerificationHistoryRow,
    ) -> StorageResult<()> {
        self.state.lock().verification_history.push(row);
        Ok(())
    }

    async fn artifact(&self, artifact_id: &str) -> StorageResult<Option<ProofArtifactRow>> {
        Ok(self
            .state
            .lock()
            .artifacts
            .iter()
            .find(|a| a.artifact_id == artifact_id)
            .cloned())
    }

    async fn bundle(&self, bundle_id: &str) -> StorageResult<Option<ProofBundleRow>> {
        Ok(self
            .state
            .lock()
            .bundles
            .iter()
            .find(|b| b.bundle_id == bundle_id)
            .cloned())
    }

    async fn chained_proof_layers(
        &self,
        artifact_id: &str,
    ) -> StorageResult<Vec<ChainedProofLayerRow>> {
        let mut layers: Vec<ChainedProofLayerRow> = self
            .state
            .lock()
            .chained_proof_layers
            .iter()
            .filter(|l| l.artifact_id == artifact_id)
            .cloned()
            .collect();
        layers.sort_by_key(|l| l.layer);
        Ok(layers)
    }
}

#[async_trait]
impl AttestationStore for MemoryStore {
    async fn insert_unified_attestation(&self, row: UnifiedAttestationRow) -> StorageResult<()> {
        self.state.lock().unified_attestations.push(row);
        Ok(())
    }

    async fn insert_aggregated_attestation(
        &self,
        row: AggregatedAttestationRow,
    ) -> StorageResult<()> {
        self.state.lock().aggregated_attestations.push(row);
        Ok(())
    }

    async fn insert_batch_attestation(&self, row: BatchAttestationRow) -> StorageResult<()> {
        self.state.lock().batch_attestations.push(row);
        Ok(())
    }

    async fn unified_for_cycle(
        &self,
        cycle_id: &str,
    ) -> StorageResult<Vec<UnifiedAttestationRow>> {
        Ok(self
            .state
            .lock()
            .unified_attestations
            .iter()
            .filter(|a| a.cycle_id == cycle_id)
            .cloned()
            .collect())
    }

    async fn aggregated_for_cycle(
        &self,
        cycle_id: &str,
    ) -> StorageResult<Option<AggregatedAttestationRow>> {
        Ok(self
            .state
            .lock()
            .aggregated_attestations
            .iter()
            .find(|a| a.cycle_id == cycle_id)
            .cloned())
    }
}

#[async_trait]
impl ExecutionStore for MemoryStore {
    async fn insert_execution_result(&self, row: ChainExecutionResultRow) -> StorageResult<()> {
        self.state.lock().execution_results.push(row);
        Ok(())
    }

    async fn results_for_cycle(
        &self,
        cycle_id: &str,
    ) -> StorageResult<Vec<ChainExecutionResultRow>> {
        Ok(self
            .state
            .lock()
            .execution_results
            .iter()
            .filter(|r| r.cycle_id == cycle_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ConsensusStore for MemoryStore {
    async fn insert_consensus_entry(&self, row: ConsensusEntryRow) -> StorageResult<bool> {
        let mut state = self.state.lock();
        let duplicate = state
            .consensus_entries
            .iter()
            .any(|e| e.bundle_id == row.bundle_id && e.block_height == row.block_height);
        if duplicate {
            return Ok(false);
        }
        state.consensus_entries.push(row);
        Ok(true)
    }

    async fn entries_for_bundle(&self, bundle_id: &str) -> StorageResult<Vec<ConsensusEntryRow>> {
        Ok(self
            .state
            .lock()
            .consensus_entries
            .iter()
            .filter(|e| e.bundle_id == bundle_id)
            .cloned()
            .collect())
    }

    async fn save_abci_state(&self, state: AbciState) -> StorageResult<()> {
        self.state.lock().abci_state = Some(state);
        Ok(())
    }

    async fn load_abci_state(&self) -> StorageResult<Option<AbciState>> {
        Ok(self.state.lock().abci_state.clone())
    }
}

#[async_trait]
impl JournalStore for MemoryStore {
    async fn append_custody_event(&self, row: CustodyEventRow) -> StorageResult<()> {
        self.state.lock().custody_events.push(row);
        Ok(())
    }

    async fn custody_events(&self, proof_id: &str) -> StorageResult<Vec<CustodyEventRow>> {
        let mut events: Vec<CustodyEventRow> = self
            .state
            .lock()
            .custody_events
            .iter()
            .filter(|e| e.proof_id == proof_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.sequence);
        Ok(events)
    }

    async fn append_audit_entry(&self, row: AuditTrailRow) -> StorageResult<()> {
        self.state.lock().audit_entries.push(row);
        Ok(())
    }

    async fn audit_entries(&self, user_id: &str) -> StorageResult<Vec<AuditTrailRow>> {
        let mut entries: Vec<AuditTrailRow> = self
            .state
            .lock()
            .audit_entries
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.sequence);
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn artifact_ids_are_unique() {
        let store = MemoryStore::new();
        let row = ProofArtifactRow {
            artifact_id: "a1".into(),
            proof_id: "P1".into(),
            operation_id: vec![0u8; 32],
            tx_ref: "acc://demo@0xaaa".into(),
            target_chain: "ethereum".into(),
            artifact_hash: vec![1u8; 32],
            includes_merkle_inclusion: true,
            includes_anchor_reference: true,
            includes_chained_proof: true,
            includes_governance_proof: false,
            includes_attestations: true,
            created_at: Utc::now(),
        };
        store.insert_artifact(row.clone()).await.unwrap();
        assert!(store.insert_artifact(row).await.is_err());
        assert!(store.artifact("a1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn consensus_entries_are_idempotent_per_height() {
        let store = MemoryStore::new();
        let row = ConsensusEntryRow {
            id: "c1".into(),
            bundle_id: "b1".into(),
            block_height: 5,
            operation_commitment: "commit".into(),
            governance_level: 1,
            state: "quorum_met".into(),
            proof_class: "on_demand".into(),
            validator_id: "v1".into(),
            created_at: Utc::now(),
        };
        assert!(store.insert_consensus_entry(row.clone()).await.unwrap());
        let mut dup = row.clone();
        dup.id = "c2".into();
        assert!(!store.insert_consensus_entry(dup).await.unwrap());
        assert_eq!(store.entries_for_bundle("b1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn abci_state_round_trips() {
        let store = MemoryStore::new();
        assert!(store.load_abci_state().await.unwrap().is_none());
        store
            .save_abci_state(AbciState {
                last_block_height: 42,
                last_block_app_hash: vec![7u8; 32],
            })
            .await
            .unwrap();
        let state = store.load_abci_state().await.unwrap().unwrap();
        assert_eq!(state.last_block_height, 42);
    }

    #[tokio::test]
    async fn journals_sort_by_sequence() {
        let store = MemoryStore::new();
        for sequence in [1i64, 0, 2] {
            store
                .append_custody_event(CustodyEventRow {
                    id: format!("e{sequence}"),
                    proof_id: "P1".into(),
                    sequence,
                    event_type: "state_transition".into(),
                    details: serde_json::json!({}),
                    previous_hash: vec![0u8; 32],
                    current_hash: vec![1u8; 32],
                    created_at: Utc::now(),
                })
                .await
                .unwrap();
        }
        let events = store.custody_events("P1").await.unwrap();
        let sequences: Vec<i64> = events.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2]);
    }
}
