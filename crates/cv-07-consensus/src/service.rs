//! The consensus service: commit, persistence, recovery.

use crate::domain::{CommitResult, ConsensusState, ReplicationHeader, ValidatorBlock};
use crate::error::{ConsensusError, ConsensusResult};
use crate::validation::validate_block;
use chrono::Utc;
use cv_04_attestation::AttestationStrategy;
use parking_lot::Mutex;
use shared_storage::{
    AbciState, AttestationStore, BatchAttestationRow, ConsensusEntryRow, ConsensusStore,
};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Processes validator blocks over the replication layer.
///
/// All state mutation funnels through the single `state` writer.
pub struct ConsensusService<S> {
    store: Arc<S>,
    attestation: Arc<dyn AttestationStrategy>,
    validator_id: String,
    state: Mutex<ConsensusState>,
}

impl<S> ConsensusService<S>
where
    S: ConsensusStore + AttestationStore,
{
    /// Create a service for a validator.
    pub fn new(
        store: Arc<S>,
        attestation: Arc<dyn AttestationStrategy>,
        validator_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            attestation,
            validator_id: validator_id.into(),
            state: Mutex::new(ConsensusState::new()),
        }
    }

    /// Current committed height.
    pub fn height(&self) -> u64 {
        self.state.lock().height
    }

    /// Current application hash.
    pub fn app_hash(&self) -> shared_types::Hash32 {
        self.state.lock().app_hash
    }

    /// Load persisted ABCI state and fast-forward the in-memory view.
    ///
    /// The application is authoritative after recovery; replication-layer
    /// height disagreements are logged and resolved in the application's
    /// favor.
    pub async fn recover(&self) -> ConsensusResult<()> {
        let Some(persisted) = self.store.load_abci_state().await? else {
            info!("no persisted consensus state, starting at height 0");
            return Ok(());
        };
        let mut state = self.state.lock();
        let persisted_height = persisted.last_block_height as u64;
        if state.height < persisted_height {
            let app_hash = shared_types::Hash32::from_slice(&persisted.last_block_app_hash)
                .unwrap_or(shared_types::Hash32::ZERO);
            info!(
                from = state.height,
                to = persisted_height,
                "fast-forwarding consensus state"
            );
            state.fast_forward(persisted_height, app_hash);
        } else if state.height > persisted_height {
            warn!(
                in_memory = state.height,
                persisted = persisted_height,
                "persisted consensus state lags in-memory height; application is authoritative"
            );
        }
        Ok(())
    }

    /// Validate and commit a proposed block.
    pub async fn process_block(
        &self,
        raw_json: &[u8],
        header: &ReplicationHeader,
    ) -> ConsensusResult<CommitResult> {
        let block = match validate_block(raw_json, header) {
            Ok(block) => block,
            Err(e) => {
                if let ConsensusError::Rejected { code, reason } = &e {
                    warn!(code, "{}", reason);
                }
                return Err(e);
            }
        };
        self.commit(block).await
    }

    async fn commit(&self, block: ValidatorBlock) -> ConsensusResult<CommitResult> {
        // Snapshot under the writer lock, then persist outside it.
        let (height, app_hash, replay) = {
            let mut state = self.state.lock();
            let replay = block.block_height <= state.height && state.height > 0;
            if !replay {
                state.height = block.block_height;
                state.fold_bundle(&block.bundle_id);
                state.cache_block(block.clone());
            }
            (state.height, state.app_hash, replay)
        };

        if replay {
            // Replays must not produce a second consensus entry; the
            // idempotent insert below guarantees it even on races.
            info!(
                bundle_id = %block.bundle_id,
                height = block.block_height,
                "replayed block at or below committed height"
            );
        }

        let entry_inserted = self
            .store
            .insert_consensus_entry(ConsensusEntryRow {
                id: Uuid::new_v4().to_string(),
                bundle_id: block.bundle_id.clone(),
                block_height: block.block_height as i64,
                operation_commitment: block.operation_commitment.clone(),
                governance_level: block.governance_proof.level() as i16,
                state: block.derived_state().to_string(),
                proof_class: block.proof_class.as_str().to_string(),
                validator_id: block.validator_id.clone(),
                created_at: Utc::now(),
            })
            .await?;

        if entry_inserted && !replay {
            self.store
                .save_abci_state(AbciState {
                    last_block_height: height as i64,
                    last_block_app_hash: app_hash.as_bytes().to_vec(),
                })
                .await?;

            // Self-attestation over the operation commitment, recorded as the
            // batch's replication-derived quorum evidence.
            let attestation = self
                .attestation
                .sign(block.operation_commitment.as_bytes())?;
            self.store
                .insert_batch_attestation(BatchAttestationRow {
                    id: Uuid::new_v4().to_string(),
                    batch_id: block.bundle_id.clone(),
                    block_height: block.block_height as i64,
                    validator_id: self.validator_id.clone(),
                    aggregate_signature: attestation.signature,
                    quorum_source: "replication".to_string(),
                    created_at: Utc::now(),
                })
                .await?;

            info!(
                bundle_id = %block.bundle_id,
                height,
                app_hash = %app_hash,
                state = block.derived_state(),
                "validator block committed"
            );
        }

        Ok(CommitResult {
            height,
            app_hash,
            entry_inserted,
        })
    }
}
