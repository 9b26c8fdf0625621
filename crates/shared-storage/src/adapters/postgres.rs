//! Postgres adapter.
//!
//! Runtime-checked sqlx queries over the authoritative schema; see
//! `migrations` for the DDL.

use crate::error::{StorageError, StorageResult};
use crate::ports::*;
use crate::rows::*;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

/// Postgres implementation of every storage port.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect and apply migrations.
    pub async fn connect(database_url: &str, max_connections: u32) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        crate::migrations::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool (migrations are the caller's concern).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn artifact_from_row(row: &sqlx::postgres::PgRow) -> StorageResult<ProofArtifactRow> {
    Ok(ProofArtifactRow {
        artifact_id: row.try_get("artifact_id")?,
        proof_id: row.try_get("proof_id")?,
        operation_id: row.try_get("operation_id")?,
        tx_ref: row.try_get("tx_ref")?,
        target_chain: row.try_get("target_chain")?,
        artifact_hash: row.try_get("artifact_hash")?,
        includes_merkle_inclusion: row.try_get("includes_merkle_inclusion")?,
        includes_anchor_reference: row.try_get("includes_anchor_reference")?,
        includes_chained_proof: row.try_get("includes_chained_proof")?,
        includes_governance_proof: row.try_get("includes_governance_proof")?,
        includes_attestations: row.try_get("includes_attestations")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl ProofStore for PostgresStore {
    async fn insert_artifact(&self, row: ProofArtifactRow) -> StorageResult<()> {
        sqlx::query(
            r#"INSERT INTO proof_artifacts
               (artifact_id, proof_id, operation_id, tx_ref, target_chain, artifact_hash,
                includes_merkle_inclusion, includes_anchor_reference, includes_chained_proof,
                includes_governance_proof, includes_attestations, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"#,
        )
        .bind(&row.artifact_id)
        .bind(&row.proof_id)
        .bind(&row.operation_id)
        .bind(&row.tx_ref)
        .bind(&row.target_chain)
        .bind(&row.artifact_hash)
        .bind(row.includes_merkle_inclusion)
        .bind(row.includes_anchor_reference)
        .bind(row.includes_chained_proof)
        .bind(row.includes_governance_proof)
        .bind(row.includes_attestations)
        .bind(row.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                StorageError::Constraint(format!("artifact {} already exists", row.artifact_id))
            }
            other => other.into(),
        })?;
        Ok(())
    }

    async fn insert_bundle(&self, row: ProofBundleRow) -> StorageResult<()> {
        sqlx::query(
            r#"INSERT INTO proof_bundles
               (bundle_id, artifact_id, schema_version, bundle_gzip, bundle_sha256, created_at)
               VALUES ($1, $2, $3, $4, $5, $6)"#,
        )
        .bind(&row.bundle_id)
        .bind(&row.artifact_id)
        .bind(&row.schema_version)
        .bind(&row.bundle_gzip)
        .bind(&row.bundle_sha256)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_anchor_reference(&self, row: AnchorReferenceRow) -> StorageResult<()> {
        sqlx::query(
            r#"INSERT INTO anchor_references
               (id, artifact_id, tx_hash, block_number, block_hash, chain_id, target_chain,
                confirmations, finalized, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"#,
        )
        .bind(&row.id)
        .bind(&row.artifact_id)
        .bind(&row.tx_hash)
        .bind(row.block_number)
        .bind(&row.block_hash)
        .bind(row.chain_id)
        .bind(&row.target_chain)
        .bind(row.confirmations)
        .bind(row.finalized)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_chained_proof_layer(&self, row: ChainedProofLayerRow) -> StorageResult<()> {
        sqlx::query(
            r#"INSERT INTO chained_proof_layers
               (id, artifact_id, layer, start_hash, anchor_hash, entries, failed,
                failure_reason, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"#,
        )
        .bind(&row.id)
        .bind(&row.artifact_id)
        .bind(row.layer)
        .bind(&row.start_hash)
        .bind(&row.anchor_hash)
        .bind(&row.entries)
        .bind(row.failed)
        .bind(&row.failure_reason)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_governance_level(&self, row: GovernanceProofLevelRow) -> StorageResult<()> {
        sqlx::query(
            r#"INSERT INTO governance_proof_levels
               (id, artifact_id, level, anchor_finalized, key_page_url, key_page_version,
                signers, required_threshold, achieved_weight, outcome, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"#,
        )
        .bind(&row.id)
        .bind(&row.artifact_id)
        .bind(row.level)
        .bind(row.anchor_finalized)
        .bind(&row.key_page_url)
        .bind(row.key_page_version)
        .bind(&row.signers)
        .bind(row.required_threshold)
        .bind(row.achieved_weight)
        .bind(&row.outcome)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_validator_attestation(
        &self,
        row: ValidatorAttestationRow,
    ) -> StorageResult<()> {
        sqlx::query(
            r#"INSERT INTO validator_attestations
               (id, artifact_id, validator_id, public_key, signature, signed_hash, scheme,
                weight, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"#,
        )
        .bind(&row.id)
        .bind(&row.artifact_id)
        .bind(&row.validator_id)
        .bind(&row.public_key)
        .bind(&row.signature)
        .bind(&row.signed_hash)
        .bind(&row.scheme)
        .bind(row.weight)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_verification_history(
        &self,
        row: VerificationHistoryRow,
    ) -> StorageResult<()> {
        sqlx::query(
            r#"INSERT INTO verification_history
               (id, artifact_id, proof_id, outcome, fail_phase, details, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
        )
        .bind(&row.id)
        .bind(&row.artifact_id)
        .bind(&row.proof_id)
        .bind(&row.outcome)
        .bind(row.fail_phase)
        .bind(&row.details)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn artifact(&self, artifact_id: &str) -> StorageResult<Option<ProofArtifactRow>> {
        let row = sqlx::query("SELECT * FROM proof_artifacts WHERE artifact_id = $1")
            .bind(artifact_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(artifact_from_row).transpose()
    }

    async fn bundle(&self, bundle_id: &str) -> StorageResult<Option<ProofBundleRow>> {
        let row = sqlx::query("SELECT * FROM proof_bundles WHERE bundle_id = $1")
            .bind(bundle_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| {
            Ok(ProofBundleRow {
                bundle_id: r.try_get("bundle_id")?,
                artifact_id: r.try_get("artifact_id")?,
                schema_version: r.try_get("schema_version")?,
                bundle_gzip: r.try_get("bundle_gzip")?,
                bundle_sha256: r.try_get("bundle_sha256")?,
                created_at: r.try_get("created_at")?,
            })
        })
        .transpose()
    }

    async fn chained_proof_layers(
        &self,
        artifact_id: &str,
    ) -> StorageResult<Vec<ChainedProofLayerRow>> {
        let rows =
            sqlx::query("SELECT * FROM chained_proof_layers WHERE artifact_id = $1 ORDER BY layer")
                .bind(artifact_id)
                .fetch_all(&self.pool)
                .await?;
        rows.iter()
            .map(|r| {
                Ok(ChainedProofLayerRow {
                    id: r.try_get("id")?,
                    artifact_id: r.try_get("artifact_id")?,
                    layer: r.try_get("layer")?,
                    start_hash: r.try_get("start_hash")?,
                    anchor_hash: r.try_get("anchor_hash")?,
                    entries: r.try_get("entries")?,
                    failed: r.try_get("failed")?,
                    failure_reason: r.try_get("failure_reason")?,
                    created_at: r.try_get("created_at")?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl AttestationStore for PostgresStore {
    async fn insert_unified_attestation(&self, row: UnifiedAttestationRow) -> StorageResult<()> {
        sqlx::query(
            r#"INSERT INTO unified_attestations
               (id, cycle_id, validator_id, message_hash, public_key, signature, scheme,
                weight, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"#,
        )
        .bind(&row.id)
        .bind(&row.cycle_id)
        .bind(&row.validator_id)
        .bind(&row.message_hash)
        .bind(&row.public_key)
        .bind(&row.signature)
        .bind(&row.scheme)
        .bind(row.weight)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_aggregated_attestation(
        &self,
        row: AggregatedAttestationRow,
    ) -> StorageResult<()> {
        sqlx::query(
            r#"INSERT INTO aggregated_attestations
               (id, cycle_id, message_hash, scheme, aggregate_signature, aggregate_public_key,
                signatures, participants, participant_ids, achieved_weight, required_weight,
                threshold_met, verified, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"#,
        )
        .bind(&row.id)
        .bind(&row.cycle_id)
        .bind(&row.message_hash)
        .bind(&row.scheme)
        .bind(&row.aggregate_signature)
        .bind(&row.aggregate_public_key)
        .bind(&row.signatures)
        .bind(&row.participants)
        .bind(&row.participant_ids)
        .bind(row.achieved_weight)
        .bind(row.required_weight)
        .bind(row.threshold_met)
        .bind(row.verified)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_batch_attestation(&self, row: BatchAttestationRow) -> StorageResult<()> {
        sqlx::query(
            r#"INSERT INTO batch_attestations
               (id, batch_id, block_height, validator_id, aggregate_signature, quorum_source,
                created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
        )
        .bind(&row.id)
        .bind(&row.batch_id)
        .bind(row.block_height)
        .bind(&row.validator_id)
        .bind(&row.aggregate_signature)
        .bind(&row.quorum_source)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn unified_for_cycle(
        &self,
        cycle_id: &str,
    ) -> StorageResult<Vec<UnifiedAttestationRow>> {
        let rows = sqlx::query(
            "SELECT * FROM unified_attestations WHERE cycle_id = $1 ORDER BY created_at",
        )
        .bind(cycle_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|r| {
                Ok(UnifiedAttestationRow {
                    id: r.try_get("id")?,
                    cycle_id: r.try_get("cycle_id")?,
                    validator_id: r.try_get("validator_id")?,
                    message_hash: r.try_get("message_hash")?,
                    public_key: r.try_get("public_key")?,
                    signature: r.try_get("signature")?,
                    scheme: r.try_get("scheme")?,
                    weight: r.try_get("weight")?,
                    created_at: r.try_get("created_at")?,
                })
            })
            .collect()
    }

    async fn aggregated_for_cycle(
        &self,
        cycle_id: &str,
    ) -> StorageResult<Option<AggregatedAttestationRow>> {
        let row = sqlx::query("SELECT * FROM aggregated_attestations WHERE cycle_id = $1")
            .bind(cycle_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| {
            Ok(AggregatedAttestationRow {
                id: r.try_get("id")?,
                cycle_id: r.try_get("cycle_id")?,
                message_hash: r.try_get("message_hash")?,
                scheme: r.try_get("scheme")?,
                aggregate_signature: r.try_get("aggregate_signature")?,
                aggregate_public_key: r.try_get("aggregate_public_key")?,
                signatures: r.try_get("signatures")?,
                participants: r.try_get("participants")?,
                participant_ids: r.try_get("participant_ids")?,
                achieved_weight: r.try_get("achieved_weight")?,
                required_weight: r.try_get("required_weight")?,
                threshold_met: r.try_get("threshold_met")?,
                verified: r.try_get("verified")?,
                created_at: r.try_get("created_at")?,
            })
        })
        .transpose()
    }
}

#[async_trait]
impl ExecutionStore for PostgresStore {
    async fn insert_execution_result(&self, row: ChainExecutionResultRow) -> StorageResult<()> {
        sqlx::query(
            r#"INSERT INTO chain_execution_results
               (id, cycle_id, proof_id, tx_hash, target_chain, workflow_step, block_number,
                confirmations, success, observation, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"#,
        )
        .bind(&row.id)
        .bind(&row.cycle_id)
        .bind(&row.proof_id)
        .bind(&row.tx_hash)
        .bind(&row.target_chain)
        .bind(row.workflow_step)
        .bind(row.block_number)
        .bind(row.confirmations)
        .bind(row.success)
        .bind(&row.observation)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn results_for_cycle(
        &self,
        cycle_id: &str,
    ) -> StorageResult<Vec<ChainExecutionResultRow>> {
        let rows = sqlx::query(
            "SELECT * FROM chain_execution_results WHERE cycle_id = $1 ORDER BY created_at",
        )
        .bind(cycle_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|r| {
                Ok(ChainExecutionResultRow {
                    id: r.try_get("id")?,
                    cycle_id: r.try_get("cycle_id")?,
                    proof_id: r.try_get("proof_id")?,
                    tx_hash: r.try_get("tx_hash")?,
                    target_chain: r.try_get("target_chain")?,
                    workflow_step: r.try_get("workflow_step")?,
                    block_number: r.try_get("block_number")?,
                    confirmations: r.try_get("confirmations")?,
                    success: r.try_get("success")?,
                    observation: r.try_get("observation")?,
                    created_at: r.try_get("created_at")?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl ConsensusStore for PostgresStore {
    async fn insert_consensus_entry(&self, row: ConsensusEntryRow) -> StorageResult<bool> {
        let result = sqlx::query(
            r#"INSERT INTO consensus_entries
               (id, bundle_id, block_height, operation_commitment, governance_level, state,
                proof_class, validator_id, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               ON CONFLICT (bundle_id, block_height) DO NOTHING"#,
        )
        .bind(&row.id)
        .bind(&row.bundle_id)
        .bind(row.block_height)
        .bind(&row.operation_commitment)
        .bind(row.governance_level)
        .bind(&row.state)
        .bind(&row.proof_class)
        .bind(&row.validator_id)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn entries_for_bundle(&self, bundle_id: &str) -> StorageResult<Vec<ConsensusEntryRow>> {
        let rows = sqlx::query(
            "SELECT * FROM consensus_entries WHERE bundle_id = $1 ORDER BY block_height",
        )
        .bind(bundle_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|r| {
                Ok(ConsensusEntryRow {
                    id: r.try_get("id")?,
                    bundle_id: r.try_get("bundle_id")?,
                    block_height: r.try_get("block_height")?,
                    operation_commitment: r.try_get("operation_commitment")?,
                    governance_level: r.try_get("governance_level")?,
                    state: r.try_get("state")?,
                    proof_class: r.try_get("proof_class")?,
                    validator_id: r.try_get("validator_id")?,
                    created_at: r.try_get("created_at")?,
                })
            })
            .collect()
    }

    async fn save_abci_state(&self, state: AbciState) -> StorageResult<()> {
        let value = serde_json::to_value(&state)
            .map_err(|e| StorageError::Database(e.to_string()))?;
        sqlx::query(
            r#"INSERT INTO consensus_state (key, value, updated_at)
               VALUES ('abci', $1, NOW())
               ON CONFLICT (key) DO UPDATE SET value = $1, updated_at = NOW()"#,
        )
        .bind(&value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_abci_state(&self) -> StorageResult<Option<AbciState>> {
        let row = sqlx::query("SELECT value FROM consensus_state WHERE key = 'abci'")
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| {
            let value: serde_json::Value = r.try_get("value")?;
            serde_json::from_value(value).map_err(|e| StorageError::Database(e.to_string()))
        })
        .transpose()
    }
}

#[async_trait]
impl JournalStore for PostgresStore {
    async fn append_custody_event(&self, row: CustodyEventRow) -> StorageResult<()> {
        sqlx::query(
            r#"INSERT INTO custody_chain_events
               (id, proof_id, sequence, event_type, details, previous_hash, current_hash,
                created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
        )
        .bind(&row.id)
        .bind(&row.proof_id)
        .bind(row.sequence)
        .bind(&row.event_type)
        .bind(&row.details)
        .bind(&row.previous_hash)
        .bind(&row.current_hash)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn custody_events(&self, proof_id: &str) -> StorageResult<Vec<CustodyEventRow>> {
        let rows = sqlx::query(
            "SELECT * FROM custody_chain_events WHERE proof_id = $1 ORDER BY sequence",
        )
        .bind(proof_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|r| {
                Ok(CustodyEventRow {
                    id: r.try_get("id")?,
                    proof_id: r.try_get("proof_id")?,
                    sequence: r.try_get("sequence")?,
                    event_type: r.try_get("event_type")?,
                    details: r.try_get("details")?,
                    previous_hash: r.try_get("previous_hash")?,
                    current_hash: r.try_get("current_hash")?,
                    created_at: r.try_get("created_at")?,
                })
            })
            .collect()
    }

    async fn append_audit_entry(&self, row: AuditTrailRow) -> StorageResult<()> {
        sqlx::query(
            r#"INSERT INTO audit_trail
               (id, user_id, intent_id, sequence, action, details, previous_hash,
                current_hash, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"#,
        )
        .bind(&row.id)
        .bind(&row.user_id)
        .bind(&row.intent_id)
        .bind(row.sequence)
        .bind(&row.action)
        .bind(&row.details)
        .bind(&row.previous_hash)
        .bind(&row.current_hash)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn audit_entries(&self, user_id: &str) -> StorageResult<Vec<AuditTrailRow>> {
        let rows =
            sqlx::query("SELECT * FROM audit_trail WHERE user_id = $1 ORDER BY sequence")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;
        rows.iter()
            .map(|r| {
                Ok(AuditTrailRow {
                    id: r.try_get("id")?,
                    user_id: r.try_get("user_id")?,
                    intent_id: r.try_get("intent_id")?,
                    sequence: r.try_get("sequence")?,
                    action: r.try_get("action")?,
                    details: r.try_get("details")?,
                    previous_hash: r.try_get("previous_hash")?,
                    current_hash: r.try_get("current_hash")?,
                    created_at: r.try_get("created_at")?,
                })
            })
            .collect()
    }
}
