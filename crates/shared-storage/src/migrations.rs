//! Idempotent schema migrations.

use crate::error::StorageResult;
use sqlx::PgPool;
use tracing::info;

/// Ordered, idempotent DDL statements.
const MIGRATIONS: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS proof_artifacts (
        artifact_id TEXT PRIMARY KEY,
        proof_id TEXT NOT NULL,
        operation_id BYTEA NOT NULL,
        tx_ref TEXT NOT NULL,
        target_chain TEXT NOT NULL,
        artifact_hash BYTEA NOT NULL,
        includes_merkle_inclusion BOOLEAN NOT NULL DEFAULT FALSE,
        includes_anchor_reference BOOLEAN NOT NULL DEFAULT FALSE,
        includes_chained_proof BOOLEAN NOT NULL DEFAULT FALSE,
        includes_governance_proof BOOLEAN NOT NULL DEFAULT FALSE,
        includes_attestations BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS proof_bundles (
        bundle_id TEXT PRIMARY KEY,
        artifact_id TEXT NOT NULL REFERENCES proof_artifacts(artifact_id),
        schema_version TEXT NOT NULL,
        bundle_gzip BYTEA NOT NULL,
        bundle_sha256 BYTEA NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS anchor_references (
        id TEXT PRIMARY KEY,
        artifact_id TEXT NOT NULL,
        tx_hash TEXT NOT NULL,
        block_number BIGINT NOT NULL,
        block_hash TEXT NOT NULL,
        chain_id BIGINT NOT NULL,
        target_chain TEXT NOT NULL,
        confirmations BIGINT NOT NULL,
        finalized BOOLEAN NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS chained_proof_layers (
        id TEXT PRIMARY KEY,
        artifact_id TEXT NOT NULL,
        layer SMALLINT NOT NULL,
        start_hash BYTEA NOT NULL,
        anchor_hash BYTEA NOT NULL,
        entries JSONB NOT NULL DEFAULT '[]',
        failed BOOLEAN NOT NULL DEFAULT FALSE,
        failure_reason TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS governance_proof_levels (
        id TEXT PRIMARY KEY,
        artifact_id TEXT NOT NULL,
        level SMALLINT NOT NULL,
        anchor_finalized BOOLEAN NOT NULL,
        key_page_url TEXT,
        key_page_version BIGINT,
        signers JSONB NOT NULL DEFAULT '[]',
        required_threshold BIGINT NOT NULL DEFAULT 0,
        achieved_weight BIGINT NOT NULL DEFAULT 0,
        outcome JSONB NOT NULL DEFAULT 'null',
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS validator_attestations (
        id TEXT PRIMARY KEY,
        artifact_id TEXT NOT NULL,
        validator_id TEXT NOT NULL,
        public_key BYTEA NOT NULL,
        signature BYTEA NOT NULL,
        signed_hash BYTEA NOT NULL,
        scheme TEXT NOT NULL,
        weight BIGINT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS verification_history (
        id TEXT PRIMARY KEY,
        artifact_id TEXT NOT NULL,
        proof_id TEXT NOT NULL,
        outcome TEXT NOT NULL,
        fail_phase SMALLINT,
        details JSONB NOT NULL DEFAULT '{}',
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS unified_attestations (
        id TEXT PRIMARY KEY,
        cycle_id TEXT NOT NULL,
        validator_id TEXT NOT NULL,
        message_hash BYTEA NOT NULL,
        public_key BYTEA NOT NULL,
        signature BYTEA NOT NULL,
        scheme TEXT NOT NULL,
        weight BIGINT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS aggregated_attestations (
        id TEXT PRIMARY KEY,
        cycle_id TEXT NOT NULL,
        message_hash BYTEA NOT NULL,
        scheme TEXT NOT NULL,
        aggregate_signature BYTEA NOT NULL,
        aggregate_public_key BYTEA NOT NULL,
        signatures JSONB NOT NULL DEFAULT '[]',
        participants BYTEA NOT NULL,
        participant_ids JSONB NOT NULL DEFAULT '[]',
        achieved_weight BIGINT NOT NULL,
        required_weight BIGINT NOT NULL,
        threshold_met BOOLEAN NOT NULL,
        verified BOOLEAN NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS chain_execution_results (
        id TEXT PRIMARY KEY,
        cycle_id TEXT NOT NULL,
        proof_id TEXT NOT NULL,
        tx_hash TEXT NOT NULL,
        target_chain TEXT NOT NULL,
        workflow_step INTEGER NOT NULL,
        block_number BIGINT NOT NULL,
        confirmations BIGINT NOT NULL,
        success BOOLEAN NOT NULL,
        observation JSONB NOT NULL DEFAULT '{}',
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS consensus_entries (
        id TEXT PRIMARY KEY,
        bundle_id TEXT NOT NULL,
        block_height BIGINT NOT NULL,
        operation_commitment TEXT NOT NULL,
        governance_level SMALLINT NOT NULL,
        state TEXT NOT NULL,
        proof_class TEXT NOT NULL,
        validator_id TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        UNIQUE (bundle_id, block_height)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS batch_attestations (
        id TEXT PRIMARY KEY,
        batch_id TEXT NOT NULL,
        block_height BIGINT NOT NULL,
        validator_id TEXT NOT NULL,
        aggregate_signature BYTEA NOT NULL,
        quorum_source TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS custody_chain_events (
        id TEXT PRIMARY KEY,
        proof_id TEXT NOT NULL,
        sequence BIGINT NOT NULL,
        event_type TEXT NOT NULL,
        details JSONB NOT NULL DEFAULT '{}',
        previous_hash BYTEA NOT NULL,
        current_hash BYTEA NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        UNIQUE (proof_id, sequence)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS audit_trail (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        intent_id TEXT NOT NULL,
        sequence BIGINT NOT NULL,
        action TEXT NOT NULL,
        details JSONB NOT NULL DEFAULT '{}',
        previous_hash BYTEA NOT NULL,
        current_hash BYTEA NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        UNIQUE (user_id, sequence)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS consensus_state (
        key TEXT PRIMARY KEY,
        value JSONB NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    r#"CREATE INDEX IF NOT EXISTS idx_unified_attestations_cycle
        ON unified_attestations (cycle_id)"#,
    r#"CREATE INDEX IF NOT EXISTS idx_execution_results_cycle
        ON chain_execution_results (cycle_id)"#,
    r#"CREATE INDEX IF NOT EXISTS idx_custody_events_proof
        ON custody_chain_events (proof_id, sequence)"#,
    r#"CREATE INDEX IF NOT EXISTS idx_audit_trail_user
        ON audit_trail (user_id, sequence)"#,
    r#"CREATE INDEX IF NOT EXISTS idx_consensus_entries_bundle
        ON consensus_entries (bundle_id)"#,
];

/// Apply every migration. Safe to run on every startup.
pub async fn run_migrations(pool: &PgPool) -> StorageResult<()> {
    for statement in MIGRATIONS {
        sqlx::query(statement).execute(pool).await?;
    }
    info!(statements = MIGRATIONS.len(), "migrations applied");
    Ok(())
}
