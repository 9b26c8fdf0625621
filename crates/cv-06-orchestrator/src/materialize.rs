//! Bundle materialization.
//!
//! After a cycle finishes, the bundle and its components are written to the
//! proof tables: one `proof_artifacts` row, per-component rows (with failure
//! rows standing in for components that could not be built), validator
//! attestations, a `verification_history` entry, and the gzipped bundle
//! itself with its own SHA-256. Component presence is reflected in the
//! artifact's `includes_*` flags.

use chrono::Utc;
use cv_01_proof_model::{GovernanceLevel, ProofBundle};
use shared_storage::{
    AnchorReferenceRow, ChainedProofLayerRow, GovernanceProofLevelRow, ProofArtifactRow,
    ProofBundleRow, ProofStore, StorageResult, ValidatorAttestationRow, VerificationHistoryRow,
};
use shared_types::Hash32;
use uuid::Uuid;

/// Everything materialization needs from a finished cycle.
pub struct MaterializeInput {
    /// Cycle that produced the bundle.
    pub cycle_id: String,
    /// Proof id minted for the cycle.
    pub proof_id: String,
    /// Deterministic operation id.
    pub operation_id: Hash32,
    /// Bundle id.
    pub bundle_id: String,
    /// Target chain name.
    pub target_chain: String,
    /// Attestation scheme the cycle ran under.
    pub scheme: String,
    /// The assembled bundle.
    pub bundle: ProofBundle,
    /// Gzipped bundle JSON.
    pub bundle_gzip: Vec<u8>,
    /// SHA-256 of the gzipped payload.
    pub bundle_sha256: Hash32,
    /// Chained-proof construction failure, when the component is absent.
    pub chained_proof_error: Option<String>,
    /// Cycle outcome (`verified` / `failed`).
    pub outcome: String,
    /// Failed phase, when failed.
    pub fail_phase: Option<u8>,
}

/// Persist every row for a finished cycle. Returns the artifact id.
pub async fn materialize_bundle<S: ProofStore>(
    store: &S,
    input: MaterializeInput,
) -> StorageResult<String> {
    let artifact_id = Uuid::new_v4().to_string();
    let now = Utc::now();
    let components = &input.bundle.components;

    store
        .insert_artifact(ProofArtifactRow {
            artifact_id: artifact_id.clone(),
            proof_id: input.proof_id.clone(),
            operation_id: input.operation_id.as_bytes().to_vec(),
            tx_ref: input.bundle.tx_ref.clone(),
            target_chain: input.target_chain.clone(),
            artifact_hash: input.bundle.integrity.artifact_hash.as_bytes().to_vec(),
            includes_merkle_inclusion: true,
            includes_anchor_reference: true,
            includes_chained_proof: input.chained_proof_error.is_none(),
            includes_governance_proof: true,
            includes_attestations: !input.bundle.attestations.is_empty(),
            created_at: now,
        })
        .await?;

    store
        .insert_anchor_reference(AnchorReferenceRow {
            id: Uuid::new_v4().to_string(),
            artifact_id: artifact_id.clone(),
            tx_hash: components.anchor_reference.tx_hash.clone(),
            block_number: components.anchor_reference.block_number as i64,
            block_hash: components.anchor_reference.block_hash.clone(),
            chain_id: components.anchor_reference.chain_id as i64,
            target_chain: components.anchor_reference.target_chain.clone(),
            confirmations: components.anchor_reference.confirmations as i64,
            finalized: components.anchor_reference.finalized,
            created_at: now,
        })
        .await?;

    match &input.chained_proof_error {
        None => {
            for (layer, proof_layer) in components.chained_proof.layers() {
                store
                    .insert_chained_proof_layer(ChainedProofLayerRow {
                        id: Uuid::new_v4().to_string(),
                        artifact_id: artifact_id.clone(),
                        layer: layer as i16,
                        start_hash: proof_layer.start.as_bytes().to_vec(),
                        anchor_hash: proof_layer.anchor.as_bytes().to_vec(),
                        entries: serde_json::to_value(&proof_layer.entries)
                            .unwrap_or_else(|_| serde_json::json!([])),
                        failed: false,
                        failure_reason: None,
                        created_at: now,
                    })
                    .await?;
            }
        }
        Some(reason) => {
            store
                .insert_chained_proof_layer(ChainedProofLayerRow {
                    id: Uuid::new_v4().to_string(),
                    artifact_id: artifact_id.clone(),
                    layer: 1,
                    start_hash: Vec::new(),
                    anchor_hash: Vec::new(),
                    entries: serde_json::json!([]),
                    failed: true,
                    failure_reason: Some(reason.clone()),
                    created_at: now,
                })
                .await?;
        }
    }

    // One row per achieved governance level, G0 upward.
    let governance = &components.governance_proof;
    for level in 0..=governance.level.as_u8() {
        let is_authority_level = level >= GovernanceLevel::G1.as_u8();
        store
            .insert_governance_level(GovernanceProofLevelRow {
                id: Uuid::new_v4().to_string(),
                artifact_id: artifact_id.clone(),
                level: level as i16,
                anchor_finalized: governance.anchor_finalized,
                key_page_url: if is_authority_level {
                    governance.key_page.as_ref().map(|p| p.url.clone())
                } else {
                    None
                },
                key_page_version: if is_authority_level {
                    governance.key_page.as_ref().map(|p| p.version as i64)
                } else {
                    None
                },
                signers: if is_authority_level {
                    serde_json::to_value(&governance.signers)
                        .unwrap_or_else(|_| serde_json::json!([]))
                } else {
                    serde_json::json!([])
                },
                required_threshold: governance.required_threshold as i64,
                achieved_weight: if is_authority_level {
                    governance.total_weight() as i64
                } else {
                    0
                },
                outcome: if level == GovernanceLevel::G2.as_u8() {
                    serde_json::to_value(&governance.outcome)
                        .unwrap_or(serde_json::Value::Null)
                } else {
                    serde_json::Value::Null
                },
                created_at: now,
            })
            .await?;
    }

    for attestation in &input.bundle.attestations {
        store
            .insert_validator_attestation(ValidatorAttestationRow {
                id: Uuid::new_v4().to_string(),
                artifact_id: artifact_id.clone(),
                validator_id: attestation.validator_id.clone(),
                public_key: hex::decode(&attestation.public_key).unwrap_or_default(),
                signature: hex::decode(&attestation.signature).unwrap_or_default(),
                signed_hash: attestation.signed_hash.as_bytes().to_vec(),
                scheme: input.scheme.clone(),
                weight: 1,
                created_at: now,
            })
            .await?;
    }

    store
        .insert_verification_history(VerificationHistoryRow {
            id: Uuid::new_v4().to_string(),
            artifact_id: artifact_id.clone(),
            proof_id: input.proof_id.clone(),
            outcome: input.outcome.clone(),
            fail_phase: input.fail_phase.map(|p| p as i16),
            details: serde_json::json!({ "cycle_id": input.cycle_id }),
            created_at: now,
        })
        .await?;

    store
        .insert_bundle(ProofBundleRow {
            bundle_id: input.bundle_id.clone(),
            artifact_id: artifact_id.clone(),
            schema_version: input.bundle.version.clone(),
            bundle_gzip: input.bundle_gzip,
            bundle_sha256: input.bundle_sha256.as_bytes().to_vec(),
            created_at: now,
        })
        .await?;

    Ok(artifact_id)
}
