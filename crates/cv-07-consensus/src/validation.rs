//! Pre-commit structural validation.

use crate::domain::{RawValidatorBlock, ReplicationHeader, ValidatorBlock};
use crate::error::{ConsensusError, RejectCode};
use shared_types::AnchorClass;
use std::str::FromStr;

/// Parse a proposed block and run the structural invariants, overriding
/// header-derived fields from the replication layer.
pub fn validate_block(
    raw_json: &[u8],
    header: &ReplicationHeader,
) -> Result<ValidatorBlock, ConsensusError> {
    let raw: RawValidatorBlock = serde_json::from_slice(raw_json)
        .map_err(|e| ConsensusError::rejected(RejectCode::ParseError, e.to_string()))?;
    apply_and_validate(raw, header)
}

/// Validate an already-parsed block.
pub fn apply_and_validate(
    raw: RawValidatorBlock,
    header: &ReplicationHeader,
) -> Result<ValidatorBlock, ConsensusError> {
    if raw.bundle_id.trim().is_empty() {
        return Err(ConsensusError::rejected(
            RejectCode::MissingField,
            "bundle_id is empty",
        ));
    }
    if raw.operation_commitment.trim().is_empty() {
        return Err(ConsensusError::rejected(
            RejectCode::MissingField,
            "operation_commitment is empty",
        ));
    }

    let proof_class = AnchorClass::from_str(&raw.execution_proof.proof_class).map_err(|_| {
        ConsensusError::rejected(
            RejectCode::InvalidProofClass,
            format!("invalid proof class '{}'", raw.execution_proof.proof_class),
        )
    })?;

    if !raw.governance_proof.is_monotonic() {
        return Err(ConsensusError::rejected(
            RejectCode::GovernanceNotMonotonic,
            "governance levels are not downward-closed",
        ));
    }

    Ok(ValidatorBlock {
        bundle_id: raw.bundle_id,
        // Header-derived fields are authoritative.
        block_height: header.block_height,
        timestamp: header.timestamp,
        validator_id: header.validator_id.clone(),
        operation_commitment: raw.operation_commitment,
        merkle_root: raw.merkle_root,
        synthetic_transactions: raw.synthetic_transactions,
        governance_proof: raw.governance_proof,
        cross_chain_proof: raw.cross_chain_proof,
        stage: raw.execution_proof.stage,
        proof_class,
        accumulate_anchor_reference: raw.accumulate_anchor_reference,
    })
}
