//! Deterministic identifiers.
//!
//! Operation ids must be stable across runs and platforms: both helpers hash
//! canonical JSON (sorted keys, compact) with SHA-256.

use serde::Serialize;
use shared_crypto::canonical::{canonical_json, canonical_sha256};
use shared_crypto::hashing::sha256_concat;
use shared_crypto::CryptoError;
use shared_types::{Hash32, IntentPayload};

#[derive(Serialize)]
struct OperationIdPreimage<'a> {
    tx_hash: &'a str,
    account_url: &'a str,
    block_number: u64,
    timestamp: i64,
}

/// Compute the deterministic operation id for an observed intent.
pub fn compute_operation_id(
    tx_hash: &str,
    account_url: &str,
    block_number: u64,
    timestamp: i64,
) -> Result<Hash32, CryptoError> {
    canonical_sha256(&OperationIdPreimage {
        tx_hash,
        account_url,
        block_number,
        timestamp,
    })
}

/// Hash an intent's referenced payload blobs.
pub fn compute_intent_payload_hash(payload: &IntentPayload) -> Result<Hash32, CryptoError> {
    compute_canonical_blob_hash(
        &payload.intent,
        &payload.cross_chain,
        &payload.governance,
        &payload.replay,
    )
}

/// Hash the canonical 4-blob intent payload:
/// `SHA256(canon(intent) ‖ canon(cross) ‖ canon(gov) ‖ canon(replay))`.
pub fn compute_canonical_blob_hash(
    intent: &serde_json::Value,
    cross_chain: &serde_json::Value,
    governance: &serde_json::Value,
    replay: &serde_json::Value,
) -> Result<Hash32, CryptoError> {
    let intent = canonical_json(intent)?;
    let cross_chain = canonical_json(cross_chain)?;
    let governance = canonical_json(governance)?;
    let replay = canonical_json(replay)?;
    Ok(sha256_concat(&[
        intent.as_bytes(),
        cross_chain.as_bytes(),
        governance.as_bytes(),
        replay.as_bytes(),
    ]))
}
