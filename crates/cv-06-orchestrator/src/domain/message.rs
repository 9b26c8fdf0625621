//! The message every validator signs during phase 8.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_crypto::canonical::canonical_json;
use shared_crypto::CryptoError;
use shared_types::Hash32;

/// Canonical attestation payload for one cycle.
///
/// Every peer re-signs exactly this message with its own key; the caller
/// verifies each returned attestation against the same canonical bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttestationMessage {
    /// Intent the cycle proves.
    pub intent_id: Hash32,
    /// Hash of the primary observation result.
    pub result_hash: Hash32,
    /// Anchor transaction hash on the external chain.
    pub anchor_tx_hash: String,
    /// Anchor block number.
    pub block_number: u64,
    /// Target chain name.
    pub target_chain: String,
    /// Numeric chain id.
    pub chain_id: u64,
    /// When the message was assembled.
    pub timestamp: DateTime<Utc>,
    /// Cycle the message belongs to.
    pub cycle_id: String,
    /// Bundle the cycle will materialize.
    pub bundle_id: String,
    /// Batch Merkle root.
    pub merkle_root: Hash32,
}

impl AttestationMessage {
    /// Canonical signing bytes.
    pub fn signing_bytes(&self) -> Result<Vec<u8>, CryptoError> {
        Ok(canonical_json(self)?.into_bytes())
    }
}
