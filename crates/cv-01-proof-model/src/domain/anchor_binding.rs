//! Anchor binding: the cryptographic glue between a batch Merkle root and
//! its external anchor transaction.

use serde::{Deserialize, Serialize};
use shared_crypto::canonical::canonical_sha256;
use shared_crypto::{CryptoError, Ed25519KeyPair};
use shared_types::Hash32;

/// Preimage of the binding hash. Field names are part of the protocol.
#[derive(Serialize)]
struct BindingPreimage<'a> {
    merkle_root_hash: &'a Hash32,
    anchor_tx_hash: &'a str,
    anchor_block_num: u64,
    anchor_chain_id: u64,
}

/// Binds a batch Merkle root to the anchor transaction that recorded it,
/// signed by a coordinator Ed25519 key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorBinding {
    /// Merkle root of the anchored batch.
    pub merkle_root_hash: Hash32,
    /// Anchor transaction hash on the external chain (keeps `0x`).
    pub anchor_tx_hash: String,
    /// Block number of the anchor transaction.
    pub anchor_block_num: u64,
    /// Chain id of the anchor chain.
    pub anchor_chain_id: u64,
    /// SHA-256 over the canonical binding preimage.
    pub binding_hash: Hash32,
    /// Coordinator public key, hex encoded.
    pub coordinator_public_key: String,
    /// Coordinator Ed25519 signature over `binding_hash`, hex encoded.
    pub signature: String,
}

impl AnchorBinding {
    /// Compute the binding hash for the given coordinates.
    pub fn compute_hash(
        merkle_root_hash: &Hash32,
        anchor_tx_hash: &str,
        anchor_block_num: u64,
        anchor_chain_id: u64,
    ) -> Result<Hash32, CryptoError> {
        canonical_sha256(&BindingPreimage {
            merkle_root_hash,
            anchor_tx_hash,
            anchor_block_num,
            anchor_chain_id,
        })
    }

    /// Build and sign a binding with the coordinator key.
    pub fn sign(
        coordinator: &Ed25519KeyPair,
        merkle_root_hash: Hash32,
        anchor_tx_hash: String,
        anchor_block_num: u64,
        anchor_chain_id: u64,
    ) -> Result<Self, CryptoError> {
        let binding_hash = Self::compute_hash(
            &merkle_root_hash,
            &anchor_tx_hash,
            anchor_block_num,
            anchor_chain_id,
        )?;
        let signature = coordinator.sign(binding_hash.as_bytes());
        Ok(Self {
            merkle_root_hash,
            anchor_tx_hash,
            anchor_block_num,
            anchor_chain_id,
            binding_hash,
            coordinator_public_key: hex::encode(coordinator.public_key().as_bytes()),
            signature: hex::encode(signature.as_bytes()),
        })
    }
}
