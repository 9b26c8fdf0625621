//! The self-contained proof bundle (v1.0 schema).

use super::chained_proof::{ChainedProof, ProofEntry};
use super::governance::GovernanceProof;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_crypto::hashing::fold_step;
use shared_types::Hash32;

/// Bundle schema version emitted by this validator.
pub const BUNDLE_SCHEMA_VERSION: &str = "1.0";

/// Merkle inclusion of an intent's leaf in its batch root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleInclusion {
    /// Leaf hash as it entered the tree.
    pub leaf_hash: Hash32,
    /// Index of the leaf within the sealed batch.
    pub leaf_index: u64,
    /// Sibling path up to the root.
    pub path: Vec<ProofEntry>,
    /// Batch Merkle root.
    pub root: Hash32,
}

impl MerkleInclusion {
    /// Fold the leaf along the path.
    pub fn recompute_root(&self) -> Hash32 {
        self.path
            .iter()
            .fold(self.leaf_hash, |acc, e| fold_step(acc, e.hash, e.right))
    }
}

/// Reference to the external-chain anchor transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorReference {
    /// Anchor transaction hash (keeps `0x`).
    pub tx_hash: String,
    /// Block number of inclusion.
    pub block_number: u64,
    /// Block hash of inclusion (keeps `0x`).
    pub block_hash: String,
    /// Numeric chain id.
    pub chain_id: u64,
    /// Configured chain name.
    pub target_chain: String,
    /// Confirmations observed at bundling time.
    pub confirmations: u64,
    /// Whether the anchor reached the required confirmation depth.
    pub finalized: bool,
}

/// One validator attestation carried inside a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleAttestation {
    /// Attesting validator.
    pub validator_id: String,
    /// Validator public key, hex encoded.
    pub public_key: String,
    /// Signature over `signed_hash`, hex encoded.
    pub signature: String,
    /// The hash that was signed.
    pub signed_hash: Hash32,
    /// When the attestation was produced.
    pub timestamp: DateTime<Utc>,
}

/// The four proof components. The integrity hash covers exactly this struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleComponents {
    /// Merkle inclusion of the intent leaf.
    pub merkle_inclusion: MerkleInclusion,
    /// External anchor reference.
    pub anchor_reference: AnchorReference,
    /// Layered chained proof.
    pub chained_proof: ChainedProof,
    /// Governance proof.
    pub governance_proof: GovernanceProof,
}

/// Integrity section of a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleIntegrity {
    /// SHA-256 over the canonical encoding of the components.
    pub artifact_hash: Hash32,
    /// Head of the proof's custody chain at bundling time.
    pub custody_chain_hash: Hash32,
    /// Validator signature over `artifact_hash`, hex encoded.
    pub bundle_signature: String,
}

/// Self-contained verification artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofBundle {
    /// Schema version (`"1.0"`).
    pub version: String,
    /// Source-ledger transaction reference.
    pub tx_ref: String,
    /// The four proof components.
    pub components: BundleComponents,
    /// Collected validator attestations.
    pub attestations: Vec<BundleAttestation>,
    /// Integrity section.
    pub integrity: BundleIntegrity,
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_crypto::hashing::{sha256, sha256_concat};

    #[test]
    fn inclusion_recomputes_root() {
        let leaf = sha256(b"leaf");
        let sibling = sha256(b"sibling");
        let root = sha256_concat(&[leaf.as_bytes(), sibling.as_bytes()]);
        let inclusion = MerkleInclusion {
            leaf_hash: leaf,
            leaf_index: 0,
            path: vec![ProofEntry {
                hash: sibling,
                right: true,
            }],
            root,
        };
        assert_eq!(inclusion.recompute_root(), root);
    }
}
