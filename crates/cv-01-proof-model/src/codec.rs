//! Bundle transport encoding.
//!
//! Bundles travel as JSON; compressed transport wraps the JSON in gzip. Hash
//! fields inside the bundle are lowercase hex without `0x`; external-chain
//! transaction and block hashes keep their `0x` prefix.

use crate::domain::{ProofBundle, ProofError, ProofResult};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Serialize a bundle to its JSON wire form.
pub fn encode_bundle(bundle: &ProofBundle) -> ProofResult<Vec<u8>> {
    serde_json::to_vec(bundle).map_err(|e| ProofError::Codec(e.to_string()))
}

/// Parse a bundle from its JSON wire form.
pub fn decode_bundle(bytes: &[u8]) -> ProofResult<ProofBundle> {
    serde_json::from_slice(bytes).map_err(|e| ProofError::Codec(e.to_string()))
}

/// Gzip-compress a bundle's JSON form.
pub fn gzip_bundle(bundle: &ProofBundle) -> ProofResult<Vec<u8>> {
    let json = encode_bundle(bundle)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&json)
        .map_err(|e| ProofError::Codec(e.to_string()))?;
    encoder.finish().map_err(|e| ProofError::Codec(e.to_string()))
}

/// Decompress and parse a gzipped bundle.
pub fn gunzip_bundle(bytes: &[u8]) -> ProofResult<ProofBundle> {
    let mut decoder = GzDecoder::new(bytes);
    let mut json = Vec::new();
    decoder
        .read_to_end(&mut json)
        .map_err(|e| ProofError::Codec(e.to_string()))?;
    decode_bundle(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        AnchorReference, BundleAttestation, BundleComponents, BundleIntegrity, GovernanceProof,
        MerkleInclusion, ProofEntry, ProofLayer, BUNDLE_SCHEMA_VERSION,
    };
    use crate::domain::ChainedProof;
    use chrono::{TimeZone, Utc};
    use shared_crypto::canonical::canonical_sha256;
    use shared_crypto::hashing::{fold_step, sha256};

    fn folded_layer(start: shared_types::Hash32, tag: &str) -> ProofLayer {
        let entry = ProofEntry {
            hash: sha256(tag.as_bytes()),
            right: true,
        };
        let anchor = fold_step(start, entry.hash, entry.right);
        ProofLayer {
            start,
            entries: vec![entry],
            anchor,
        }
    }

    fn bundle_with_attestation() -> ProofBundle {
        let l1 = folded_layer(sha256(b"tx"), "a");
        let l2 = folded_layer(l1.anchor, "b");
        let l3 = folded_layer(l2.anchor, "c");
        let network_root = l3.anchor;
        let leaf = sha256(b"leaf");
        let sibling = sha256(b"sib");
        let components = BundleComponents {
            merkle_inclusion: MerkleInclusion {
                leaf_hash: leaf,
                leaf_index: 3,
                path: vec![ProofEntry {
                    hash: sibling,
                    right: false,
                }],
                root: fold_step(leaf, sibling, false),
            },
            anchor_reference: AnchorReference {
                tx_hash: "0xbbb".into(),
                block_number: 18_000_000,
                block_hash: "0xccc".into(),
                chain_id: 1,
                target_chain: "ethereum".into(),
                confirmations: 12,
                finalized: true,
            },
            chained_proof: ChainedProof {
                l1,
                l2,
                l3,
                network_root,
            },
            governance_proof: GovernanceProof::g0(true),
        };
        let artifact_hash = canonical_sha256(&components).unwrap();
        ProofBundle {
            version: BUNDLE_SCHEMA_VERSION.into(),
            tx_ref: "acc://demo/book/1@0xaaa".into(),
            components,
            attestations: vec![BundleAttestation {
                validator_id: "validator-1".into(),
                public_key: "ab".repeat(32),
                signature: "cd".repeat(64),
                signed_hash: sha256(b"msg"),
                // Fixed instant so equality survives serialization resolution.
                timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            }],
            integrity: BundleIntegrity {
                artifact_hash,
                custody_chain_hash: sha256(b"custody"),
                bundle_signature: "ef".repeat(64),
            },
        }
    }

    #[test]
    fn json_round_trip_is_identity() {
        let bundle = bundle_with_attestation();
        let bytes = encode_bundle(&bundle).unwrap();
        let back = decode_bundle(&bytes).unwrap();
        assert_eq!(back, bundle);
    }

    #[test]
    fn gzip_round_trip_is_identity() {
        let bundle = bundle_with_attestation();
        let compressed = gzip_bundle(&bundle).unwrap();
        let back = gunzip_bundle(&compressed).unwrap();
        assert_eq!(back, bundle);
    }

    #[test]
    fn gzip_output_is_gzip() {
        let bundle = bundle_with_attestation();
        let compressed = gzip_bundle(&bundle).unwrap();
        // RFC 1952 magic bytes.
        assert_eq!(&compressed[..2], &[0x1f, 0x8b]);
    }

    #[test]
    fn hash_fields_are_bare_lowercase_hex() {
        let bundle = bundle_with_attestation();
        let json: serde_json::Value =
            serde_json::from_slice(&encode_bundle(&bundle).unwrap()).unwrap();
        let leaf = json["components"]["merkle_inclusion"]["leaf_hash"]
            .as_str()
            .unwrap();
        assert_eq!(leaf.len(), 64);
        assert!(!leaf.starts_with("0x"));
        // External-chain hashes keep their prefix.
        let anchor_tx = json["components"]["anchor_reference"]["tx_hash"]
            .as_str()
            .unwrap();
        assert!(anchor_tx.starts_with("0x"));
    }

    #[test]
    fn truncated_gzip_rejected() {
        let bundle = bundle_with_attestation();
        let compressed = gzip_bundle(&bundle).unwrap();
        assert!(gunzip_bundle(&compressed[..compressed.len() / 2]).is_err());
    }

    #[test]
    fn missing_component_rejected() {
        let bundle = bundle_with_attestation();
        let mut json: serde_json::Value =
            serde_json::from_slice(&encode_bundle(&bundle).unwrap()).unwrap();
        json["components"]
            .as_object_mut()
            .unwrap()
            .remove("chained_proof");
        let bytes = serde_json::to_vec(&json).unwrap();
        assert!(decode_bundle(&bytes).is_err());
    }
}
