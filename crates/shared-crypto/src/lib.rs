//! # Shared Crypto - Cryptographic Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | SHA-256, Keccak-256 | Proof hashes, trie node keys, Merkle roots |
//! | `canonical` | Canonical JSON | Deterministic hashing of structured data |
//! | `signatures` | Ed25519 | Attestations, anchor bindings, write-back signing |
//! | `bls` | BLS12-381 (min_pk) | Attestation aggregation on EVM anchors |
//!
//! ## Security Properties
//!
//! - **SHA-256** for every protocol hash; Keccak-256 only inside Patricia
//!   tries, where the node key is the hash itself and node values are never
//!   rehashed.
//! - **Ed25519**: deterministic nonces, no RNG dependency at signing time.
//! - **BLS12-381**: Ethereum DST, proof-of-possession assumption; aggregate
//!   signature and aggregate public key are single group elements.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bls;
pub mod canonical;
pub mod errors;
pub mod hashing;
pub mod signatures;

// Re-exports
pub use bls::{BlsKeyPair, BlsPublicKey, BlsSignature};
pub use canonical::{canonical_json, canonical_sha256};
pub use errors::CryptoError;
pub use hashing::{fold_step, keccak256, merkle_path, merkle_root, sha256, sha256_concat};
pub use signatures::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}
