//! Proof model errors.

use shared_types::{Classified, ErrorClass};
use thiserror::Error;

/// Chain-continuity or anchor-recomputation failure in a chained proof.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("State proof invalid at layer {layer}: {reason}")]
pub struct StateProofError {
    /// Layer the failure was detected at (1-3).
    pub layer: u8,
    /// What went wrong.
    pub reason: String,
}

impl StateProofError {
    /// Shorthand constructor.
    pub fn new(layer: u8, reason: impl Into<String>) -> Self {
        Self {
            layer,
            reason: reason.into(),
        }
    }
}

/// Signature or threshold failure in a governance proof.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Authority proof invalid at signature {signature_index}: {reason}")]
pub struct AuthorityProofError {
    /// Index of the offending signer entry; the entry count on threshold
    /// failures.
    pub signature_index: usize,
    /// What went wrong.
    pub reason: String,
}

impl AuthorityProofError {
    /// Shorthand constructor.
    pub fn new(signature_index: usize, reason: impl Into<String>) -> Self {
        Self {
            signature_index,
            reason: reason.into(),
        }
    }
}

/// Any proof-model failure.
#[derive(Debug, Error)]
pub enum ProofError {
    /// Chained proof failed verification.
    #[error(transparent)]
    State(#[from] StateProofError),

    /// Governance proof failed verification.
    #[error(transparent)]
    Authority(#[from] AuthorityProofError),

    /// Anchor binding hash or signature mismatch.
    #[error("Anchor binding invalid: {0}")]
    Binding(String),

    /// Bundle integrity hash mismatch or missing component.
    #[error("Bundle integrity invalid: {0}")]
    Integrity(String),

    /// Merkle inclusion path did not fold to the root.
    #[error("Merkle inclusion invalid: {0}")]
    Inclusion(String),

    /// Encoding or compression failure.
    #[error("Codec failure: {0}")]
    Codec(String),

    /// Underlying cryptographic failure.
    #[error(transparent)]
    Crypto(#[from] shared_crypto::CryptoError),
}

impl Classified for ProofError {
    fn class(&self) -> ErrorClass {
        match self {
            ProofError::Codec(_) => ErrorClass::Validation,
            _ => ErrorClass::Crypto,
        }
    }
}

/// Result alias for proof-model operations.
pub type ProofResult<T> = Result<T, ProofError>;
