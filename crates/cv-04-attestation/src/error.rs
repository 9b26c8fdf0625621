//! Attestation errors.

use shared_types::{Classified, ErrorClass};
use thiserror::Error;

/// Attestation subsystem errors.
#[derive(Debug, Error)]
pub enum AttestationError {
    /// The validator is not in the roster.
    #[error("Unknown validator: {validator_id}")]
    UnknownValidator {
        /// The offending validator id.
        validator_id: String,
    },

    /// The attestation's public key does not match the roster entry.
    #[error("Public key mismatch for validator {validator_id}")]
    PublicKeyMismatch {
        /// The offending validator id.
        validator_id: String,
    },

    /// The attestation was produced under a different scheme.
    #[error("Scheme mismatch: expected {expected}, got {actual}")]
    SchemeMismatch {
        /// Scheme of this strategy.
        expected: String,
        /// Scheme carried by the attestation.
        actual: String,
    },

    /// Aggregation over an empty attestation set.
    #[error("Empty attestation set")]
    EmptySet,

    /// Aggregation input did not share a single message hash.
    #[error("Attestations cover different message hashes")]
    MixedMessageHashes,

    /// A member signature failed verification during aggregation.
    #[error("Attestation from {validator_id} failed verification")]
    MemberVerificationFailed {
        /// The offending validator id.
        validator_id: String,
    },

    /// Underlying cryptographic failure.
    #[error(transparent)]
    Crypto(#[from] shared_crypto::CryptoError),
}

impl Classified for AttestationError {
    fn class(&self) -> ErrorClass {
        match self {
            AttestationError::UnknownValidator { .. }
            | AttestationError::EmptySet
            | AttestationError::MixedMessageHashes
            | AttestationError::SchemeMismatch { .. } => ErrorClass::Validation,
            _ => ErrorClass::Crypto,
        }
    }
}

/// Result alias for attestation operations.
pub type AttestationResult<T> = Result<T, AttestationError>;
