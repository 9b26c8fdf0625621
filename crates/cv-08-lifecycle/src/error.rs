//! Lifecycle errors.

use shared_types::{Classified, ErrorClass, ProofState};
use thiserror::Error;

/// Lifecycle management errors.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The proof is not registered.
    #[error("Unknown proof: {0}")]
    UnknownProof(String),

    /// The proof is already registered.
    #[error("Proof {0} already registered")]
    AlreadyRegistered(String),

    /// The requested transition is not in the table.
    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition {
        /// Current state.
        from: ProofState,
        /// Requested state.
        to: ProofState,
    },

    /// A custody chain failed its linkage check.
    #[error("Custody chain broken at sequence {sequence}: {reason}")]
    BrokenChain {
        /// First bad event.
        sequence: u64,
        /// What went wrong.
        reason: String,
    },

    /// Event detail encoding failed.
    #[error(transparent)]
    Crypto(#[from] shared_crypto::CryptoError),
}

impl Classified for LifecycleError {
    fn class(&self) -> ErrorClass {
        match self {
            LifecycleError::BrokenChain { .. } | LifecycleError::Crypto(_) => ErrorClass::Crypto,
            _ => ErrorClass::Validation,
        }
    }
}

/// Result alias for lifecycle operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;
