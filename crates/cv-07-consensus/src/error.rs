//! Consensus errors and reject codes.

use shared_types::{Classified, ErrorClass};
use thiserror::Error;

/// Numeric rejection codes surfaced to the replication layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RejectCode {
    /// Block JSON failed to parse.
    ParseError = 1,
    /// A required field is empty.
    MissingField = 2,
    /// Proof class outside `{on_demand, on_cadence}`.
    InvalidProofClass = 3,
    /// Governance levels are not monotone.
    GovernanceNotMonotonic = 4,
}

impl RejectCode {
    /// Numeric code.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

/// Consensus processing errors.
#[derive(Debug, Error)]
pub enum ConsensusError {
    /// The block was rejected at pre-commit.
    #[error("Block rejected (code {code}): {reason}")]
    Rejected {
        /// Numeric reject code.
        code: u8,
        /// Rejection reason; logged verbatim.
        reason: String,
    },

    /// The durable store failed.
    #[error(transparent)]
    Storage(#[from] shared_storage::StorageError),

    /// Self-attestation signing failed.
    #[error(transparent)]
    Attestation(#[from] cv_04_attestation::AttestationError),
}

impl ConsensusError {
    /// Build a rejection.
    pub fn rejected(code: RejectCode, reason: impl Into<String>) -> Self {
        ConsensusError::Rejected {
            code: code.code(),
            reason: reason.into(),
        }
    }
}

impl Classified for ConsensusError {
    fn class(&self) -> ErrorClass {
        match self {
            ConsensusError::Rejected { .. } => ErrorClass::Validation,
            ConsensusError::Storage(e) => e.class(),
            ConsensusError::Attestation(e) => e.class(),
        }
    }
}

/// Result alias for consensus operations.
pub type ConsensusResult<T> = Result<T, ConsensusError>;
