//! Audit errors.

use shared_types::{Classified, ErrorClass};
use thiserror::Error;

/// Audit subsystem errors.
#[derive(Debug, Error)]
pub enum AuditError {
    /// An audit trail failed its linkage check.
    #[error("Audit trail broken at sequence {sequence}: {reason}")]
    BrokenTrail {
        /// First bad entry.
        sequence: u64,
        /// What went wrong.
        reason: String,
    },

    /// Entry detail encoding failed.
    #[error(transparent)]
    Crypto(#[from] shared_crypto::CryptoError),
}

impl Classified for AuditError {
    fn class(&self) -> ErrorClass {
        ErrorClass::Crypto
    }
}

/// Result alias for audit operations.
pub type AuditResult<T> = Result<T, AuditError>;
