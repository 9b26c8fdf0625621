//! Shared error taxonomy.
//!
//! Every subsystem error maps onto one of five classes; the class decides
//! retry behavior. Validation and crypto failures are never retried,
//! transient network failures retry to policy maximums, timeouts fail the
//! phase, and persistence failures are fatal only for primary lifecycle
//! writes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of a failure, driving retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Malformed input or failed invariant. Not retried.
    Validation,
    /// Signature or hash mismatch, threshold not met. Not retried.
    Crypto,
    /// RPC / peer HTTP failure, not-yet-mined, not-yet-finalized. Retried.
    TransientNetwork,
    /// Deadline exceeded. Fails the phase.
    Timeout,
    /// Database write failure.
    Persistence,
}

impl ErrorClass {
    /// Whether failures of this class may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorClass::TransientNetwork)
    }
}

/// Errors that can be classified for retry policy.
pub trait Classified {
    /// The error class of this failure.
    fn class(&self) -> ErrorClass;

    /// Convenience passthrough to [`ErrorClass::is_retryable`].
    fn is_retryable(&self) -> bool {
        self.class().is_retryable()
    }
}

/// Errors raised by the shared type layer itself.
#[derive(Debug, Error)]
pub enum TypeError {
    /// A hash field had the wrong length.
    #[error("Invalid hash length: expected {expected}, got {actual}")]
    InvalidHashLength {
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },

    /// A hash field was not valid hex.
    #[error("Invalid hex string: {0}")]
    InvalidHex(String),

    /// A proof class was outside `{on_demand, on_cadence}`.
    #[error("invalid proof class '{0}'")]
    InvalidProofClass(String),

    /// A sealed batch was mutated.
    #[error("Batch {0} is sealed; membership never changes after seal")]
    BatchSealed(String),
}

impl Classified for TypeError {
    fn class(&self) -> ErrorClass {
        ErrorClass::Validation
    }
}
