//! Cycle errors.

use shared_types::{Classified, ErrorClass};
use thiserror::Error;

/// A phase-attributed cycle failure.
///
/// `phase` is 7 (observation), 8 (attestation) or 9 (write-back); 0 marks a
/// failure before the pipeline started.
#[derive(Debug, Clone, Error)]
#[error("Cycle failed at phase {phase}: {reason}")]
pub struct CycleError {
    /// Phase the failure happened in.
    pub phase: u8,
    /// Root cause.
    pub reason: String,
    /// Failure classification.
    pub class: ErrorClass,
}

impl CycleError {
    /// Failure before the pipeline started.
    pub fn setup(reason: impl Into<String>) -> Self {
        Self {
            phase: 0,
            reason: reason.into(),
            class: ErrorClass::Validation,
        }
    }

    /// Failure in a specific phase.
    pub fn phase(phase: u8, class: ErrorClass, reason: impl Into<String>) -> Self {
        Self {
            phase,
            reason: reason.into(),
            class,
        }
    }

    /// Deadline failure in a specific phase.
    pub fn timeout(phase: u8, reason: impl Into<String>) -> Self {
        Self::phase(phase, ErrorClass::Timeout, reason)
    }
}

impl Classified for CycleError {
    fn class(&self) -> ErrorClass {
        self.class
    }
}

/// Result alias for cycle operations.
pub type CycleResult<T> = Result<T, CycleError>;
