//! Scheduler errors.

use shared_types::{Classified, ErrorClass};
use thiserror::Error;

/// Anchor scheduling errors.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// No such request.
    #[error("Unknown request: {0}")]
    UnknownRequest(String),

    /// No such batch.
    #[error("Unknown batch: {0}")]
    UnknownBatch(String),

    /// A completed or failed batch was marked again.
    #[error("Batch {batch_id} already resolved as {status}")]
    BatchAlreadyResolved {
        /// The batch.
        batch_id: String,
        /// Its resolved status.
        status: String,
    },

    /// An illegal request state transition.
    #[error("Invalid request transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status.
        from: String,
        /// Requested status.
        to: String,
    },

    /// The chain registry refused the target chain.
    #[error(transparent)]
    Chain(#[from] cv_02_chain_strategy::StrategyError),

    /// The ready channel's consumer is gone.
    #[error("Ready channel closed")]
    ChannelClosed,

    /// Batch construction failure.
    #[error(transparent)]
    Batch(#[from] shared_types::TypeError),

    /// Hashing failure while sealing a batch.
    #[error(transparent)]
    Crypto(#[from] shared_crypto::CryptoError),
}

impl Classified for SchedulerError {
    fn class(&self) -> ErrorClass {
        match self {
            SchedulerError::Chain(e) => e.class(),
            SchedulerError::Crypto(e) => e.class(),
            SchedulerError::ChannelClosed => ErrorClass::TransientNetwork,
            _ => ErrorClass::Validation,
        }
    }
}

/// Result alias for scheduler operations.
pub type SchedulerResult<T> = Result<T, SchedulerError>;
