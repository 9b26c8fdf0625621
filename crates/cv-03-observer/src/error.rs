//! Observer errors.

use shared_types::{Classified, ErrorClass};
use thiserror::Error;

/// External-chain observation errors.
///
/// `NotYetMined` and `NotYetFinalized` are retry-carrying non-errors: the
/// polling loop keeps waiting on them. Everything else aborts the
/// observation.
#[derive(Debug, Error)]
pub enum ObserverError {
    /// No receipt yet; the transaction has not been mined.
    #[error("Transaction {tx_hash} not yet mined")]
    NotYetMined {
        /// Transaction being observed.
        tx_hash: String,
    },

    /// Mined but below the required confirmation depth.
    #[error("Transaction {tx_hash} at {confirmations}/{required} confirmations")]
    NotYetFinalized {
        /// Transaction being observed.
        tx_hash: String,
        /// Confirmations observed so far.
        confirmations: u64,
        /// Confirmations required for finality.
        required: u64,
    },

    /// The transaction executed but reverted.
    #[error("Transaction {tx_hash} reverted on chain")]
    TransactionFailed {
        /// Transaction being observed.
        tx_hash: String,
    },

    /// RPC transport failure.
    #[error("RPC failure: {0}")]
    Rpc(String),

    /// The observation deadline elapsed.
    #[error("Observation of {tx_hash} timed out after {waited_secs}s")]
    Timeout {
        /// Transaction being observed.
        tx_hash: String,
        /// Seconds waited before giving up.
        waited_secs: u64,
    },

    /// A block the receipt references could not be fetched.
    #[error("Block {0} not available from RPC")]
    MissingBlock(u64),

    /// Trie reconstruction or proof extraction failed.
    #[error("Inclusion proof construction failed: {0}")]
    Proof(String),
}

impl ObserverError {
    /// Retry-carrying observations: keep polling.
    pub fn is_retry_carrying(&self) -> bool {
        matches!(
            self,
            ObserverError::NotYetMined { .. } | ObserverError::NotYetFinalized { .. }
        )
    }
}

impl Classified for ObserverError {
    fn class(&self) -> ErrorClass {
        match self {
            ObserverError::NotYetMined { .. }
            | ObserverError::NotYetFinalized { .. }
            | ObserverError::Rpc(_)
            | ObserverError::MissingBlock(_) => ErrorClass::TransientNetwork,
            ObserverError::Timeout { .. } => ErrorClass::Timeout,
            ObserverError::TransactionFailed { .. } => ErrorClass::Validation,
            ObserverError::Proof(_) => ErrorClass::Crypto,
        }
    }
}

/// Result alias for observer operations.
pub type ObserverResult<T> = Result<T, ObserverError>;
