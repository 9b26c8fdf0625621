//! Chain strategy errors.

use cv_03_observer::ObserverError;
use shared_types::{Classified, ErrorClass};
use thiserror::Error;

/// Errors raised by chain strategies and the registry.
#[derive(Debug, Error)]
pub enum StrategyError {
    /// No strategy registered for the chain.
    #[error("Unsupported chain: {chain}")]
    UnsupportedChain {
        /// The requested chain name.
        chain: String,
    },

    /// The platform advertises the interface but has no full implementation.
    #[error("Chain {chain} targets stub platform {platform}")]
    StubPlatform {
        /// The requested chain name.
        chain: String,
        /// The stub platform.
        platform: String,
    },

    /// The strategy's configuration is unusable.
    #[error("Invalid chain configuration: {0}")]
    InvalidConfig(String),

    /// The chain is configured but disabled.
    #[error("Chain {chain} is disabled")]
    Disabled {
        /// The requested chain name.
        chain: String,
    },

    /// Transaction construction or signing failed.
    #[error("Transaction signing failed: {0}")]
    Signing(String),

    /// Underlying observation failure.
    #[error(transparent)]
    Observation(#[from] ObserverError),
}

impl Classified for StrategyError {
    fn class(&self) -> ErrorClass {
        match self {
            StrategyError::UnsupportedChain { .. }
            | StrategyError::StubPlatform { .. }
            | StrategyError::InvalidConfig(_)
            | StrategyError::Disabled { .. } => ErrorClass::Validation,
            StrategyError::Signing(_) => ErrorClass::Crypto,
            StrategyError::Observation(e) => e.class(),
        }
    }
}

/// Result alias for strategy operations.
pub type StrategyResult<T> = Result<T, StrategyError>;
