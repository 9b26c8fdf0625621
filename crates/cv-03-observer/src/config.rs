//! Observer configuration.

use std::time::Duration;

/// Polling configuration for one observed chain.
#[derive(Debug, Clone)]
pub struct ObserverConfig {
    /// How often to poll; defaults to the chain's block time.
    pub poll_interval: Duration,
    /// Hard deadline for a synchronous observation.
    pub timeout: Duration,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            // Ethereum block time.
            poll_interval: Duration::from_secs(12),
            timeout: Duration::from_secs(30 * 60),
        }
    }
}

impl ObserverConfig {
    /// Config with a chain-specific block time.
    pub fn with_block_time(block_time: Duration) -> Self {
        Self {
            poll_interval: block_time,
            ..Self::default()
        }
    }
}
