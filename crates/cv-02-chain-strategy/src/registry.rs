//! Chain registry.
//!
//! Maps chain names to strategies. The `strict` flag resolves an ambiguity
//! around stub platforms: strict registries reject work for chains whose
//! platform has no full strategy implementation up front; lenient registries
//! accept the work and let it fail terminally at write-back.

use crate::error::{StrategyError, StrategyResult};
use crate::strategy::ChainStrategy;
use shared_types::ChainPlatform;
use std::collections::HashMap;
use std::sync::Arc;

/// Platforms with a full strategy implementation.
const FULL_PLATFORMS: &[ChainPlatform] = &[ChainPlatform::Evm];

/// Registry of chain strategies, keyed by chain name.
pub struct ChainRegistry {
    strategies: HashMap<String, Arc<dyn ChainStrategy>>,
    strict: bool,
}

impl ChainRegistry {
    /// Create a registry. `strict` governs stub-platform handling.
    pub fn new(strict: bool) -> Self {
        Self {
            strategies: HashMap::new(),
            strict,
        }
    }

    /// Whether this registry rejects stub platforms up front.
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Whether a platform has a full strategy implementation.
    pub fn is_full_platform(platform: ChainPlatform) -> bool {
        FULL_PLATFORMS.contains(&platform)
    }

    /// Register a strategy under a chain name.
    pub fn register(&mut self, chain: impl Into<String>, strategy: Arc<dyn ChainStrategy>) {
        self.strategies.insert(chain.into(), strategy);
    }

    /// Registered chain names.
    pub fn chains(&self) -> Vec<String> {
        self.strategies.keys().cloned().collect()
    }

    /// Look up a strategy.
    pub fn strategy_for(&self, chain: &str) -> StrategyResult<Arc<dyn ChainStrategy>> {
        self.strategies
            .get(chain)
            .cloned()
            .ok_or_else(|| StrategyError::UnsupportedChain {
                chain: chain.to_string(),
            })
    }

    /// Gate a submission for `chain`.
    ///
    /// Strict mode also rejects registered chains whose platform is a stub;
    /// lenient mode lets those submissions proceed to a terminal write-back
    /// failure.
    pub fn ensure_accepts(&self, chain: &str) -> StrategyResult<()> {
        let strategy = match self.strategies.get(chain) {
            Some(strategy) => strategy,
            None => {
                return Err(StrategyError::UnsupportedChain {
                    chain: chain.to_string(),
                })
            }
        };
        if self.strict && !Self::is_full_platform(strategy.platform()) {
            return Err(StrategyError::StubPlatform {
                chain: chain.to_string(),
                platform: strategy.platform().to_string(),
            });
        }
        Ok(())
    }
}
