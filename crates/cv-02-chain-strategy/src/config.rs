//! Chain strategy configuration.

use serde::{Deserialize, Serialize};
use shared_types::{AttestationScheme, ChainPlatform};

/// Gas settings for chains that price execution in gas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasConfig {
    /// Gas limit per anchor transaction.
    pub gas_limit: u64,
    /// Fixed gas price in gwei; `None` asks the node.
    pub gas_price_gwei: Option<u64>,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            gas_limit: 500_000,
            gas_price_gwei: None,
        }
    }
}

/// Configuration of one chain backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainStrategyConfig {
    /// Chain platform.
    pub platform: ChainPlatform,
    /// Numeric chain id.
    pub chain_id: u64,
    /// Network name (`mainnet`, `sepolia`, ...).
    pub network_name: String,
    /// Primary RPC endpoint.
    pub rpc: String,
    /// Optional backup RPC endpoint.
    #[serde(default)]
    pub rpc_backup: Option<String>,
    /// Anchor contract address on the chain.
    pub contract_address: String,
    /// Confirmation depth override; `None` uses the platform default.
    #[serde(default)]
    pub required_confirmations: Option<u64>,
    /// Attestation scheme override; `None` uses the platform default.
    #[serde(default)]
    pub attestation_scheme: Option<AttestationScheme>,
    /// Opaque platform-specific settings.
    #[serde(default)]
    pub platform_config: Option<serde_json::Value>,
    /// Gas settings.
    #[serde(default)]
    pub gas_config: Option<GasConfig>,
    /// Whether this chain accepts work.
    pub enabled: bool,
}

impl ChainStrategyConfig {
    /// Confirmation depth, falling back to the platform default.
    pub fn effective_required_confirmations(&self) -> u64 {
        self.required_confirmations
            .unwrap_or_else(|| self.platform.default_required_confirmations(&self.network_name))
    }

    /// Attestation scheme, falling back to the platform default.
    pub fn effective_attestation_scheme(&self) -> AttestationScheme {
        self.attestation_scheme
            .unwrap_or_else(|| self.platform.default_attestation_scheme())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evm_config(network: &str) -> ChainStrategyConfig {
        ChainStrategyConfig {
            platform: ChainPlatform::Evm,
            chain_id: 1,
            network_name: network.into(),
            rpc: "http://localhost:8545".into(),
            rpc_backup: None,
            contract_address: format!("0x{}", "42".repeat(20)),
            required_confirmations: None,
            attestation_scheme: None,
            platform_config: None,
            gas_config: None,
            enabled: true,
        }
    }

    #[test]
    fn defaults_follow_platform() {
        assert_eq!(evm_config("mainnet").effective_required_confirmations(), 12);
        assert_eq!(evm_config("sepolia").effective_required_confirmations(), 2);
        assert_eq!(
            evm_config("mainnet").effective_attestation_scheme(),
            AttestationScheme::Bls12381
        );
    }

    #[test]
    fn overrides_win() {
        let mut config = evm_config("mainnet");
        config.required_confirmations = Some(6);
        config.attestation_scheme = Some(AttestationScheme::Ed25519);
        assert_eq!(config.effective_required_confirmations(), 6);
        assert_eq!(
            config.effective_attestation_scheme(),
            AttestationScheme::Ed25519
        );
    }

    #[test]
    fn parses_from_json() {
        let json = serde_json::json!({
            "platform": "evm",
            "chain_id": 11155111,
            "network_name": "sepolia",
            "rpc": "https://rpc.example",
            "contract_address": "0xabc",
            "enabled": true,
        });
        let config: ChainStrategyConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.platform, ChainPlatform::Evm);
        assert_eq!(config.effective_required_confirmations(), 2);
    }
}
