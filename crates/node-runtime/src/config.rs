//! Node configuration.
//!
//! Loaded from a TOML file, with a handful of environment overrides for
//! deployment (`CERTEN_DATABASE_URL`, `CERTEN_LISTEN_ADDR`,
//! `CERTEN_VALIDATOR_ID`).

use cv_02_chain_strategy::ChainStrategyConfig;
use cv_05_scheduler::SchedulerConfig;
use cv_06_orchestrator::{OrchestratorConfig, PeerConfig};
use serde::{Deserialize, Serialize};
use shared_types::AttestationScheme;
use std::path::Path;

/// Identity and keys of this validator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorSection {
    /// Validator id; must be a roster member.
    pub id: String,
    /// Ed25519 seed, hex (write-back and bundle signing).
    pub ed25519_seed_hex: String,
    /// BLS secret key, hex (EVM attestation), optional for Ed25519-only
    /// deployments.
    #[serde(default)]
    pub bls_secret_hex: Option<String>,
    /// secp256k1 secret, hex (EVM anchor transactions), optional for
    /// observe-only deployments.
    #[serde(default)]
    pub evm_secret_hex: Option<String>,
    /// Attestation scheme this validator runs.
    pub attestation_scheme: AttestationScheme,
    /// Address the peer API listens on.
    pub listen_addr: String,
}

/// One roster member as configured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterSection {
    /// Validator id.
    pub validator_id: String,
    /// Public key under the configured scheme, hex.
    pub public_key_hex: String,
    /// Voting weight.
    pub weight: u64,
}

/// Database settings. Absent URL runs the in-memory store (development).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSection {
    /// Postgres connection URL.
    #[serde(default)]
    pub url: Option<String>,
    /// Pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

fn default_max_connections() -> u32 {
    8
}

/// One configured chain, keyed by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSection {
    /// Chain name used by requests (`ethereum`, ...).
    pub name: String,
    /// Strategy configuration.
    #[serde(flatten)]
    pub strategy: ChainStrategyConfig,
}

/// Source-ledger connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceLedgerSection {
    /// Ledger JSON-RPC endpoint.
    pub rpc: String,
}

impl Default for SourceLedgerSection {
    fn default() -> Self {
        Self {
            rpc: "http://127.0.0.1:26660/v3".to_string(),
        }
    }
}

/// Full node configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Validator identity.
    pub validator: ValidatorSection,
    /// Validator roster, identical across the network.
    pub roster: Vec<RosterSection>,
    /// Peer validators (everyone but this node).
    #[serde(default)]
    pub peers: Vec<PeerConfig>,
    /// Configured chains.
    #[serde(default)]
    pub chains: Vec<ChainSection>,
    /// Database settings.
    #[serde(default)]
    pub database: DatabaseSection,
    /// Source-ledger connection.
    #[serde(default)]
    pub source_ledger: SourceLedgerSection,
    /// Scheduler settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Orchestrator settings.
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    /// Whether the registry rejects stub platforms at submit time.
    #[serde(default = "default_strict")]
    pub strict_chain_registry: bool,
}

fn default_strict() -> bool {
    true
}

impl NodeConfig {
    /// Load from a TOML file and apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let mut config: NodeConfig = toml::from_str(&raw)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("CERTEN_DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Ok(addr) = std::env::var("CERTEN_LISTEN_ADDR") {
            self.validator.listen_addr = addr;
        }
        if let Ok(id) = std::env::var("CERTEN_VALIDATOR_ID") {
            self.validator.id = id;
        }
    }

    /// Decode a 32-byte hex seed field.
    pub fn decode_seed(hex_str: &str) -> anyhow::Result<[u8; 32]> {
        let bytes = hex::decode(hex_str.trim())?;
        bytes
            .try_into()
            .map_err(|_| anyhow::anyhow!("seed must be exactly 32 bytes"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
strict_chain_registry = true

[validator]
id = "validator-1"
ed25519_seed_hex = "1111111111111111111111111111111111111111111111111111111111111111"
attestation_scheme = "ed25519"
listen_addr = "127.0.0.1:8081"

[[roster]]
validator_id = "validator-1"
public_key_hex = "aa"
weight = 1

[[peers]]
validator_id = "validator-2"
url = "http://peer-2:8081"

[[chains]]
name = "ethereum"
platform = "evm"
chain_id = 11155111
network_name = "sepolia"
rpc = "http://localhost:8545"
contract_address = "0x4242424242424242424242424242424242424242"
enabled = true

[database]
max_connections = 4

[scheduler]
batch_check_interval = 5
cadence_interval = 900
min_batch_size = 3
max_retries = 3
retry_delay = 30

[orchestrator]
observation_timeout = 1800
attestation_timeout = 300
write_back_timeout = 120

[orchestrator.write_back]
enabled = false

[orchestrator.partition_routing]
prefix_table = []
default_partition = "bvn1"
"#;

    #[test]
    fn parses_sample_config() {
        let config: NodeConfig = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.validator.id, "validator-1");
        assert_eq!(config.chains.len(), 1);
        assert_eq!(config.chains[0].name, "ethereum");
        assert_eq!(config.chains[0].strategy.chain_id, 11155111);
        assert!(config.strict_chain_registry);
        assert!(config.database.url.is_none());
        assert_eq!(config.scheduler.min_batch_size, 3);
        assert_eq!(
            config.orchestrator.partition_routing.default_partition,
            "bvn1"
        );
    }

    #[test]
    fn loads_from_file_with_env_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        std::env::set_var("CERTEN_VALIDATOR_ID", "validator-9");
        let config = NodeConfig::load(file.path()).unwrap();
        std::env::remove_var("CERTEN_VALIDATOR_ID");
        assert_eq!(config.validator.id, "validator-9");
    }

    #[test]
    fn seed_decoding_enforces_length() {
        assert!(NodeConfig::decode_seed(&"11".repeat(32)).is_ok());
        assert!(NodeConfig::decode_seed("11").is_err());
        assert!(NodeConfig::decode_seed("zz").is_err());
    }
}
