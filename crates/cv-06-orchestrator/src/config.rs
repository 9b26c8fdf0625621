//! Orchestrator configuration.

use serde::{Deserialize, Serialize};
use shared_types::Hash32;
use std::time::Duration;

/// One peer validator endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerConfig {
    /// Peer validator id (checked against returned attestations).
    pub validator_id: String,
    /// Base URL of the peer's API.
    pub url: String,
}

/// Source-ledger write-back settings. Absence of a signer or principal
/// disables write-back without being an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteBackConfig {
    /// Whether phase 9 runs at all.
    pub enabled: bool,
    /// Principal account the synthetic transaction is addressed to.
    #[serde(default)]
    pub principal: Option<String>,
}

/// BVN partition routing policy for chained-proof construction.
///
/// Routing is policy configuration, not protocol: the first byte of the
/// operation id is matched against the prefix table, falling back to the
/// default partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionRouting {
    /// `(first_byte_upper_bound_exclusive, partition)` rows, checked in
    /// order.
    pub prefix_table: Vec<(u8, String)>,
    /// Partition used when no row matches.
    pub default_partition: String,
}

impl Default for PartitionRouting {
    fn default() -> Self {
        Self {
            prefix_table: Vec::new(),
            default_partition: "bvn1".to_string(),
        }
    }
}

impl PartitionRouting {
    /// Route an operation id to a partition.
    pub fn route(&self, operation_id: &Hash32) -> &str {
        let first = operation_id.0[0];
        for (bound, partition) in &self.prefix_table {
            if first < *bound {
                return partition;
            }
        }
        &self.default_partition
    }
}

/// Orchestrator knobs. Durations serialize as whole seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Phase-7 deadline.
    #[serde(with = "seconds")]
    pub observation_timeout: Duration,
    /// Phase-8 deadline.
    #[serde(with = "seconds")]
    pub attestation_timeout: Duration,
    /// Phase-9 deadline.
    #[serde(with = "seconds")]
    pub write_back_timeout: Duration,
    /// Write-back settings.
    pub write_back: WriteBackConfig,
    /// Partition routing policy.
    pub partition_routing: PartitionRouting,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            observation_timeout: Duration::from_secs(30 * 60),
            attestation_timeout: Duration::from_secs(5 * 60),
            write_back_timeout: Duration::from_secs(2 * 60),
            write_back: WriteBackConfig::default(),
            partition_routing: PartitionRouting::default(),
        }
    }
}

mod seconds {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeouts() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.observation_timeout.as_secs(), 1800);
        assert_eq!(config.attestation_timeout.as_secs(), 300);
        assert_eq!(config.write_back_timeout.as_secs(), 120);
    }

    #[test]
    fn partition_routing_falls_back_to_default() {
        let routing = PartitionRouting::default();
        assert_eq!(routing.route(&Hash32::from_bytes([0xff; 32])), "bvn1");

        let routed = PartitionRouting {
            prefix_table: vec![(0x40, "bvn1".into()), (0x80, "bvn2".into())],
            default_partition: "bvn3".into(),
        };
        assert_eq!(routed.route(&Hash32::from_bytes([0x10; 32])), "bvn1");
        assert_eq!(routed.route(&Hash32::from_bytes([0x7f; 32])), "bvn2");
        assert_eq!(routed.route(&Hash32::from_bytes([0xaa; 32])), "bvn3");
    }
}
