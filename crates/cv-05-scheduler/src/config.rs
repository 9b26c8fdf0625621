//! Scheduler configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Scheduling knobs. Durations are serialized as whole seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// How often the background loop looks for due work.
    #[serde(with = "seconds")]
    pub batch_check_interval: Duration,
    /// Cadence for `on_cadence` batches.
    #[serde(with = "seconds")]
    pub cadence_interval: Duration,
    /// Minimum `on_cadence` batch size to trigger before the cadence elapses.
    pub min_batch_size: usize,
    /// Retry attempts before a request fails terminally.
    pub max_retries: u32,
    /// Fixed delay before a failed request becomes due again.
    #[serde(with = "seconds")]
    pub retry_delay: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            batch_check_interval: Duration::from_secs(5),
            cadence_interval: Duration::from_secs(15 * 60),
            min_batch_size: 3,
            max_retries: 3,
            retry_delay: Duration::from_secs(30),
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
    fn serializes_durations_as_seconds() {
        let config = SchedulerConfig::default();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["cadence_interval"], 900);
        let back: SchedulerConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);
    }
}
