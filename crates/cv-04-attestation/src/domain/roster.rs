//! Validator roster.
//!
//! Aggregation indexes participants by roster position, so the roster order
//! must be identical across validators. Wiring sorts entries by validator id
//! before constructing a strategy.

use serde::{Deserialize, Serialize};
use shared_types::ValidatorId;

/// One roster member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// Validator identifier.
    pub validator_id: ValidatorId,
    /// Public key bytes under the roster's scheme (48 bytes BLS, 32 Ed25519).
    #[serde(with = "hex::serde")]
    pub public_key: Vec<u8>,
    /// Voting weight.
    pub weight: u64,
}

/// The ordered validator set aggregation runs against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorRoster {
    entries: Vec<RosterEntry>,
}

impl ValidatorRoster {
    /// Build a roster, sorting entries by validator id for a canonical order.
    pub fn new(mut entries: Vec<RosterEntry>) -> Self {
        entries.sort_by(|a, b| a.validator_id.cmp(&b.validator_id));
        Self { entries }
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the roster is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ordered members.
    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    /// Roster position of a validator.
    pub fn index_of(&self, validator_id: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.validator_id == validator_id)
    }

    /// Member by validator id.
    pub fn get(&self, validator_id: &str) -> Option<&RosterEntry> {
        self.entries.iter().find(|e| e.validator_id == validator_id)
    }

    /// Sum of all member weights.
    pub fn total_weight(&self) -> u64 {
        self.entries.iter().map(|e| e.weight).sum()
    }
}
