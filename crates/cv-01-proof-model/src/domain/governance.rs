//! Governance proof entities.
//!
//! Governance strength is layered: G0 proves inclusion and finality of the
//! anchor, G1 adds a weighted signer set drawn from a named key page, G2
//! binds the authorized operation to its observed outcome.

use serde::{Deserialize, Serialize};
use shared_types::Hash32;

/// Strength of a governance proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GovernanceLevel {
    /// Inclusion & finality only.
    G0,
    /// G0 plus key-page authority.
    G1,
    /// G1 plus outcome binding.
    G2,
}

impl GovernanceLevel {
    /// Numeric level (0-2).
    pub fn as_u8(&self) -> u8 {
        match self {
            GovernanceLevel::G0 => 0,
            GovernanceLevel::G1 => 1,
            GovernanceLevel::G2 => 2,
        }
    }

    /// Parse a numeric level.
    pub fn from_u8(level: u8) -> Option<Self> {
        match level {
            0 => Some(GovernanceLevel::G0),
            1 => Some(GovernanceLevel::G1),
            2 => Some(GovernanceLevel::G2),
            _ => None,
        }
    }
}

/// The key page a signer set is drawn from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPageRef {
    /// Key page URL on the source ledger.
    pub url: String,
    /// Page version the signatures were made against.
    pub version: u64,
}

/// One signer of a governance proof (G1+).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerEntry {
    /// Ed25519 public key, hex encoded.
    pub public_key: String,
    /// SHA-256 of the raw public key bytes, as registered on the key page.
    pub public_key_hash: Hash32,
    /// Ed25519 signature over `signed_hash`, hex encoded.
    pub signature: String,
    /// The hash this signer signed.
    pub signed_hash: Hash32,
    /// Voting weight of the key-page entry.
    pub weight: u64,
}

/// What kind of observed effect an outcome check compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    /// A token transfer.
    Transfer,
    /// An emitted event.
    Event,
    /// A storage slot value.
    StorageSlot,
}

/// One expected-vs-observed effect comparison (G2).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectCheck {
    /// Effect kind.
    pub kind: EffectKind,
    /// Expected effect payload.
    pub expected: serde_json::Value,
    /// Observed effect payload.
    pub observed: serde_json::Value,
}

/// Outcome binding of a G2 proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeBinding {
    /// Payload hash recomputed from the executed operation.
    pub payload_hash: Hash32,
    /// Payload hash the intent declared.
    pub expected_payload_hash: Hash32,
    /// Effect comparisons.
    pub effects: Vec<EffectCheck>,
    /// Block number the receipt is bound to.
    pub receipt_block_number: u64,
    /// Whether that block has reached finality.
    pub receipt_finalized: bool,
}

/// A governance proof at some level.
///
/// Fields beyond the proof's level are absent: a G0 proof carries no signer
/// set, a G1 proof carries no outcome binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceProof {
    /// Strength of this proof.
    pub level: GovernanceLevel,
    /// Whether the anchor underlying G0 reached finality.
    pub anchor_finalized: bool,
    /// Key page the signer set is drawn from (G1+).
    pub key_page: Option<KeyPageRef>,
    /// Weighted signer set (G1+).
    pub signers: Vec<SignerEntry>,
    /// Required accumulated weight (G1+).
    pub required_threshold: u64,
    /// Outcome binding (G2).
    pub outcome: Option<OutcomeBinding>,
}

impl GovernanceProof {
    /// A bare inclusion/finality proof.
    pub fn g0(anchor_finalized: bool) -> Self {
        Self {
            level: GovernanceLevel::G0,
            anchor_finalized,
            key_page: None,
            signers: Vec::new(),
            required_threshold: 0,
            outcome: None,
        }
    }

    /// Accumulated signer weight.
    pub fn total_weight(&self) -> u64 {
        self.signers.iter().map(|s| s.weight).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_ordered() {
        assert!(GovernanceLevel::G0 < GovernanceLevel::G1);
        assert!(GovernanceLevel::G1 < GovernanceLevel::G2);
        assert_eq!(GovernanceLevel::from_u8(2), Some(GovernanceLevel::G2));
        assert_eq!(GovernanceLevel::from_u8(3), None);
    }

    #[test]
    fn g0_carries_no_authority_fields() {
        let proof = GovernanceProof::g0(true);
        assert_eq!(proof.level, GovernanceLevel::G0);
        assert!(proof.signers.is_empty());
        assert!(proof.key_page.is_none());
        assert!(proof.outcome.is_none());
        assert_eq!(proof.total_weight(), 0);
    }
}
