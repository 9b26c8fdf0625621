//! # Core Domain Entities
//!
//! Defines the entities shared across validator subsystems.
//!
//! ## Clusters
//!
//! - **Anchoring**: `AnchorClass`, `AnchorStatus`, `AnchorResult`, `Batch`
//! - **Intents**: `Intent`, `IntentPayload`
//! - **Chains**: `ChainPlatform`, `AttestationScheme`
//! - **Lifecycle**: `ProofState`

use crate::errors::TypeError;
use crate::hash::Hash32;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier for a validator in the network.
pub type ValidatorId = String;

// =============================================================================
// CLUSTER A: ANCHORING
// =============================================================================

/// Pricing/scheduling class of an anchor.
///
/// The wire form is strictly `"on_demand"` or `"on_cadence"`; any other
/// value is rejected wherever a class is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnchorClass {
    /// Single-request anchors, flushed immediately.
    #[serde(rename = "on_demand")]
    OnDemand,
    /// Periodic batched anchors (~15 min cadence).
    #[serde(rename = "on_cadence")]
    OnCadence,
}

impl AnchorClass {
    /// Canonical identifier as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            AnchorClass::OnDemand => "on_demand",
            AnchorClass::OnCadence => "on_cadence",
        }
    }
}

impl fmt::Display for AnchorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnchorClass {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on_demand" => Ok(AnchorClass::OnDemand),
            "on_cadence" => Ok(AnchorClass::OnCadence),
            other => Err(TypeError::InvalidProofClass(other.to_string())),
        }
    }
}

/// Status of an anchor submission on an external chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorStatus {
    /// Submitted, not yet finalized.
    Pending,
    /// Finalized successfully.
    Success,
    /// Reverted or dropped.
    Failed,
}

/// Outcome of submitting a batch (or proof step) on an external chain.
///
/// External-chain hashes keep their `0x` prefix and are carried as strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorResult {
    /// Transaction hash on the external chain.
    pub tx_hash: String,
    /// Block number of inclusion (0 while pending).
    pub block_number: u64,
    /// Block hash of inclusion.
    pub block_hash: String,
    /// Submission status.
    pub status: AnchorStatus,
    /// Confirmations observed at the time of the result.
    pub confirmations: u64,
    /// Gas consumed by the transaction.
    pub gas_used: u64,
}

/// One leaf of a sealed batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchLeaf {
    /// Proof the leaf belongs to.
    pub proof_id: String,
    /// Source-ledger transaction hash being anchored.
    pub tx_hash: String,
    /// Source-ledger account URL.
    pub account_url: String,
    /// Leaf hash as it enters the Merkle tree.
    pub leaf_hash: Hash32,
}

/// An ordered list of intents sharing a target chain and an anchor class.
///
/// A batch is sealed exactly once; membership and order never change after
/// seal, and the Merkle root depends on insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    /// Batch identifier.
    pub batch_id: String,
    /// Anchor class of every member.
    pub class: AnchorClass,
    /// Target chain name.
    pub target_chain: String,
    /// Ordered members.
    pub leaves: Vec<BatchLeaf>,
    /// Root of the ordered leaf hashes; set at seal time.
    pub merkle_root: Hash32,
    /// When the batch became due.
    pub scheduled_for: DateTime<Utc>,
    /// Whether the batch has been sealed.
    sealed: bool,
}

impl Batch {
    /// Create an open (unsealed) batch.
    pub fn open(
        batch_id: String,
        class: AnchorClass,
        target_chain: String,
        scheduled_for: DateTime<Utc>,
    ) -> Self {
        Self {
            batch_id,
            class,
            target_chain,
            leaves: Vec::new(),
            merkle_root: Hash32::ZERO,
            scheduled_for,
            sealed: false,
        }
    }

    /// Append a leaf. Fails once the batch is sealed.
    pub fn push(&mut self, leaf: BatchLeaf) -> Result<(), TypeError> {
        if self.sealed {
            return Err(TypeError::BatchSealed(self.batch_id.clone()));
        }
        self.leaves.push(leaf);
        Ok(())
    }

    /// Seal the batch with its computed Merkle root. Fails on a second seal.
    pub fn seal(&mut self, merkle_root: Hash32) -> Result<(), TypeError> {
        if self.sealed {
            return Err(TypeError::BatchSealed(self.batch_id.clone()));
        }
        self.merkle_root = merkle_root;
        self.sealed = true;
        Ok(())
    }

    /// Whether the batch has been sealed.
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }
}

// =============================================================================
// CLUSTER B: INTENTS
// =============================================================================

/// The canonical 4-blob payload an intent references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentPayload {
    /// Intent blob.
    pub intent: serde_json::Value,
    /// Cross-chain blob.
    pub cross_chain: serde_json::Value,
    /// Governance blob.
    pub governance: serde_json::Value,
    /// Replay-protection blob.
    pub replay: serde_json::Value,
}

/// A user declaration recorded on the source ledger.
///
/// Created by the user, immutable, owned by no validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    /// Deterministic identifier over the canonical 4-blob payload.
    pub operation_id: Hash32,
    /// Source-ledger account URL (`acc://...`).
    pub account_url: String,
    /// Source-ledger transaction hash.
    pub tx_hash: String,
    /// Referenced payload blobs.
    pub payload: IntentPayload,
    /// Ledger timestamp of the declaration.
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// CLUSTER C: CHAINS
// =============================================================================

/// Signature scheme used for validator attestations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttestationScheme {
    /// BLS12-381 with true signature aggregation.
    Bls12381,
    /// Ed25519 with list aggregation.
    Ed25519,
}

impl fmt::Display for AttestationScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttestationScheme::Bls12381 => f.write_str("bls12381"),
            AttestationScheme::Ed25519 => f.write_str("ed25519"),
        }
    }
}

/// Supported external chain platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChainPlatform {
    /// Ethereum-compatible chains (reference implementation).
    #[serde(rename = "evm")]
    Evm,
    /// CosmWasm chains.
    #[serde(rename = "cosmwasm")]
    CosmWasm,
    /// Solana.
    #[serde(rename = "solana")]
    Solana,
    /// Move-VM chains.
    #[serde(rename = "move")]
    Move,
    /// TON.
    #[serde(rename = "ton")]
    Ton,
    /// NEAR.
    #[serde(rename = "near")]
    Near,
}

impl ChainPlatform {
    /// Default attestation scheme for the platform.
    ///
    /// EVM anchors are attested with BLS; every other platform defaults to
    /// Ed25519.
    pub fn default_attestation_scheme(&self) -> AttestationScheme {
        match self {
            ChainPlatform::Evm => AttestationScheme::Bls12381,
            _ => AttestationScheme::Ed25519,
        }
    }

    /// Default confirmation depth for finality on the platform.
    ///
    /// EVM distinguishes mainnet (12) from testnets (2) by network name.
    pub fn default_required_confirmations(&self, network_name: &str) -> u64 {
        match self {
            ChainPlatform::Evm => {
                if network_name.eq_ignore_ascii_case("mainnet") {
                    12
                } else {
                    2
                }
            }
            ChainPlatform::CosmWasm => 2,
            ChainPlatform::Ton => 10,
            ChainPlatform::Solana => 32,
            ChainPlatform::Move | ChainPlatform::Near => 2,
        }
    }
}

impl ChainPlatform {
    /// Canonical identifier as it appears in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainPlatform::Evm => "evm",
            ChainPlatform::CosmWasm => "cosmwasm",
            ChainPlatform::Solana => "solana",
            ChainPlatform::Move => "move",
            ChainPlatform::Ton => "ton",
            ChainPlatform::Near => "near",
        }
    }
}

impl fmt::Display for ChainPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// CLUSTER D: LIFECYCLE
// =============================================================================

/// Proof lifecycle state.
///
/// Transitions follow a fixed table; `Failed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofState {
    /// Intent discovered, nothing scheduled yet.
    Pending,
    /// Assigned to a sealed batch.
    Batched,
    /// Batch anchored on the external chain.
    Anchored,
    /// Peer attestation quorum collected.
    Attested,
    /// Bundle integrity verified and written back.
    Verified,
    /// Terminal failure.
    Failed,
}

impl ProofState {
    /// Whether `self → next` is a legal transition.
    pub fn can_transition_to(&self, next: ProofState) -> bool {
        use ProofState::*;
        matches!(
            (self, next),
            (Pending, Batched)
                | (Batched, Anchored)
                | (Anchored, Attested)
                | (Attested, Verified)
                | (Pending, Failed)
                | (Batched, Failed)
                | (Anchored, Failed)
                | (Attested, Failed)
        )
    }

    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProofState::Verified | ProofState::Failed)
    }

    /// Canonical snake_case identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProofState::Pending => "pending",
            ProofState::Batched => "batched",
            ProofState::Anchored => "anchored",
            ProofState::Attested => "attested",
            ProofState::Verified => "verified",
            ProofState::Failed => "failed",
        }
    }
}

impl fmt::Display for ProofState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchor_class_wire_form_is_strict() {
        assert_eq!(AnchorClass::OnDemand.as_str(), "on_demand");
        assert_eq!("on_cadence".parse::<AnchorClass>().unwrap(), AnchorClass::OnCadence);
        assert!("fastest".parse::<AnchorClass>().is_err());
        assert!("ON_DEMAND".parse::<AnchorClass>().is_err());
    }

    #[test]
    fn platform_defaults() {
        assert_eq!(
            ChainPlatform::Evm.default_attestation_scheme(),
            AttestationScheme::Bls12381
        );
        assert_eq!(
            ChainPlatform::Solana.default_attestation_scheme(),
            AttestationScheme::Ed25519
        );
        assert_eq!(ChainPlatform::Evm.default_required_confirmations("mainnet"), 12);
        assert_eq!(ChainPlatform::Evm.default_required_confirmations("sepolia"), 2);
        assert_eq!(ChainPlatform::Ton.default_required_confirmations("mainnet"), 10);
        assert_eq!(ChainPlatform::Solana.default_required_confirmations("mainnet"), 32);
    }

    #[test]
    fn batch_seals_exactly_once() {
        let mut batch = Batch::open(
            "batch-1".into(),
            AnchorClass::OnDemand,
            "ethereum".into(),
            Utc::now(),
        );
        batch
            .push(BatchLeaf {
                proof_id: "P1".into(),
                tx_hash: "0xaa".into(),
                account_url: "acc://demo/1".into(),
                leaf_hash: Hash32::from_bytes([1u8; 32]),
            })
            .unwrap();
        batch.seal(Hash32::from_bytes([2u8; 32])).unwrap();
        assert!(batch.is_sealed());
        assert!(batch.seal(Hash32::from_bytes([3u8; 32])).is_err());
        assert!(batch
            .push(BatchLeaf {
                proof_id: "P2".into(),
                tx_hash: "0xbb".into(),
                account_url: "acc://demo/2".into(),
                leaf_hash: Hash32::from_bytes([4u8; 32]),
            })
            .is_err());
    }

    #[test]
    fn lifecycle_transition_table() {
        use ProofState::*;
        assert!(Pending.can_transition_to(Batched));
        assert!(Batched.can_transition_to(Anchored));
        assert!(Anchored.can_transition_to(Attested));
        assert!(Attested.can_transition_to(Verified));
        assert!(Anchored.can_transition_to(Failed));
        assert!(!Pending.can_transition_to(Anchored));
        assert!(!Verified.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Pending));
        assert!(Failed.is_terminal());
        assert!(Verified.is_terminal());
    }
}
