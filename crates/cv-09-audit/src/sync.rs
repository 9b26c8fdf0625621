//! Outward status snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_types::{Hash32, ProofState};

/// One outward status snapshot for an intent.
///
/// Snapshots for the same intent are hash-linked to each other, mirroring
/// the custody-chain discipline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSnapshot {
    /// Intent the snapshot describes.
    pub intent_id: String,
    /// Position in the intent's snapshot sequence.
    pub sequence: u64,
    /// Lifecycle phase at snapshot time.
    pub phase: ProofState,
    /// Structured status details.
    pub details: serde_json::Value,
    /// When the snapshot was taken.
    pub timestamp: DateTime<Utc>,
    /// Hash of the previous snapshot for this intent (zero for the first).
    pub previous_hash: Hash32,
    /// Hash of this snapshot.
    pub current_hash: Hash32,
}
