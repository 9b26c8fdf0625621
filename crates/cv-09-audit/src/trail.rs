//! Per-user audit trail.

use crate::error::{AuditError, AuditResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_crypto::canonical::canonical_json;
use shared_crypto::hashing::sha256_concat;
use shared_types::Hash32;

/// One audit record, keyed per end-user intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Position in the user's trail, starting at 0.
    pub sequence: u64,
    /// End user the entry belongs to.
    pub user_id: String,
    /// Intent the entry concerns.
    pub intent_id: String,
    /// What happened (`intent_discovered`, `batch_anchored`, ...).
    pub action: String,
    /// Structured details.
    pub details: serde_json::Value,
    /// When the entry was recorded.
    pub timestamp: DateTime<Utc>,
    /// Hash of the previous entry (zero for the first).
    pub previous_hash: Hash32,
    /// Hash of this entry.
    pub current_hash: Hash32,
}

fn entry_hash(
    previous_hash: &Hash32,
    action: &str,
    details: &serde_json::Value,
    timestamp: &DateTime<Utc>,
) -> AuditResult<Hash32> {
    let details_canon = canonical_json(details)?;
    Ok(sha256_concat(&[
        previous_hash.as_bytes(),
        action.as_bytes(),
        details_canon.as_bytes(),
        &timestamp.timestamp_micros().to_be_bytes(),
    ]))
}

/// Append-only audit log for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditTrail {
    /// Owner of the trail.
    pub user_id: String,
    entries: Vec<AuditEntry>,
}

impl AuditTrail {
    /// Empty trail for a user.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            entries: Vec::new(),
        }
    }

    /// Entries in order.
    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    /// Hash of the latest entry, or zero for an empty trail.
    pub fn head_hash(&self) -> Hash32 {
        self.entries
            .last()
            .map(|e| e.current_hash)
            .unwrap_or(Hash32::ZERO)
    }

    /// Append an entry, linking it to the current head.
    pub fn append(
        &mut self,
        intent_id: impl Into<String>,
        action: impl Into<String>,
        details: serde_json::Value,
    ) -> AuditResult<&AuditEntry> {
        let action = action.into();
        let timestamp = Utc::now();
        let previous_hash = self.head_hash();
        let current_hash = entry_hash(&previous_hash, &action, &details, &timestamp)?;
        self.entries.push(AuditEntry {
            sequence: self.entries.len() as u64,
            user_id: self.user_id.clone(),
            intent_id: intent_id.into(),
            action,
            details,
            timestamp,
            previous_hash,
            current_hash,
        });
        Ok(self.entries.last().expect("just pushed"))
    }

    /// Verify linkage and recompute every entry hash.
    pub fn verify(&self) -> AuditResult<()> {
        let mut expected_previous = Hash32::ZERO;
        for entry in &self.entries {
            if entry.previous_hash != expected_previous {
                return Err(AuditError::BrokenTrail {
                    sequence: entry.sequence,
                    reason: "previous hash does not match prior entry".into(),
                });
            }
            let recomputed =
                entry_hash(&entry.previous_hash, &entry.action, &entry.details, &entry.timestamp)?;
            if recomputed != entry.current_hash {
                return Err(AuditError::BrokenTrail {
                    sequence: entry.sequence,
                    reason: "entry hash mismatch".into(),
                });
            }
            expected_previous = entry.current_hash;
        }
        Ok(())
    }
}
