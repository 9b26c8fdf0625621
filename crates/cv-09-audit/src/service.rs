//! Audit & sync service.

use crate::error::AuditResult;
use crate::sync::SyncSnapshot;
use crate::trail::{AuditEntry, AuditTrail};
use chrono::Utc;
use parking_lot::Mutex;
use shared_crypto::canonical::canonical_json;
use shared_crypto::hashing::sha256_concat;
use shared_types::{Hash32, ProofState};
use std::collections::HashMap;
use tokio::sync::broadcast;
use tracing::debug;

/// Maintains per-user audit trails and emits hash-linked sync snapshots.
pub struct AuditService {
    trails: Mutex<HashMap<String, AuditTrail>>,
    snapshots: Mutex<HashMap<String, Vec<SyncSnapshot>>>,
    sync_tx: broadcast::Sender<SyncSnapshot>,
}

impl Default for AuditService {
    fn default() -> Self {
        Self::new(64)
    }
}

impl AuditService {
    /// Service with the given sync channel capacity.
    pub fn new(sync_capacity: usize) -> Self {
        let (sync_tx, _) = broadcast::channel(sync_capacity);
        Self {
            trails: Mutex::new(HashMap::new()),
            snapshots: Mutex::new(HashMap::new()),
            sync_tx,
        }
    }

    /// Subscribe to outward snapshots.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncSnapshot> {
        self.sync_tx.subscribe()
    }

    /// Append an audit entry to a user's trail.
    pub fn record(
        &self,
        user_id: &str,
        intent_id: &str,
        action: &str,
        details: serde_json::Value,
    ) -> AuditResult<AuditEntry> {
        let mut trails = self.trails.lock();
        let trail = trails
            .entry(user_id.to_string())
            .or_insert_with(|| AuditTrail::new(user_id));
        let entry = trail.append(intent_id, action, details)?.clone();
        debug!(user_id, intent_id, action = %entry.action, "audit entry recorded");
        Ok(entry)
    }

    /// A user's trail, if any.
    pub fn trail(&self, user_id: &str) -> Option<AuditTrail> {
        self.trails.lock().get(user_id).cloned()
    }

    /// Emit a status snapshot for an intent's lifecycle phase.
    ///
    /// The snapshot is hash-linked to the previous snapshot for the same
    /// intent. Having no subscribers is not an error.
    pub fn emit_snapshot(
        &self,
        intent_id: &str,
        phase: ProofState,
        details: serde_json::Value,
    ) -> AuditResult<SyncSnapshot> {
        let mut snapshots = self.snapshots.lock();
        let history = snapshots.entry(intent_id.to_string()).or_default();
        let previous_hash = history
            .last()
            .map(|s| s.current_hash)
            .unwrap_or(Hash32::ZERO);
        let timestamp = Utc::now();
        let details_canon = canonical_json(&details)?;
        let current_hash = sha256_concat(&[
            previous_hash.as_bytes(),
            phase.as_str().as_bytes(),
            details_canon.as_bytes(),
            &timestamp.timestamp_micros().to_be_bytes(),
        ]);
        let snapshot = SyncSnapshot {
            intent_id: intent_id.to_string(),
            sequence: history.len() as u64,
            phase,
            details,
            timestamp,
            previous_hash,
            current_hash,
        };
        history.push(snapshot.clone());
        let _ = self.sync_tx.send(snapshot.clone());
        Ok(snapshot)
    }

    /// Snapshot history for an intent.
    pub fn snapshots(&self, intent_id: &str) -> Vec<SyncSnapshot> {
        self.snapshots
            .lock()
            .get(intent_id)
            .cloned()
            .unwrap_or_default()
    }
}
