//! Hash-linked custody chain.
//!
//! Each event commits to its predecessor:
//! `current_hash = SHA256(previous_hash ‖ event_type ‖ canon(details) ‖ timestamp)`.
//! The first event links from the zero hash.

use crate::error::{LifecycleError, LifecycleResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_crypto::canonical::canonical_json;
use shared_crypto::hashing::sha256_concat;
use shared_types::Hash32;

/// One custody-chain entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustodyEvent {
    /// Position in the chain, starting at 0.
    pub sequence: u64,
    /// Event type (`created`, `state_transition`, `cycle_failed`, ...).
    pub event_type: String,
    /// Structured event details.
    pub details: serde_json::Value,
    /// When the event was journaled.
    pub timestamp: DateTime<Utc>,
    /// Hash of the previous event (zero for the first).
    pub previous_hash: Hash32,
    /// Hash of this event.
    pub current_hash: Hash32,
}

fn event_hash(
    previous_hash: &Hash32,
    event_type: &str,
    details: &serde_json::Value,
    timestamp: &DateTime<Utc>,
) -> LifecycleResult<Hash32> {
    let details_canon = canonical_json(details)?;
    Ok(sha256_concat(&[
        previous_hash.as_bytes(),
        event_type.as_bytes(),
        details_canon.as_bytes(),
        &timestamp.timestamp_micros().to_be_bytes(),
    ]))
}

/// Append-only, hash-linked event log for one proof.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustodyChain {
    /// Proof the chain belongs to.
    pub proof_id: String,
    events: Vec<CustodyEvent>,
}

impl CustodyChain {
    /// Empty chain for a proof.
    pub fn new(proof_id: impl Into<String>) -> Self {
        Self {
            proof_id: proof_id.into(),
            events: Vec::new(),
        }
    }

    /// Events in order.
    pub fn events(&self) -> &[CustodyEvent] {
        &self.events
    }

    /// Hash of the latest event, or zero for an empty chain.
    pub fn head_hash(&self) -> Hash32 {
        self.events
            .last()
            .map(|e| e.current_hash)
            .unwrap_or(Hash32::ZERO)
    }

    /// Append an event, linking it to the current head.
    pub fn append(
        &mut self,
        event_type: impl Into<String>,
        details: serde_json::Value,
    ) -> LifecycleResult<&CustodyEvent> {
        let event_type = event_type.into();
        let timestamp = Utc::now();
        let previous_hash = self.head_hash();
        let current_hash = event_hash(&previous_hash, &event_type, &details, &timestamp)?;
        self.events.push(CustodyEvent {
            sequence: self.events.len() as u64,
            event_type,
            details,
            timestamp,
            previous_hash,
            current_hash,
        });
        Ok(self.events.last().expect("just pushed"))
    }

    /// Verify linkage and recompute every event hash.
    pub fn verify(&self) -> LifecycleResult<()> {
        let mut expected_previous = Hash32::ZERO;
        for event in &self.events {
            if event.previous_hash != expected_previous {
                return Err(LifecycleError::BrokenChain {
                    sequence: event.sequence,
                    reason: "previous hash does not match prior event".into(),
                });
            }
            let recomputed = event_hash(
                &event.previous_hash,
                &event.event_type,
                &event.details,
                &event.timestamp,
            )?;
            if recomputed != event.current_hash {
                return Err(LifecycleError::BrokenChain {
                    sequence: event.sequence,
                    reason: "event hash mismatch".into(),
                });
            }
            expected_previous = event.current_hash;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_link_to_their_predecessor() {
        let mut chain = CustodyChain::new("P1");
        chain.append("created", serde_json::json!({})).unwrap();
        chain
            .append("state_transition", serde_json::json!({"to": "batched"}))
            .unwrap();
        chain
            .append("state_transition", serde_json::json!({"to": "anchored"}))
            .unwrap();

        let events = chain.events();
        assert_eq!(events[0].previous_hash, Hash32::ZERO);
        for pair in events.windows(2) {
            assert_eq!(pair[1].previous_hash, pair[0].current_hash);
        }
        assert!(chain.verify().is_ok());
        assert_eq!(chain.head_hash(), events[2].current_hash);
    }

    #[test]
    fn tampered_details_break_the_chain() {
        let mut chain = CustodyChain::new("P1");
        chain.append("created", serde_json::json!({})).unwrap();
        chain
            .append("state_transition", serde_json::json!({"to": "batched"}))
            .unwrap();
        chain.events[1].details = serde_json::json!({"to": "verified"});
        let err = chain.verify().unwrap_err();
        assert!(matches!(err, LifecycleError::BrokenChain { sequence: 1, .. }));
    }

    #[test]
    fn tampered_linkage_breaks_the_chain() {
        let mut chain = CustodyChain::new("P1");
        chain.append("created", serde_json::json!({})).unwrap();
        chain.append("batched", serde_json::json!({})).unwrap();
        chain.events[1].previous_hash = Hash32::from_bytes([9u8; 32]);
        assert!(chain.verify().is_err());
    }
}
