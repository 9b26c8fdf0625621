//! Lifecycle management service.

use crate::custody::CustodyChain;
use crate::error::{LifecycleError, LifecycleResult};
use cv_04_attestation::threshold_weight;
use parking_lot::Mutex;
use serde_json::json;
use shared_types::ProofState;
use std::collections::HashMap;
use tracing::info;

/// Lifecycle record of one proof.
#[derive(Debug, Clone)]
pub struct ProofLifecycle {
    /// Proof identifier.
    pub proof_id: String,
    /// Current state.
    pub state: ProofState,
    /// Custody chain journaling every transition.
    pub custody: CustodyChain,
    /// Phase the proof failed at, when failed.
    pub fail_phase: Option<u8>,
}

/// Tracks proof lifecycles and their custody chains.
#[derive(Default)]
pub struct LifecycleManager {
    proofs: Mutex<HashMap<String, ProofLifecycle>>,
}

impl LifecycleManager {
    /// Empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a proof in `pending`, journaling the creation event.
    pub fn register(&self, proof_id: impl Into<String>) -> LifecycleResult<()> {
        let proof_id = proof_id.into();
        let mut proofs = self.proofs.lock();
        if proofs.contains_key(&proof_id) {
            return Err(LifecycleError::AlreadyRegistered(proof_id));
        }
        let mut custody = CustodyChain::new(proof_id.clone());
        custody.append("created", json!({ "state": ProofState::Pending }))?;
        proofs.insert(
            proof_id.clone(),
            ProofLifecycle {
                proof_id,
                state: ProofState::Pending,
                custody,
                fail_phase: None,
            },
        );
        Ok(())
    }

    /// Transition a proof, validating against the fixed table and journaling
    /// a custody event.
    pub fn transition(
        &self,
        proof_id: &str,
        next: ProofState,
        details: serde_json::Value,
    ) -> LifecycleResult<()> {
        let mut proofs = self.proofs.lock();
        let lifecycle = proofs
            .get_mut(proof_id)
            .ok_or_else(|| LifecycleError::UnknownProof(proof_id.to_string()))?;
        if !lifecycle.state.can_transition_to(next) {
            return Err(LifecycleError::InvalidTransition {
                from: lifecycle.state,
                to: next,
            });
        }
        lifecycle.custody.append(
            "state_transition",
            json!({
                "from": lifecycle.state,
                "to": next,
                "details": details,
            }),
        )?;
        info!(proof_id, from = %lifecycle.state, to = %next, "proof transitioned");
        lifecycle.state = next;
        Ok(())
    }

    /// Mark a proof failed at a phase. Failure is terminal.
    pub fn mark_failed(
        &self,
        proof_id: &str,
        fail_phase: u8,
        reason: &str,
    ) -> LifecycleResult<()> {
        let mut proofs = self.proofs.lock();
        let lifecycle = proofs
            .get_mut(proof_id)
            .ok_or_else(|| LifecycleError::UnknownProof(proof_id.to_string()))?;
        if !lifecycle.state.can_transition_to(ProofState::Failed) {
            return Err(LifecycleError::InvalidTransition {
                from: lifecycle.state,
                to: ProofState::Failed,
            });
        }
        lifecycle.custody.append(
            "cycle_failed",
            json!({
                "from": lifecycle.state,
                "fail_phase": fail_phase,
                "reason": reason,
            }),
        )?;
        lifecycle.state = ProofState::Failed;
        lifecycle.fail_phase = Some(fail_phase);
        Ok(())
    }

    /// Current state of a proof.
    pub fn state(&self, proof_id: &str) -> Option<ProofState> {
        self.proofs.lock().get(proof_id).map(|p| p.state)
    }

    /// Snapshot of a proof's lifecycle, custody chain included.
    pub fn lifecycle(&self, proof_id: &str) -> Option<ProofLifecycle> {
        self.proofs.lock().get(proof_id).cloned()
    }

    /// Whether `valid_attestations` of `total_validators` meets the
    /// `ceil(2N/3) + 1` quorum.
    pub fn quorum_met(&self, valid_attestations: u64, total_validators: u64) -> bool {
        valid_attestations >= threshold_weight(total_validators)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_lifecycle_is_journaled() {
        let manager = LifecycleManager::new();
        manager.register("P1").unwrap();
        manager
            .transition("P1", ProofState::Batched, json!({"batch_id": "b1"}))
            .unwrap();
        manager
            .transition("P1", ProofState::Anchored, json!({"tx": "0xbbb"}))
            .unwrap();
        manager
            .transition("P1", ProofState::Attested, json!({"weight": 4}))
            .unwrap();
        manager
            .transition("P1", ProofState::Verified, json!({}))
            .unwrap();

        let lifecycle = manager.lifecycle("P1").unwrap();
        assert_eq!(lifecycle.state, ProofState::Verified);
        // created + four transitions
        assert_eq!(lifecycle.custody.events().len(), 5);
        assert!(lifecycle.custody.verify().is_ok());
    }

    #[test]
    fn invalid_transition_rejected() {
        let manager = LifecycleManager::new();
        manager.register("P1").unwrap();
        let err = manager
            .transition("P1", ProofState::Verified, json!({}))
            .unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidTransition { .. }));
    }

    #[test]
    fn failure_is_terminal_and_records_phase() {
        let manager = LifecycleManager::new();
        manager.register("P1").unwrap();
        manager
            .transition("P1", ProofState::Batched, json!({}))
            .unwrap();
        manager.mark_failed("P1", 7, "observation timed out").unwrap();

        let lifecycle = manager.lifecycle("P1").unwrap();
        assert_eq!(lifecycle.state, ProofState::Failed);
        assert_eq!(lifecycle.fail_phase, Some(7));
        assert!(manager
            .transition("P1", ProofState::Anchored, json!({}))
            .is_err());
    }

    #[test]
    fn duplicate_registration_rejected() {
        let manager = LifecycleManager::new();
        manager.register("P1").unwrap();
        assert!(matches!(
            manager.register("P1"),
            Err(LifecycleError::AlreadyRegistered(_))
        ));
    }

    #[test]
    fn quorum_boundaries() {
        let manager = LifecycleManager::new();
        // N=4 needs 4
        assert!(!manager.quorum_met(3, 4));
        assert!(manager.quorum_met(4, 4));
        // N=6 needs 5
        assert!(!manager.quorum_met(4, 6));
        assert!(manager.quorum_met(5, 6));
    }
}
