//! The proof-cycle orchestrator.

use crate::config::{OrchestratorConfig, PeerConfig};
use crate::domain::{AttestationMessage, CycleOutcome, CycleRequest, IntentRef};
use crate::error::{CycleError, CycleResult};
use crate::materialize::{materialize_bundle, MaterializeInput};
use crate::ports::{PeerAttestationRequest, PeerClient, SourceLedger, SyntheticTransaction};
use chrono::Utc;
use cv_01_proof_model::{
    compute_operation_id, gzip_bundle, verify_anchor_binding, verify_bundle_integrity,
    AnchorBinding, AnchorReference, BundleAttestation, BundleComponents, BundleIntegrity,
    ChainedProof, GovernanceProof, MerkleInclusion, ProofBundle, ProofEntry, ProofLayer,
    BUNDLE_SCHEMA_VERSION,
};
use cv_02_chain_strategy::{ChainRegistry, ChainStrategy};
use cv_03_observer::ObservationResult;
use cv_04_attestation::{AggregatedAttestation, Attestation, AttestationStrategy};
use cv_05_scheduler::AnchorScheduler;
use cv_08_lifecycle::LifecycleManager;
use cv_09_audit::AuditService;
use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::Mutex;
use shared_crypto::canonical::canonical_sha256;
use shared_crypto::hashing::{merkle_path, sha256};
use shared_crypto::Ed25519KeyPair;
use shared_storage::{
    AggregatedAttestationRow, AttestationStore, ChainExecutionResultRow, CustodyEventRow,
    ExecutionStore, JournalStore, ProofStore, UnifiedAttestationRow,
};
use shared_types::{Classified, ErrorClass, Hash32, ProofState};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Callback fired when a cycle fails: `(cycle_id, fail_phase, reason)`.
pub type CycleFailedCallback = Box<dyn Fn(&str, u8, &str) + Send + Sync>;

/// Drives proof cycles end to end. One instance serves every cycle; cycles
/// are independent tasks and the active-cycle map is the single shared
/// point, guarded by a mutex with the orchestrator as its only writer.
pub struct ProofCycleOrchestrator<S, P, L> {
    config: OrchestratorConfig,
    validator_id: String,
    registry: Arc<ChainRegistry>,
    attestation: Arc<dyn AttestationStrategy>,
    signer: Ed25519KeyPair,
    peers: Vec<PeerConfig>,
    peer_client: Arc<P>,
    ledger: Arc<L>,
    store: Arc<S>,
    lifecycle: Arc<LifecycleManager>,
    audit: Arc<AuditService>,
    active_cycles: Mutex<HashMap<String, watch::Sender<bool>>>,
    on_cycle_failed: Mutex<Vec<CycleFailedCallback>>,
}

impl<S, P, L> ProofCycleOrchestrator<S, P, L>
where
    S: ProofStore + AttestationStore + ExecutionStore + JournalStore + 'static,
    P: PeerClient + 'static,
    L: SourceLedger + 'static,
{
    /// Wire up an orchestrator.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: OrchestratorConfig,
        validator_id: impl Into<String>,
        registry: Arc<ChainRegistry>,
        attestation: Arc<dyn AttestationStrategy>,
        signer: Ed25519KeyPair,
        peers: Vec<PeerConfig>,
        peer_client: Arc<P>,
        ledger: Arc<L>,
        store: Arc<S>,
        lifecycle: Arc<LifecycleManager>,
        audit: Arc<AuditService>,
    ) -> Self {
        Self {
            config,
            validator_id: validator_id.into(),
            registry,
            attestation,
            signer,
            peers,
            peer_client,
            ledger,
            store,
            lifecycle,
            audit,
            active_cycles: Mutex::new(HashMap::new()),
            on_cycle_failed: Mutex::new(Vec::new()),
        }
    }

    /// Register a failure callback.
    pub fn on_cycle_failed(&self, callback: CycleFailedCallback) {
        self.on_cycle_failed.lock().push(callback);
    }

    /// Cancel a running cycle. Its current phase fails with a timeout-class
    /// error; partial writes stay in place and a re-run is a new cycle.
    pub fn cancel_cycle(&self, cycle_id: &str) {
        if let Some(sender) = self.active_cycles.lock().get(cycle_id) {
            let _ = sender.send(true);
        }
    }

    /// Number of cycles currently running.
    pub fn active_cycle_count(&self) -> usize {
        self.active_cycles.lock().len()
    }

    /// Process one batch from the scheduler's ready channel: mark it
    /// processing, create the anchor, run the cycle, and resolve the batch.
    pub async fn process_batch(
        &self,
        scheduler: &AnchorScheduler,
        batch: shared_types::Batch,
        intent: IntentRef,
    ) -> CycleResult<CycleOutcome> {
        scheduler
            .mark_batch_processing(&batch.batch_id)
            .map_err(|e| CycleError::setup(e.to_string()))?;

        let strategy = self
            .registry
            .strategy_for(&batch.target_chain)
            .map_err(|e| {
                let _ = scheduler.mark_batch_failed(&batch.batch_id, e.to_string());
                CycleError::setup(e.to_string())
            })?;

        let anchor = match strategy
            .create_anchor(&cv_02_chain_strategy::CreateAnchorRequest {
                batch_id: batch.batch_id.clone(),
                merkle_root: batch.merkle_root,
                class: batch.class,
            })
            .await
        {
            Ok(anchor) => anchor,
            Err(e) => {
                let _ = scheduler.mark_batch_failed(&batch.batch_id, e.to_string());
                return Err(CycleError::phase(7, e.class(), e.to_string()));
            }
        };

        let batch_id = batch.batch_id.clone();
        match self.run_cycle(CycleRequest { batch, anchor, intent }).await {
            Ok(outcome) => {
                if let Err(e) = scheduler.mark_batch_completed(
                    &batch_id,
                    outcome.anchor_tx_hash.clone(),
                    outcome.anchor_block_number,
                ) {
                    warn!(batch_id, error = %e, "batch completion mark failed");
                }
                Ok(outcome)
            }
            Err(e) => {
                let _ = scheduler.mark_batch_failed(&batch_id, e.to_string());
                Err(e)
            }
        }
    }

    /// Run one full proof cycle.
    pub async fn run_cycle(&self, request: CycleRequest) -> CycleResult<CycleOutcome> {
        let cycle_id = Uuid::new_v4().to_string();
        let (cancel_tx, cancel_rx) = watch::channel(false);
        self.active_cycles
            .lock()
            .insert(cycle_id.clone(), cancel_tx);

        let result = self.run_cycle_inner(&cycle_id, request, cancel_rx).await;
        self.active_cycles.lock().remove(&cycle_id);
        result
    }

    async fn run_cycle_inner(
        &self,
        cycle_id: &str,
        request: CycleRequest,
        mut cancel: watch::Receiver<bool>,
    ) -> CycleResult<CycleOutcome> {
        // Identifiers: the operation id is deterministic over the intent,
        // the proof id is minted per cycle.
        let operation_id = compute_operation_id(
            &request.intent.tx_hash,
            &request.intent.account_url,
            request.intent.block_number,
            request.intent.timestamp,
        )
        .map_err(|e| CycleError::setup(e.to_string()))?;
        let proof_id = format!("proof-{}", Uuid::new_v4());
        let bundle_id = format!("bundle-{}", Uuid::new_v4());
        let intent_key = operation_id.to_hex();

        let strategy = self
            .registry
            .strategy_for(&request.batch.target_chain)
            .map_err(|e| CycleError::setup(e.to_string()))?;
        if strategy.config().effective_attestation_scheme() != self.attestation.scheme() {
            return Err(CycleError::setup(format!(
                "chain {} expects {} attestations, orchestrator runs {}",
                request.batch.target_chain,
                strategy.config().effective_attestation_scheme(),
                self.attestation.scheme()
            )));
        }

        self.lifecycle
            .register(&proof_id)
            .map_err(|e| CycleError::setup(e.to_string()))?;
        self.lifecycle
            .transition(
                &proof_id,
                ProofState::Batched,
                serde_json::json!({ "batch_id": request.batch.batch_id, "cycle_id": cycle_id }),
            )
            .map_err(|e| CycleError::setup(e.to_string()))?;
        self.audit_event(
            &request.intent.user_id,
            &intent_key,
            "cycle_started",
            serde_json::json!({ "cycle_id": cycle_id, "batch_id": request.batch.batch_id }),
        );
        self.snapshot(&intent_key, ProofState::Batched, serde_json::json!({}));

        info!(
            cycle_id,
            proof_id,
            batch_id = %request.batch.batch_id,
            chain = %request.batch.target_chain,
            "proof cycle started"
        );

        // ---------------------------------------------------------------
        // Phase 7: observation
        // ---------------------------------------------------------------
        let observation = match self
            .phase7_observe(cycle_id, &proof_id, &request, strategy.as_ref(), &mut cancel)
            .await
        {
            Ok(observation) => observation,
            Err(e) => return Err(self.fail_cycle(cycle_id, &proof_id, &intent_key, e)),
        };

        // Bind the batch root to the finalized anchor transaction and
        // journal the signed binding with the transition.
        let binding = match AnchorBinding::sign(
            &self.signer,
            request.batch.merkle_root,
            observation.tx_hash.clone(),
            observation.block_number,
            strategy.chain_id(),
        ) {
            Ok(binding) => binding,
            Err(e) => {
                return Err(self.fail_cycle(
                    cycle_id,
                    &proof_id,
                    &intent_key,
                    CycleError::phase(7, ErrorClass::Crypto, e.to_string()),
                ))
            }
        };
        if let Err(e) = verify_anchor_binding(&binding) {
            return Err(self.fail_cycle(
                cycle_id,
                &proof_id,
                &intent_key,
                CycleError::phase(7, ErrorClass::Crypto, e.to_string()),
            ));
        }

        if let Err(e) = self.lifecycle.transition(
            &proof_id,
            ProofState::Anchored,
            serde_json::json!({
                "anchor_tx": observation.tx_hash,
                "block_number": observation.block_number,
                "anchor_binding": binding,
            }),
        ) {
            return Err(self.fail_cycle(
                cycle_id,
                &proof_id,
                &intent_key,
                CycleError::phase(7, ErrorClass::Persistence, e.to_string()),
            ));
        }
        self.snapshot(
            &intent_key,
            ProofState::Anchored,
            serde_json::json!({ "anchor_tx": observation.tx_hash }),
        );

        // ---------------------------------------------------------------
        // Phase 8: attestation
        // ---------------------------------------------------------------
        let (message, collected, aggregated) = match self
            .phase8_attest(
                cycle_id,
                &bundle_id,
                operation_id,
                &request,
                &observation,
                strategy.chain_id(),
                &mut cancel,
            )
            .await
        {
            Ok(result) => result,
            Err(e) => return Err(self.fail_cycle(cycle_id, &proof_id, &intent_key, e)),
        };
        if let Err(e) = self.lifecycle.transition(
            &proof_id,
            ProofState::Attested,
            serde_json::json!({
                "achieved_weight": aggregated.achieved_weight,
                "required_weight": aggregated.required_weight,
            }),
        ) {
            return Err(self.fail_cycle(
                cycle_id,
                &proof_id,
                &intent_key,
                CycleError::phase(8, ErrorClass::Persistence, e.to_string()),
            ));
        }
        self.snapshot(
            &intent_key,
            ProofState::Attested,
            serde_json::json!({ "participants": aggregated.participant_ids }),
        );

        // ---------------------------------------------------------------
        // Bundle assembly
        // ---------------------------------------------------------------
        let partition = self
            .config
            .partition_routing
            .route(&operation_id)
            .to_string();
        let chained = self
            .ledger
            .chained_proof(&request.intent.account_url, &request.intent.tx_hash, &partition)
            .await;
        let chained_error = chained.as_ref().err().cloned();
        if let Some(reason) = &chained_error {
            warn!(cycle_id, reason, "chained proof unavailable");
        }
        let governance = match self.ledger.governance_proof(&operation_id).await {
            Ok(proof) => proof,
            Err(reason) => {
                warn!(cycle_id, reason, "governance proof unavailable, keeping G0");
                GovernanceProof::g0(true)
            }
        };

        let bundle = match self.assemble_bundle(
            &request,
            &observation,
            strategy.as_ref(),
            chained.unwrap_or_else(|_| empty_chained_proof()),
            governance,
            &message,
            &collected,
            &proof_id,
        ) {
            Ok(bundle) => bundle,
            Err(e) => return Err(self.fail_cycle(cycle_id, &proof_id, &intent_key, e)),
        };
        if let Err(e) = verify_bundle_integrity(&bundle) {
            return Err(self.fail_cycle(
                cycle_id,
                &proof_id,
                &intent_key,
                CycleError::phase(8, ErrorClass::Crypto, e.to_string()),
            ));
        }
        let bundle_gzip = match gzip_bundle(&bundle) {
            Ok(bytes) => bytes,
            Err(e) => {
                return Err(self.fail_cycle(
                    cycle_id,
                    &proof_id,
                    &intent_key,
                    CycleError::phase(8, ErrorClass::Validation, e.to_string()),
                ))
            }
        };
        let bundle_sha256 = sha256(&bundle_gzip);

        // ---------------------------------------------------------------
        // Phase 9: write-back
        // ---------------------------------------------------------------
        let write_back_tx = match self
            .phase9_write_back(cycle_id, &bundle_id, bundle_sha256, &aggregated, &mut cancel)
            .await
        {
            Ok(tx) => tx,
            Err(e) => {
                // Materialize what we have before surfacing the failure.
                self.materialize(
                    cycle_id,
                    &proof_id,
                    operation_id,
                    &bundle_id,
                    &request,
                    &bundle,
                    bundle_gzip.clone(),
                    bundle_sha256,
                    chained_error.clone(),
                    "failed",
                    Some(e.phase),
                )
                .await;
                return Err(self.fail_cycle(cycle_id, &proof_id, &intent_key, e));
            }
        };

        if let Err(e) = self
            .lifecycle
            .transition(&proof_id, ProofState::Verified, serde_json::json!({}))
        {
            return Err(self.fail_cycle(
                cycle_id,
                &proof_id,
                &intent_key,
                CycleError::phase(9, ErrorClass::Persistence, e.to_string()),
            ));
        }
        self.snapshot(&intent_key, ProofState::Verified, serde_json::json!({}));
        self.audit_event(
            &request.intent.user_id,
            &intent_key,
            "cycle_verified",
            serde_json::json!({ "cycle_id": cycle_id, "bundle_id": bundle_id }),
        );

        self.materialize(
            cycle_id,
            &proof_id,
            operation_id,
            &bundle_id,
            &request,
            &bundle,
            bundle_gzip,
            bundle_sha256,
            chained_error,
            "verified",
            None,
        )
        .await;
        self.persist_custody(&proof_id).await;

        info!(cycle_id, proof_id, bundle_id, "proof cycle completed");
        Ok(CycleOutcome {
            cycle_id: cycle_id.to_string(),
            proof_id,
            operation_id,
            bundle_id,
            artifact_hash: bundle.integrity.artifact_hash,
            anchor_tx_hash: observation.tx_hash.clone(),
            anchor_block_number: observation.block_number,
            aggregated,
            write_back_tx,
        })
    }

    async fn phase7_observe(
        &self,
        cycle_id: &str,
        proof_id: &str,
        request: &CycleRequest,
        strategy: &dyn ChainStrategy,
        cancel: &mut watch::Receiver<bool>,
    ) -> CycleResult<ObservationResult> {
        let tx_hash = request.anchor.tx_hash.clone();
        let observation = tokio::select! {
            result = tokio::time::timeout(
                self.config.observation_timeout,
                strategy.observe_transaction(&tx_hash),
            ) => match result {
                Ok(Ok(observation)) => observation,
                Ok(Err(e)) => return Err(CycleError::phase(7, e.class(), e.to_string())),
                Err(_) => return Err(CycleError::timeout(7, "observation deadline exceeded")),
            },
            _ = cancel.changed() => {
                return Err(CycleError::phase(7, ErrorClass::Timeout, "cycle cancelled"));
            }
        };

        if observation.confirmations < observation.required_confirmations || !observation.success {
            return Err(CycleError::phase(
                7,
                ErrorClass::TransientNetwork,
                format!(
                    "anchor {} not finalized ({}/{} confirmations)",
                    tx_hash, observation.confirmations, observation.required_confirmations
                ),
            ));
        }

        // Observations persist as chain_execution_results with workflow
        // step 1. This is primary state: a failed write fails the cycle.
        self.store
            .insert_execution_result(ChainExecutionResultRow {
                id: Uuid::new_v4().to_string(),
                cycle_id: cycle_id.to_string(),
                proof_id: proof_id.to_string(),
                tx_hash: observation.tx_hash.clone(),
                target_chain: request.batch.target_chain.clone(),
                workflow_step: 1,
                block_number: observation.block_number as i64,
                confirmations: observation.confirmations as i64,
                success: observation.success,
                observation: serde_json::to_value(&observation)
                    .unwrap_or_else(|_| serde_json::json!({})),
                created_at: Utc::now(),
            })
            .await
            .map_err(|e| CycleError::phase(7, ErrorClass::Persistence, e.to_string()))?;

        Ok(observation)
    }

    #[allow(clippy::too_many_arguments)]
    async fn phase8_attest(
        &self,
        cycle_id: &str,
        bundle_id: &str,
        operation_id: Hash32,
        request: &CycleRequest,
        observation: &ObservationResult,
        chain_id: u64,
        cancel: &mut watch::Receiver<bool>,
    ) -> CycleResult<(AttestationMessage, Vec<Attestation>, AggregatedAttestation)> {
        let result_hash = canonical_sha256(observation)
            .map_err(|e| CycleError::phase(8, ErrorClass::Validation, e.to_string()))?;
        let message = AttestationMessage {
            intent_id: operation_id,
            result_hash,
            anchor_tx_hash: observation.tx_hash.clone(),
            block_number: observation.block_number,
            target_chain: request.batch.target_chain.clone(),
            chain_id,
            timestamp: Utc::now(),
            cycle_id: cycle_id.to_string(),
            bundle_id: bundle_id.to_string(),
            merkle_root: request.batch.merkle_root,
        };
        let signing_bytes = message
            .signing_bytes()
            .map_err(|e| CycleError::phase(8, ErrorClass::Validation, e.to_string()))?;
        let expected_hash = sha256(&signing_bytes);

        let local = self
            .attestation
            .sign(&signing_bytes)
            .map_err(|e| CycleError::phase(8, ErrorClass::Crypto, e.to_string()))?;
        let mut collected = vec![local];

        let peer_request = PeerAttestationRequest {
            cycle_id: cycle_id.to_string(),
            message: message.clone(),
            scheme: self.attestation.scheme(),
            requesting_validator: self.validator_id.clone(),
            requested_at: Utc::now(),
        };

        // Parallel fan-out under the phase deadline; late responses are
        // discarded with the deadline.
        let mut in_flight: FuturesUnordered<_> = self
            .peers
            .iter()
            .map(|peer| {
                let peer = peer.clone();
                let peer_request = peer_request.clone();
                let client = self.peer_client.clone();
                async move {
                    let response = client.request_attestation(&peer, &peer_request).await;
                    (peer, response)
                }
            })
            .collect();

        let deadline = tokio::time::sleep(self.config.attestation_timeout);
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                _ = &mut deadline => {
                    warn!(cycle_id, "attestation deadline reached, discarding late peers");
                    break;
                }
                _ = cancel.changed() => {
                    return Err(CycleError::phase(8, ErrorClass::Timeout, "cycle cancelled"));
                }
                next = in_flight.next() => {
                    let Some((peer, response)) = next else { break };
                    match response {
                        Ok(response) if response.success => {
                            match response.attestation {
                                Some(attestation)
                                    if attestation.validator_id == peer.validator_id
                                        && attestation.message_hash == expected_hash
                                        && self.attestation.verify(&attestation) =>
                                {
                                    collected.push(attestation);
                                }
                                Some(_) => warn!(
                                    cycle_id,
                                    peer = %peer.validator_id,
                                    "peer attestation failed verification, discarded"
                                ),
                                None => warn!(
                                    cycle_id,
                                    peer = %peer.validator_id,
                                    "peer claimed success without attestation"
                                ),
                            }
                        }
                        Ok(response) => warn!(
                            cycle_id,
                            peer = %peer.validator_id,
                            error = response.error.as_deref().unwrap_or("unspecified"),
                            "peer declined attestation"
                        ),
                        Err(reason) => warn!(
                            cycle_id,
                            peer = %peer.validator_id,
                            reason,
                            "peer unreachable"
                        ),
                    }
                }
            }
        }

        let aggregated = self
            .attestation
            .aggregate(&collected)
            .map_err(|e| CycleError::phase(8, ErrorClass::Crypto, e.to_string()))?;
        let verified = self.attestation.verify_aggregated(&aggregated);

        // Persist individual attestations and the aggregate before the
        // threshold decision so a failed quorum still leaves evidence.
        for attestation in &collected {
            self.store
                .insert_unified_attestation(UnifiedAttestationRow {
                    id: Uuid::new_v4().to_string(),
                    cycle_id: cycle_id.to_string(),
                    validator_id: attestation.validator_id.clone(),
                    message_hash: attestation.message_hash.as_bytes().to_vec(),
                    public_key: attestation.public_key.clone(),
                    signature: attestation.signature.clone(),
                    scheme: attestation.scheme.to_string(),
                    weight: attestation.weight as i64,
                    created_at: attestation.timestamp,
                })
                .await
                .map_err(|e| CycleError::phase(8, ErrorClass::Persistence, e.to_string()))?;
        }
        self.store
            .insert_aggregated_attestation(AggregatedAttestationRow {
                id: Uuid::new_v4().to_string(),
                cycle_id: cycle_id.to_string(),
                message_hash: aggregated.message_hash.as_bytes().to_vec(),
                scheme: aggregated.scheme.to_string(),
                aggregate_signature: aggregated.aggregate_signature.clone(),
                aggregate_public_key: aggregated.aggregate_public_key.clone(),
                signatures: serde_json::to_value(&aggregated.signatures)
                    .unwrap_or_else(|_| serde_json::json!([])),
                participants: aggregated.participants.clone().into_vec(),
                participant_ids: serde_json::to_value(&aggregated.participant_ids)
                    .unwrap_or_else(|_| serde_json::json!([])),
                achieved_weight: aggregated.achieved_weight as i64,
                required_weight: aggregated.required_weight as i64,
                threshold_met: aggregated.threshold_met,
                verified,
                created_at: aggregated.timestamp,
            })
            .await
            .map_err(|e| CycleError::phase(8, ErrorClass::Persistence, e.to_string()))?;

        if !aggregated.threshold_met {
            return Err(CycleError::phase(
                8,
                ErrorClass::Crypto,
                format!(
                    "threshold not met: {}/{} weight",
                    aggregated.achieved_weight, aggregated.required_weight
                ),
            ));
        }
        if !verified {
            return Err(CycleError::phase(
                8,
                ErrorClass::Crypto,
                "aggregate signature failed verification",
            ));
        }

        Ok((message, collected, aggregated))
    }

    async fn phase9_write_back(
        &self,
        cycle_id: &str,
        bundle_id: &str,
        bundle_sha256: Hash32,
        aggregated: &AggregatedAttestation,
        cancel: &mut watch::Receiver<bool>,
    ) -> CycleResult<Option<String>> {
        if !self.config.write_back.enabled {
            return Ok(None);
        }
        // Absence of a configured principal is not an error.
        let Some(principal) = self.config.write_back.principal.clone() else {
            info!(cycle_id, "write-back enabled but no principal configured, skipping");
            return Ok(None);
        };

        let aggregate_signature = if aggregated.aggregate_signature.is_empty() {
            serde_json::to_string(&aggregated.signatures)
                .map(|s| hex::encode(s.as_bytes()))
                .unwrap_or_default()
        } else {
            hex::encode(&aggregated.aggregate_signature)
        };
        let tx = SyntheticTransaction {
            principal,
            bundle_id: bundle_id.to_string(),
            bundle_hash: bundle_sha256,
            aggregate_signature,
            validator_signature: hex::encode(
                self.signer.sign(bundle_sha256.as_bytes()).as_bytes(),
            ),
            validator_id: self.validator_id.clone(),
        };

        tokio::select! {
            result = tokio::time::timeout(
                self.config.write_back_timeout,
                self.ledger.submit_synthetic_transaction(&tx),
            ) => match result {
                Ok(Ok(tx_hash)) => {
                    info!(cycle_id, tx_hash, "write-back submitted");
                    Ok(Some(tx_hash))
                }
                Ok(Err(reason)) => Err(CycleError::phase(
                    9,
                    ErrorClass::TransientNetwork,
                    format!("write-back rejected: {reason}"),
                )),
                Err(_) => Err(CycleError::timeout(9, "write-back deadline exceeded")),
            },
            _ = cancel.changed() => {
                Err(CycleError::phase(9, ErrorClass::Timeout, "cycle cancelled"))
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble_bundle(
        &self,
        request: &CycleRequest,
        observation: &ObservationResult,
        strategy: &dyn ChainStrategy,
        chained: ChainedProof,
        governance: GovernanceProof,
        message: &AttestationMessage,
        collected: &[Attestation],
        proof_id: &str,
    ) -> CycleResult<ProofBundle> {
        let leaves: Vec<Hash32> = request.batch.leaves.iter().map(|l| l.leaf_hash).collect();
        let leaf_index = request
            .batch
            .leaves
            .iter()
            .position(|l| l.tx_hash == request.intent.tx_hash)
            .ok_or_else(|| {
                CycleError::phase(8, ErrorClass::Validation, "intent not in batch")
            })?;
        let path = merkle_path(&leaves, leaf_index).ok_or_else(|| {
            CycleError::phase(8, ErrorClass::Validation, "merkle path unavailable")
        })?;

        let components = BundleComponents {
            merkle_inclusion: MerkleInclusion {
                leaf_hash: leaves[leaf_index],
                leaf_index: leaf_index as u64,
                path: path
                    .into_iter()
                    .map(|(hash, right)| ProofEntry { hash, right })
                    .collect(),
                root: request.batch.merkle_root,
            },
            anchor_reference: AnchorReference {
                tx_hash: observation.tx_hash.clone(),
                block_number: observation.block_number,
                block_hash: observation.block_hash.clone(),
                chain_id: strategy.chain_id(),
                target_chain: request.batch.target_chain.clone(),
                confirmations: observation.confirmations,
                finalized: observation.confirmations >= observation.required_confirmations,
            },
            chained_proof: chained,
            governance_proof: governance,
        };

        let artifact_hash = canonical_sha256(&components)
            .map_err(|e| CycleError::phase(8, ErrorClass::Validation, e.to_string()))?;
        let custody_chain_hash = self
            .lifecycle
            .lifecycle(proof_id)
            .map(|l| l.custody.head_hash())
            .unwrap_or(Hash32::ZERO);

        debug_assert_eq!(components.merkle_inclusion.root, message.merkle_root);
        Ok(ProofBundle {
            version: BUNDLE_SCHEMA_VERSION.to_string(),
            tx_ref: format!("{}@{}", request.intent.account_url, request.intent.tx_hash),
            components,
            attestations: collected
                .iter()
                .map(|a| BundleAttestation {
                    validator_id: a.validator_id.clone(),
                    public_key: hex::encode(&a.public_key),
                    signature: hex::encode(&a.signature),
                    signed_hash: a.message_hash,
                    timestamp: a.timestamp,
                })
                .collect(),
            integrity: BundleIntegrity {
                artifact_hash,
                custody_chain_hash,
                bundle_signature: hex::encode(
                    self.signer.sign(artifact_hash.as_bytes()).as_bytes(),
                ),
            },
        })
    }

    /// Best-effort bundle materialization; failures are logged, never
    /// aborting the cycle.
    #[allow(clippy::too_many_arguments)]
    async fn materialize(
        &self,
        cycle_id: &str,
        proof_id: &str,
        operation_id: Hash32,
        bundle_id: &str,
        request: &CycleRequest,
        bundle: &ProofBundle,
        bundle_gzip: Vec<u8>,
        bundle_sha256: Hash32,
        chained_proof_error: Option<String>,
        outcome: &str,
        fail_phase: Option<u8>,
    ) {
        let input = MaterializeInput {
            cycle_id: cycle_id.to_string(),
            proof_id: proof_id.to_string(),
            operation_id,
            bundle_id: bundle_id.to_string(),
            target_chain: request.batch.target_chain.clone(),
            scheme: self.attestation.scheme().to_string(),
            bundle: bundle.clone(),
            bundle_gzip,
            bundle_sha256,
            chained_proof_error,
            outcome: outcome.to_string(),
            fail_phase,
        };
        if let Err(e) = materialize_bundle(self.store.as_ref(), input).await {
            error!(cycle_id, error = %e, "bundle materialization failed (non-fatal)");
        }
    }

    /// Best-effort custody journal persistence.
    async fn persist_custody(&self, proof_id: &str) {
        let Some(lifecycle) = self.lifecycle.lifecycle(proof_id) else {
            return;
        };
        for event in lifecycle.custody.events() {
            let row = CustodyEventRow {
                id: Uuid::new_v4().to_string(),
                proof_id: proof_id.to_string(),
                sequence: event.sequence as i64,
                event_type: event.event_type.clone(),
                details: event.details.clone(),
                previous_hash: event.previous_hash.as_bytes().to_vec(),
                current_hash: event.current_hash.as_bytes().to_vec(),
                created_at: event.timestamp,
            };
            if let Err(e) = self.store.append_custody_event(row).await {
                error!(proof_id, error = %e, "custody event persistence failed (non-fatal)");
                return;
            }
        }
    }

    /// Best-effort audit entry, mirrored to the journal store.
    fn audit_event(
        &self,
        user_id: &str,
        intent_key: &str,
        action: &str,
        details: serde_json::Value,
    ) {
        match self.audit.record(user_id, intent_key, action, details) {
            Ok(entry) => {
                let store = self.store.clone();
                let row = shared_storage::AuditTrailRow {
                    id: Uuid::new_v4().to_string(),
                    user_id: entry.user_id.clone(),
                    intent_id: entry.intent_id.clone(),
                    sequence: entry.sequence as i64,
                    action: entry.action.clone(),
                    details: entry.details.clone(),
                    previous_hash: entry.previous_hash.as_bytes().to_vec(),
                    current_hash: entry.current_hash.as_bytes().to_vec(),
                    created_at: entry.timestamp,
                };
                tokio::spawn(async move {
                    if let Err(e) = store.append_audit_entry(row).await {
                        warn!(error = %e, "audit entry persistence failed (non-fatal)");
                    }
                });
            }
            Err(e) => warn!(error = %e, "audit entry failed (non-fatal)"),
        }
    }

    /// Best-effort sync snapshot.
    fn snapshot(&self, intent_key: &str, phase: ProofState, details: serde_json::Value) {
        if let Err(e) = self.audit.emit_snapshot(intent_key, phase, details) {
            warn!(error = %e, "sync snapshot failed (non-fatal)");
        }
    }

    /// Record a cycle failure: journal the lifecycle, fire callbacks, return
    /// the error unchanged.
    fn fail_cycle(
        &self,
        cycle_id: &str,
        proof_id: &str,
        intent_key: &str,
        error: CycleError,
    ) -> CycleError {
        warn!(cycle_id, proof_id, phase = error.phase, reason = %error.reason, "cycle failed");
        if let Err(e) = self
            .lifecycle
            .mark_failed(proof_id, error.phase, &error.reason)
        {
            warn!(proof_id, error = %e, "lifecycle failure mark rejected");
        }
        self.snapshot(
            intent_key,
            ProofState::Failed,
            serde_json::json!({ "fail_phase": error.phase, "reason": error.reason }),
        );
        for callback in self.on_cycle_failed.lock().iter() {
            callback(cycle_id, error.phase, &error.reason);
        }
        error
    }
}

fn empty_chained_proof() -> ChainedProof {
    let empty = ProofLayer {
        start: Hash32::ZERO,
        entries: Vec::new(),
        anchor: Hash32::ZERO,
    };
    ChainedProof {
        l1: empty.clone(),
        l2: empty.clone(),
        l3: empty,
        network_root: Hash32::ZERO,
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WriteBackConfig;
    use crate::ports::{MockPeerClient, MockSourceLedger};
    use cv_02_chain_strategy::{ChainStrategyConfig, MockChainStrategy};
    use cv_04_attestation::{Ed25519AttestationStrategy, RosterEntry, ValidatorRoster};
    use shared_storage::MemoryStore;
    use shared_types::{AnchorClass, AnchorResult, AnchorStatus, Batch, BatchLeaf, ChainPlatform};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const ANCHOR_TX: &str = "0xanchor";

    struct Fixture {
        orchestrator: ProofCycleOrchestrator<MemoryStore, MockPeerClient, MockSourceLedger>,
        chain: Arc<MockChainStrategy>,
        ledger: Arc<MockSourceLedger>,
        store: Arc<MemoryStore>,
        lifecycle: Arc<LifecycleManager>,
        peer_client: Arc<MockPeerClient>,
    }

    fn ethereum_config() -> ChainStrategyConfig {
        ChainStrategyConfig {
            platform: ChainPlatform::Evm,
            chain_id: 1,
            network_name: "mainnet".into(),
            rpc: "http://localhost:8545".into(),
            rpc_backup: None,
            contract_address: format!("0x{}", "42".repeat(20)),
            required_confirmations: Some(12),
            // The fixture roster signs Ed25519.
            attestation_scheme: Some(shared_types::AttestationScheme::Ed25519),
            platform_config: None,
            gas_config: None,
            enabled: true,
        }
    }

    fn finalized_observation(tx_hash: &str) -> ObservationResult {
        ObservationResult {
            tx_hash: tx_hash.to_string(),
            block_number: 18_000_000,
            block_hash: format!("0x{:064x}", 18_000_000u64),
            confirmations: 12,
            required_confirmations: 12,
            success: true,
            gas_used: 90_000,
            state_root: Some("0xstate".into()),
            transactions_root: Some("0xtxs".into()),
            receipts_root: Some("0xreceipts".into()),
            merkle_proof: None,
            receipt_proof: None,
            observed_at: Utc::now(),
        }
    }

    fn fixture(peer_count: usize, write_back: bool) -> Fixture {
        // Four-validator roster; validator-1 is local, the rest are peers.
        let keypairs: Vec<Ed25519KeyPair> =
            (0..4).map(|_| Ed25519KeyPair::generate()).collect();
        let roster = ValidatorRoster::new(
            keypairs
                .iter()
                .enumerate()
                .map(|(i, kp)| RosterEntry {
                    validator_id: format!("validator-{}", i + 1),
                    public_key: kp.public_key().as_bytes().to_vec(),
                    weight: 1,
                })
                .collect(),
        );
        let local = Arc::new(
            Ed25519AttestationStrategy::new(
                "validator-1".into(),
                Ed25519KeyPair::from_seed(keypairs[0].seed()),
                roster.clone(),
            )
            .unwrap(),
        );

        let mut peer_client = MockPeerClient::new();
        let mut peers = Vec::new();
        for i in 1..=peer_count.min(3) {
            let validator_id = format!("validator-{}", i + 1);
            peer_client = peer_client.with_peer(
                validator_id.clone(),
                Arc::new(
                    Ed25519AttestationStrategy::new(
                        validator_id.clone(),
                        Ed25519KeyPair::from_seed(keypairs[i].seed()),
                        roster.clone(),
                    )
                    .unwrap(),
                ) as Arc<dyn AttestationStrategy>,
            );
            peers.push(PeerConfig {
                validator_id,
                url: format!("http://peer-{}", i + 1),
            });
        }
        let peer_client = Arc::new(peer_client);

        let chain = Arc::new(MockChainStrategy::new(ethereum_config()));
        chain.script_observation(ANCHOR_TX, finalized_observation(ANCHOR_TX));
        let mut registry = ChainRegistry::new(true);
        registry.register("ethereum", chain.clone() as Arc<dyn ChainStrategy>);

        let ledger = Arc::new(MockSourceLedger::new());
        let store = Arc::new(MemoryStore::new());
        let lifecycle = Arc::new(LifecycleManager::new());
        let audit = Arc::new(AuditService::default());

        let config = OrchestratorConfig {
            observation_timeout: Duration::from_secs(5),
            attestation_timeout: Duration::from_millis(500),
            write_back_timeout: Duration::from_secs(2),
            write_back: WriteBackConfig {
                enabled: write_back,
                principal: write_back.then(|| "acc://certen/anchors".to_string()),
            },
            partition_routing: Default::default(),
        };

        let orchestrator = ProofCycleOrchestrator::new(
            config,
            "validator-1",
            Arc::new(registry),
            local,
            Ed25519KeyPair::generate(),
            peers,
            peer_client.clone(),
            ledger.clone(),
            store.clone(),
            lifecycle.clone(),
            audit,
        );

        Fixture {
            orchestrator,
            chain,
            ledger,
            store,
            lifecycle,
            peer_client,
        }
    }

    fn request() -> CycleRequest {
        let tx_hash = format!("0x{}", "aa".repeat(32));
        let leaf_hash = sha256(tx_hash.as_bytes());
        let mut batch = Batch::open(
            "batch-1".into(),
            AnchorClass::OnDemand,
            "ethereum".into(),
            Utc::now(),
        );
        batch
            .push(BatchLeaf {
                proof_id: "P1".into(),
                tx_hash: tx_hash.clone(),
                account_url: "acc://demo/book/1".into(),
                leaf_hash,
            })
            .unwrap();
        batch
            .seal(shared_crypto::hashing::merkle_root(&[leaf_hash]))
            .unwrap();
        CycleRequest {
            batch,
            anchor: AnchorResult {
                tx_hash: ANCHOR_TX.into(),
                block_number: 0,
                block_hash: String::new(),
                status: AnchorStatus::Pending,
                confirmations: 0,
                gas_used: 0,
            },
            intent: IntentRef {
                tx_hash,
                account_url: "acc://demo/book/1".into(),
                block_number: 1_234,
                timestamp: 1_700_000_000,
                user_id: "alice".into(),
            },
        }
    }

    #[tokio::test]
    async fn four_of_four_cycle_completes_and_writes_back() {
        let f = fixture(3, true);
        let outcome = f.orchestrator.run_cycle(request()).await.unwrap();

        assert!(outcome.aggregated.threshold_met);
        assert_eq!(outcome.aggregated.achieved_weight, 4);
        assert_eq!(outcome.aggregated.required_weight, 4);
        assert_eq!(outcome.anchor_tx_hash, ANCHOR_TX);
        assert!(outcome.write_back_tx.is_some());
        assert_eq!(f.ledger.submitted().len(), 1);
        assert_eq!(
            f.lifecycle.state(&outcome.proof_id),
            Some(ProofState::Verified)
        );

        // Phase-7 observation persisted at workflow step 1.
        let results = f.store.results_for_cycle(&outcome.cycle_id).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].workflow_step, 1);

        // Individual attestations and the aggregate persisted.
        let unified = f.store.unified_for_cycle(&outcome.cycle_id).await.unwrap();
        assert_eq!(unified.len(), 4);
        let aggregated = f
            .store
            .aggregated_for_cycle(&outcome.cycle_id)
            .await
            .unwrap()
            .unwrap();
        assert!(aggregated.threshold_met);
        assert!(aggregated.verified);

        // Custody journal persisted and intact.
        let custody = f.store.custody_events(&outcome.proof_id).await.unwrap();
        assert!(custody.len() >= 5);
        assert_eq!(custody[0].previous_hash, vec![0u8; 32]);

        assert_eq!(f.orchestrator.active_cycle_count(), 0);
    }

    #[tokio::test]
    async fn identical_inputs_same_operation_id_distinct_proof_ids() {
        let f = fixture(3, false);
        let first = f.orchestrator.run_cycle(request()).await.unwrap();
        let second = f.orchestrator.run_cycle(request()).await.unwrap();
        assert_eq!(first.operation_id, second.operation_id);
        assert_ne!(first.proof_id, second.proof_id);
    }

    #[tokio::test]
    async fn three_of_four_misses_threshold_and_fails_phase_8() {
        let f = fixture(3, false);
        f.peer_client.set_unreachable("validator-4");

        let failures = Arc::new(AtomicUsize::new(0));
        let seen_phase = Arc::new(AtomicUsize::new(0));
        f.orchestrator.on_cycle_failed(Box::new({
            let failures = failures.clone();
            let seen_phase = seen_phase.clone();
            move |_, phase, _| {
                failures.fetch_add(1, Ordering::SeqCst);
                seen_phase.store(phase as usize, Ordering::SeqCst);
            }
        }));

        let err = f.orchestrator.run_cycle(request()).await.unwrap_err();
        assert_eq!(err.phase, 8);
        assert!(err.reason.contains("threshold not met"));
        assert_eq!(failures.load(Ordering::SeqCst), 1);
        assert_eq!(seen_phase.load(Ordering::SeqCst), 8);
    }

    #[tokio::test]
    async fn unfinalized_observation_fails_phase_7() {
        let f = fixture(3, false);
        let mut observation = finalized_observation(ANCHOR_TX);
        observation.confirmations = 11;
        f.chain.script_observation(ANCHOR_TX, observation);

        let err = f.orchestrator.run_cycle(request()).await.unwrap_err();
        assert_eq!(err.phase, 7);
        assert!(err.reason.contains("not finalized"));
    }

    #[tokio::test]
    async fn observation_rpc_failure_fails_phase_7() {
        let f = fixture(3, false);
        f.chain.set_fail_observation(true);
        let err = f.orchestrator.run_cycle(request()).await.unwrap_err();
        assert_eq!(err.phase, 7);
    }

    #[tokio::test]
    async fn write_back_failure_fails_phase_9_and_records_fail_phase() {
        let f = fixture(3, true);
        f.ledger.set_fail_write_back(true);

        let failed_cycle: Arc<parking_lot::Mutex<Option<String>>> = Arc::default();
        f.orchestrator.on_cycle_failed(Box::new({
            let failed_cycle = failed_cycle.clone();
            move |cycle_id, phase, _| {
                assert_eq!(phase, 9);
                *failed_cycle.lock() = Some(cycle_id.to_string());
            }
        }));

        let err = f.orchestrator.run_cycle(request()).await.unwrap_err();
        assert_eq!(err.phase, 9);

        // Evidence from the earlier phases was persisted before the failure.
        let cycle_id = failed_cycle.lock().clone().unwrap();
        assert_eq!(f.store.results_for_cycle(&cycle_id).await.unwrap().len(), 1);
        let aggregated = f
            .store
            .aggregated_for_cycle(&cycle_id)
            .await
            .unwrap()
            .unwrap();
        assert!(aggregated.threshold_met);
    }

    #[tokio::test]
    async fn missing_principal_skips_write_back_without_error() {
        let mut f = fixture(3, false);
        // Enabled but no principal configured: phase 9 is a no-op.
        f.orchestrator.config.write_back = WriteBackConfig {
            enabled: true,
            principal: None,
        };
        let outcome = f.orchestrator.run_cycle(request()).await.unwrap();
        assert!(outcome.write_back_tx.is_none());
        assert!(f.ledger.submitted().is_empty());
    }

    #[tokio::test]
    async fn chained_proof_failure_records_failure_row_without_aborting() {
        let f = fixture(3, false);
        f.ledger.set_fail_chained_proof(true);
        let outcome = f.orchestrator.run_cycle(request()).await.unwrap();

        // Find the artifact through the bundle row.
        let bundle_row = f.store.bundle(&outcome.bundle_id).await.unwrap().unwrap();
        let artifact = f
            .store
            .artifact(&bundle_row.artifact_id)
            .await
            .unwrap()
            .unwrap();
        assert!(!artifact.includes_chained_proof);
        let layers = f
            .store
            .chained_proof_layers(&bundle_row.artifact_id)
            .await
            .unwrap();
        assert_eq!(layers.len(), 1);
        assert!(layers[0].failed);
        assert_eq!(layers[0].failure_reason.as_deref(), Some("receipt unavailable"));
    }

    #[tokio::test]
    async fn bundle_round_trips_through_gzip() {
        let f = fixture(3, false);
        let outcome = f.orchestrator.run_cycle(request()).await.unwrap();
        let bundle_row = f.store.bundle(&outcome.bundle_id).await.unwrap().unwrap();
        let bundle = cv_01_proof_model::gunzip_bundle(&bundle_row.bundle_gzip).unwrap();
        assert_eq!(bundle.integrity.artifact_hash, outcome.artifact_hash);
        assert!(verify_bundle_integrity(&bundle).is_ok());
        assert_eq!(bundle.attestations.len(), 4);
        assert_eq!(
            bundle_row.bundle_sha256,
            sha256(&bundle_row.bundle_gzip).as_bytes().to_vec()
        );
    }

    #[tokio::test]
    async fn slow_peers_are_discarded_at_the_deadline() {
        // Peers answer after the attestation deadline; only the local
        // attestation is collected, so the threshold fails at phase 8.
        let keypairs: Vec<Ed25519KeyPair> =
            (0..2).map(|_| Ed25519KeyPair::generate()).collect();
        let roster = ValidatorRoster::new(
            keypairs
                .iter()
                .enumerate()
                .map(|(i, kp)| RosterEntry {
                    validator_id: format!("validator-{}", i + 1),
                    public_key: kp.public_key().as_bytes().to_vec(),
                    weight: 1,
                })
                .collect(),
        );
        let local = Arc::new(
            Ed25519AttestationStrategy::new(
                "validator-1".into(),
                Ed25519KeyPair::from_seed(keypairs[0].seed()),
                roster.clone(),
            )
            .unwrap(),
        );
        let slow_peer = Arc::new(
            MockPeerClient::new()
                .with_peer(
                    "validator-2",
                    Arc::new(
                        Ed25519AttestationStrategy::new(
                            "validator-2".into(),
                            Ed25519KeyPair::from_seed(keypairs[1].seed()),
                            roster,
                        )
                        .unwrap(),
                    ) as Arc<dyn AttestationStrategy>,
                )
                .with_delay(Duration::from_millis(200)),
        );

        let chain = Arc::new(MockChainStrategy::new(ethereum_config()));
        chain.script_observation(ANCHOR_TX, finalized_observation(ANCHOR_TX));
        let mut registry = ChainRegistry::new(true);
        registry.register("ethereum", chain as Arc<dyn ChainStrategy>);

        let orchestrator = ProofCycleOrchestrator::new(
            OrchestratorConfig {
                observation_timeout: Duration::from_secs(5),
                attestation_timeout: Duration::from_millis(50),
                write_back_timeout: Duration::from_secs(1),
                write_back: WriteBackConfig::default(),
                partition_routing: Default::default(),
            },
            "validator-1",
            Arc::new(registry),
            local,
            Ed25519KeyPair::generate(),
            vec![PeerConfig {
                validator_id: "validator-2".into(),
                url: "http://peer-2".into(),
            }],
            slow_peer,
            Arc::new(MockSourceLedger::new()),
            Arc::new(MemoryStore::new()),
            Arc::new(LifecycleManager::new()),
            Arc::new(AuditService::default()),
        );

        let err = orchestrator.run_cycle(request()).await.unwrap_err();
        assert_eq!(err.phase, 8);
        assert!(err.reason.contains("threshold not met"));
    }
}
