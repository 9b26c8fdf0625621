//! Scheduler → orchestrator batch flows.

use chrono::Utc;
use cv_02_chain_strategy::{ChainRegistry, ChainStrategy, ChainStrategyConfig, MockChainStrategy};
use cv_03_observer::ObservationResult;
use cv_04_attestation::{
    AttestationStrategy, Ed25519AttestationStrategy, RosterEntry, ValidatorRoster,
};
use cv_05_scheduler::{AnchorScheduler, BatchOutcome, RequestStatus, SchedulerConfig};
use cv_06_orchestrator::{
    IntentRef, MockPeerClient, MockSourceLedger, OrchestratorConfig, PeerConfig,
    ProofCycleOrchestrator, WriteBackConfig,
};
use cv_08_lifecycle::LifecycleManager;
use cv_09_audit::AuditService;
use shared_crypto::hashing::sha256;
use shared_crypto::Ed25519KeyPair;
use shared_storage::MemoryStore;
use shared_types::{AnchorClass, AttestationScheme, ChainPlatform, ProofState};
use std::sync::Arc;
use std::time::Duration;

fn ethereum_config() -> ChainStrategyConfig {
    ChainStrategyConfig {
        platform: ChainPlatform::Evm,
        chain_id: 1,
        network_name: "mainnet".into(),
        rpc: "http://localhost:8545".into(),
        rpc_backup: None,
        contract_address: format!("0x{}", "42".repeat(20)),
        required_confirmations: Some(12),
        attestation_scheme: Some(AttestationScheme::Ed25519),
        platform_config: None,
        gas_config: None,
        enabled: true,
    }
}

fn finalized_observation(tx_hash: &str, block_number: u64) -> ObservationResult {
    ObservationResult {
        tx_hash: tx_hash.to_string(),
        block_number,
        block_hash: format!("0x{block_number:064x}"),
        confirmations: 12,
        required_confirmations: 12,
        success: true,
        gas_used: 80_000,
        state_root: None,
        transactions_root: None,
        receipts_root: None,
        merkle_proof: None,
        receipt_proof: None,
        observed_at: Utc::now(),
    }
}

struct Network {
    scheduler: Arc<AnchorScheduler>,
    ready: tokio::sync::mpsc::UnboundedReceiver<shared_types::Batch>,
    orchestrator:
        ProofCycleOrchestrator<MemoryStore, MockPeerClient, MockSourceLedger>,
    chain: Arc<MockChainStrategy>,
    lifecycle: Arc<LifecycleManager>,
}

fn network() -> Network {
    let keypairs: Vec<Ed25519KeyPair> = (0..4).map(|_| Ed25519KeyPair::generate()).collect();
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
    let local: Arc<dyn AttestationStrategy> = Arc::new(
        Ed25519AttestationStrategy::new(
            "validator-1".into(),
            Ed25519KeyPair::from_seed(keypairs[0].seed()),
            roster.clone(),
        )
        .unwrap(),
    );

    let mut peer_client = MockPeerClient::new();
    let mut peers = Vec::new();
    for i in 1..4 {
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

    let chain = Arc::new(MockChainStrategy::new(ethereum_config()));
    let mut registry = ChainRegistry::new(true);
    registry.register("ethereum", chain.clone() as Arc<dyn ChainStrategy>);
    let registry = Arc::new(registry);

    let (scheduler, ready) = AnchorScheduler::new(SchedulerConfig::default(), registry.clone());
    let lifecycle = Arc::new(LifecycleManager::new());
    let orchestrator = ProofCycleOrchestrator::new(
        OrchestratorConfig {
            observation_timeout: Duration::from_secs(5),
            attestation_timeout: Duration::from_millis(500),
            write_back_timeout: Duration::from_secs(2),
            write_back: WriteBackConfig::default(),
            partition_routing: Default::default(),
        },
        "validator-1",
        registry,
        local,
        Ed25519KeyPair::generate(),
        peers,
        Arc::new(peer_client),
        Arc::new(MockSourceLedger::new()),
        Arc::new(MemoryStore::new()),
        lifecycle.clone(),
        Arc::new(AuditService::default()),
    );

    Network {
        scheduler,
        ready,
        orchestrator,
        chain,
        lifecycle,
    }
}

fn intent(tx_hash: &str) -> IntentRef {
    IntentRef {
        tx_hash: tx_hash.to_string(),
        account_url: "acc://demo/book/1".into(),
        block_number: 1_234,
        timestamp: 1_700_000_000,
        user_id: "acc://demo/book/1".into(),
    }
}

/// Submitting an on-demand request yields a batch on the ready channel
/// within one check interval, and marking it completed transitions the
/// request to `completed` exactly once.
#[tokio::test]
async fn on_demand_request_completes_end_to_end() {
    let mut net = network();
    let tx_hash = format!("0x{}", "aa".repeat(32));
    let request_id = net
        .scheduler
        .submit_request("P1", "acc://demo/book/1", &tx_hash, AnchorClass::OnDemand, "ethereum")
        .unwrap();

    net.scheduler.process_due(Utc::now()).unwrap();
    let batch = net.ready.recv().await.expect("batch on ready channel");
    assert!(batch.is_sealed());

    net.scheduler.mark_batch_processing(&batch.batch_id).unwrap();
    net.scheduler
        .mark_batch_completed(&batch.batch_id, format!("0x{}", "bb".repeat(32)), 18_000_000)
        .unwrap();

    let request = net.scheduler.request(&request_id).unwrap();
    assert_eq!(request.status, RequestStatus::Completed);
    assert!(matches!(
        net.scheduler.batch_outcome(&batch.batch_id),
        Some(BatchOutcome::Completed { block_number: 18_000_000, .. })
    ));

    // Re-marking is rejected.
    assert!(net
        .scheduler
        .mark_batch_completed(&batch.batch_id, "0xdd", 1)
        .is_err());
}

/// Full flow: scheduler batch → anchor creation → observation → quorum →
/// batch completion, driven by the orchestrator.
#[tokio::test]
async fn batch_flows_through_a_full_proof_cycle() {
    let mut net = network();
    let tx_hash = format!("0x{}", "aa".repeat(32));
    net.scheduler
        .submit_request("P1", "acc://demo/book/1", &tx_hash, AnchorClass::OnDemand, "ethereum")
        .unwrap();
    net.scheduler.process_due(Utc::now()).unwrap();
    let batch = net.ready.recv().await.unwrap();

    // The mock strategy derives the anchor tx from the batch id; observe it
    // as finalized.
    let anchor_tx = format!("0x{}", sha256(batch.batch_id.as_bytes()).to_hex());
    net.chain
        .script_observation(&anchor_tx, finalized_observation(&anchor_tx, 18_000_000));

    let batch_id = batch.batch_id.clone();
    let outcome = net
        .orchestrator
        .process_batch(net.scheduler.as_ref(), batch, intent(&tx_hash))
        .await
        .unwrap();

    assert!(outcome.aggregated.threshold_met);
    assert_eq!(outcome.anchor_tx_hash, anchor_tx);
    assert_eq!(
        net.lifecycle.state(&outcome.proof_id),
        Some(ProofState::Verified)
    );
    assert!(matches!(
        net.scheduler.batch_outcome(&batch_id),
        Some(BatchOutcome::Completed { .. })
    ));
}

/// Two cycles over identical inputs produce the same operation id but
/// distinct proof ids.
#[tokio::test]
async fn identical_inputs_reuse_operation_id_but_not_proof_id() {
    let mut net = network();
    let tx_hash = format!("0x{}", "aa".repeat(32));
    let mut outcomes = Vec::new();

    for proof in ["P1", "P2"] {
        net.scheduler
            .submit_request(proof, "acc://demo/book/1", &tx_hash, AnchorClass::OnDemand, "ethereum")
            .unwrap();
        net.scheduler.process_due(Utc::now()).unwrap();
        let batch = net.ready.recv().await.unwrap();
        let anchor_tx = format!("0x{}", sha256(batch.batch_id.as_bytes()).to_hex());
        net.chain
            .script_observation(&anchor_tx, finalized_observation(&anchor_tx, 18_000_000));
        outcomes.push(
            net.orchestrator
                .process_batch(net.scheduler.as_ref(), batch, intent(&tx_hash))
                .await
                .unwrap(),
        );
    }

    assert_eq!(outcomes[0].operation_id, outcomes[1].operation_id);
    assert_ne!(outcomes[0].proof_id, outcomes[1].proof_id);
    assert_ne!(outcomes[0].cycle_id, outcomes[1].cycle_id);
}

/// A failed cycle re-queues the batch members until retries are exhausted.
#[tokio::test]
async fn failed_cycle_requeues_requests() {
    let mut net = network();
    // No scripted observation: phase 7 sees NotYetMined and the mock
    // surfaces it as a transient failure through the strategy.
    net.chain.set_fail_observation(true);

    let tx_hash = format!("0x{}", "aa".repeat(32));
    let request_id = net
        .scheduler
        .submit_request("P1", "acc://demo/book/1", &tx_hash, AnchorClass::OnDemand, "ethereum")
        .unwrap();
    net.scheduler.process_due(Utc::now()).unwrap();
    let batch = net.ready.recv().await.unwrap();

    let err = net
        .orchestrator
        .process_batch(net.scheduler.as_ref(), batch, intent(&tx_hash))
        .await
        .unwrap_err();
    assert_eq!(err.phase, 7);

    let request = net.scheduler.request(&request_id).unwrap();
    assert_eq!(request.status, RequestStatus::Pending);
    assert_eq!(request.retry_count, 1);
}
