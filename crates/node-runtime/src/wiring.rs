//! Subsystem wiring.
//!
//! Builds every component from configuration and runs the node: scheduler
//! loop, batch consumer, peer API server, consensus recovery.

use crate::api::{router, ApiState};
use crate::config::NodeConfig;
use crate::ledger::JsonRpcSourceLedger;
use anyhow::Context;
use cv_02_chain_strategy::{ChainRegistry, EvmChainStrategy, EvmTxSigner};
use cv_03_observer::{FinalityObserver, HttpEvmRpc, ObserverConfig};
use cv_04_attestation::{
    AttestationStrategy, BlsAttestationStrategy, Ed25519AttestationStrategy, RosterEntry,
    ValidatorRoster,
};
use cv_05_scheduler::AnchorScheduler;
use cv_06_orchestrator::{HttpPeerClient, IntentRef, ProofCycleOrchestrator};
use cv_07_consensus::ConsensusService;
use cv_08_lifecycle::LifecycleManager;
use cv_09_audit::AuditService;
use shared_crypto::{BlsKeyPair, Ed25519KeyPair};
use shared_storage::{MemoryStore, PostgresStore, ValidatorStore};
use shared_types::{AttestationScheme, Batch, ChainPlatform};
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// Load the store and run the node until ctrl-c.
pub async fn run(config: NodeConfig) -> anyhow::Result<()> {
    match config.database.url.clone() {
        Some(url) => {
            let store = Arc::new(
                PostgresStore::connect(&url, config.database.max_connections)
                    .await
                    .context("database connection failed")?,
            );
            info!("using Postgres store");
            run_with_store(config, store).await
        }
        None => {
            warn!("no database configured, using in-memory store");
            run_with_store(config, Arc::new(MemoryStore::new())).await
        }
    }
}

fn build_roster(config: &NodeConfig) -> anyhow::Result<ValidatorRoster> {
    let entries = config
        .roster
        .iter()
        .map(|member| {
            Ok(RosterEntry {
                validator_id: member.validator_id.clone(),
                public_key: hex::decode(member.public_key_hex.trim())
                    .context("roster public key is not hex")?,
                weight: member.weight,
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(ValidatorRoster::new(entries))
}

fn build_attestation(
    config: &NodeConfig,
    roster: ValidatorRoster,
) -> anyhow::Result<Arc<dyn AttestationStrategy>> {
    let validator_id = config.validator.id.clone();
    match config.validator.attestation_scheme {
        AttestationScheme::Bls12381 => {
            let seed_hex = config
                .validator
                .bls_secret_hex
                .as_deref()
                .context("bls_secret_hex required for the bls12381 scheme")?;
            let seed = NodeConfig::decode_seed(seed_hex)?;
            let keypair = BlsKeyPair::from_secret_bytes(&seed)
                .map_err(|e| anyhow::anyhow!("invalid BLS secret: {e}"))?;
            Ok(Arc::new(BlsAttestationStrategy::new(
                validator_id,
                keypair,
                roster,
            )?))
        }
        AttestationScheme::Ed25519 => {
            let seed = NodeConfig::decode_seed(&config.validator.ed25519_seed_hex)?;
            Ok(Arc::new(Ed25519AttestationStrategy::new(
                validator_id,
                Ed25519KeyPair::from_seed(seed),
                roster,
            )?))
        }
    }
}

fn build_registry(config: &NodeConfig) -> anyhow::Result<ChainRegistry> {
    let mut registry = ChainRegistry::new(config.strict_chain_registry);
    for chain in &config.chains {
        if !chain.strategy.enabled {
            info!(chain = %chain.name, "chain disabled, skipping");
            continue;
        }
        match chain.strategy.platform {
            ChainPlatform::Evm => {
                let rpc = Arc::new(HttpEvmRpc::new(
                    chain.strategy.rpc.clone(),
                    chain.strategy.rpc_backup.clone(),
                ));
                let observer = FinalityObserver::new(rpc.clone(), ObserverConfig::default());
                let signer = config
                    .validator
                    .evm_secret_hex
                    .as_deref()
                    .map(|hex_str| {
                        let seed = NodeConfig::decode_seed(hex_str)?;
                        EvmTxSigner::from_secret(&seed)
                            .map_err(|e| anyhow::anyhow!("invalid EVM secret: {e}"))
                    })
                    .transpose()?;
                let strategy =
                    EvmChainStrategy::new(chain.strategy.clone(), rpc, observer, signer)
                        .map_err(|e| anyhow::anyhow!("chain {}: {e}", chain.name))?;
                registry.register(chain.name.clone(), Arc::new(strategy));
                info!(chain = %chain.name, "EVM strategy registered");
            }
            platform => {
                // Stub platforms have no full strategy; with a strict
                // registry they would be rejected at submit time anyway.
                warn!(chain = %chain.name, platform = %platform, "platform has no full strategy, not registered");
            }
        }
    }
    Ok(registry)
}

/// Derive the intent reference a cycle proves from the batch's primary leaf.
///
/// Intent discovery runs upstream of the validator; the leaf carries the
/// witnessed coordinates and the account URL identifies the end user.
fn intent_for(batch: &Batch) -> Option<IntentRef> {
    let leaf = batch.leaves.first()?;
    Some(IntentRef {
        tx_hash: leaf.tx_hash.clone(),
        account_url: leaf.account_url.clone(),
        block_number: 0,
        timestamp: batch.scheduled_for.timestamp(),
        user_id: leaf.account_url.clone(),
    })
}

/// Run every subsystem over a concrete store until ctrl-c.
pub async fn run_with_store<S>(config: NodeConfig, store: Arc<S>) -> anyhow::Result<()>
where
    S: ValidatorStore + 'static,
{
    let roster = build_roster(&config)?;
    let attestation = build_attestation(&config, roster)?;
    let registry = Arc::new(build_registry(&config)?);
    let signer = Ed25519KeyPair::from_seed(NodeConfig::decode_seed(
        &config.validator.ed25519_seed_hex,
    )?);

    let lifecycle = Arc::new(LifecycleManager::new());
    let audit = Arc::new(AuditService::default());
    let ledger = Arc::new(JsonRpcSourceLedger::new(config.source_ledger.rpc.clone()));
    let peer_client = Arc::new(HttpPeerClient::new(Duration::from_secs(30)));

    let (scheduler, mut ready) = AnchorScheduler::new(config.scheduler.clone(), registry.clone());
    let orchestrator = Arc::new(ProofCycleOrchestrator::new(
        config.orchestrator.clone(),
        config.validator.id.clone(),
        registry.clone(),
        attestation.clone(),
        signer,
        config.peers.clone(),
        peer_client,
        ledger,
        store.clone(),
        lifecycle,
        audit,
    ));

    let consensus = Arc::new(ConsensusService::new(
        store.clone(),
        attestation.clone(),
        config.validator.id.clone(),
    ));
    consensus.recover().await.context("consensus recovery failed")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler_task = tokio::spawn(scheduler.clone().run(shutdown_rx.clone()));

    // Batch consumer: each ready batch becomes an independent cycle task.
    let consumer_task = {
        let orchestrator = orchestrator.clone();
        let scheduler = scheduler.clone();
        let mut shutdown = shutdown_rx.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    batch = ready.recv() => {
                        let Some(batch) = batch else { break };
                        let Some(intent) = intent_for(&batch) else {
                            warn!(batch_id = %batch.batch_id, "batch has no members, skipping");
                            continue;
                        };
                        let orchestrator = orchestrator.clone();
                        let scheduler = scheduler.clone();
                        tokio::spawn(async move {
                            if let Err(e) = orchestrator
                                .process_batch(scheduler.as_ref(), batch, intent)
                                .await
                            {
                                warn!(phase = e.phase, reason = %e.reason, "batch cycle failed");
                            }
                        });
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
        })
    };

    let api_state = Arc::new(ApiState {
        validator_id: config.validator.id.clone(),
        attestation,
        consensus,
    });
    let listener = tokio::net::TcpListener::bind(&config.validator.listen_addr)
        .await
        .with_context(|| format!("cannot bind {}", config.validator.listen_addr))?;
    info!(addr = %config.validator.listen_addr, "peer API listening");

    let server = axum::serve(listener, router(api_state)).into_future();
    tokio::select! {
        result = server => result.context("API server failed")?,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    let _ = shutdown_tx.send(true);
    let _ = scheduler_task.await;
    let _ = consumer_task.await;
    info!("validator stopped");
    Ok(())
}
