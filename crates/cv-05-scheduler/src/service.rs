//! The anchor scheduler service.

use crate::config::SchedulerConfig;
use crate::domain::{AnchorRequest, BatchOutcome, RequestStatus};
use crate::error::{SchedulerError, SchedulerResult};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use cv_02_chain_strategy::ChainRegistry;
use parking_lot::Mutex;
use serde::Serialize;
use shared_crypto::canonical::canonical_sha256;
use shared_crypto::hashing::merkle_root;
use shared_types::{AnchorClass, Batch, BatchLeaf};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};
use uuid::Uuid;

/// Leaf preimage; the batch Merkle root is built over these hashes in
/// insertion order.
#[derive(Serialize)]
struct LeafPreimage<'a> {
    account_url: &'a str,
    proof_id: &'a str,
    tx_hash: &'a str,
}

struct BatchRecord {
    batch: Batch,
    outcome: BatchOutcome,
    request_ids: Vec<String>,
}

#[derive(Default)]
struct SchedulerState {
    requests: HashMap<String, AnchorRequest>,
    queues: HashMap<(String, AnchorClass), VecDeque<String>>,
    batches: HashMap<String, BatchRecord>,
    completed_batches: u64,
    mean_batch_size: f64,
}

/// Aggregate scheduler counters.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerStats {
    /// Running mean size of completed batches.
    pub mean_batch_size: f64,
    /// Number of completed batches.
    pub completed_batches: u64,
    /// Requests currently pending.
    pub pending_requests: usize,
}

/// Queues anchor requests per (chain, class) and assembles batches.
pub struct AnchorScheduler {
    config: SchedulerConfig,
    registry: Arc<ChainRegistry>,
    state: Mutex<SchedulerState>,
    ready_tx: mpsc::UnboundedSender<Batch>,
}

impl AnchorScheduler {
    /// Create a scheduler and the ready channel its batches are emitted on.
    pub fn new(
        config: SchedulerConfig,
        registry: Arc<ChainRegistry>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<Batch>) {
        let (ready_tx, ready_rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                config,
                registry,
                state: Mutex::new(SchedulerState::default()),
                ready_tx,
            }),
            ready_rx,
        )
    }

    /// Submit an anchor request. Returns the request id.
    ///
    /// The chain registry gates the target chain here: a strict registry
    /// rejects chains whose platform has no full strategy.
    pub fn submit_request(
        &self,
        proof_id: impl Into<String>,
        account_url: impl Into<String>,
        tx_hash: impl Into<String>,
        class: AnchorClass,
        target_chain: impl Into<String>,
    ) -> SchedulerResult<String> {
        let target_chain = target_chain.into();
        self.registry.ensure_accepts(&target_chain)?;

        let now = Utc::now();
        let request = AnchorRequest {
            request_id: Uuid::new_v4().to_string(),
            proof_id: proof_id.into(),
            account_url: account_url.into(),
            tx_hash: tx_hash.into(),
            class,
            target_chain: target_chain.clone(),
            status: RequestStatus::Pending,
            retry_count: 0,
            submitted_at: now,
            next_attempt_at: now,
            batch_id: None,
            last_error: None,
        };
        let request_id = request.request_id.clone();

        let mut state = self.state.lock();
        state
            .queues
            .entry((target_chain, class))
            .or_default()
            .push_back(request_id.clone());
        state.requests.insert(request_id.clone(), request);
        Ok(request_id)
    }

    /// A snapshot of one request.
    pub fn request(&self, request_id: &str) -> Option<AnchorRequest> {
        self.state.lock().requests.get(request_id).cloned()
    }

    /// A batch's current outcome.
    pub fn batch_outcome(&self, batch_id: &str) -> Option<BatchOutcome> {
        self.state
            .lock()
            .batches
            .get(batch_id)
            .map(|r| r.outcome.clone())
    }

    /// Aggregate counters.
    pub fn stats(&self) -> SchedulerStats {
        let state = self.state.lock();
        SchedulerStats {
            mean_batch_size: state.mean_batch_size,
            completed_batches: state.completed_batches,
            pending_requests: state
                .requests
                .values()
                .filter(|r| r.status == RequestStatus::Pending)
                .count(),
        }
    }

    /// Gather due requests and assemble batches, emitting each on the ready
    /// channel. Returns the ids of the batches created.
    ///
    /// `on_cadence` queues batch when the due count reaches the minimum size
    /// or the oldest due request has waited a full cadence interval;
    /// `on_demand` requests always batch, one request per batch.
    pub fn process_due(&self, now: DateTime<Utc>) -> SchedulerResult<Vec<String>> {
        let mut created = Vec::new();
        let mut state = self.state.lock();
        let keys: Vec<(String, AnchorClass)> = state.queues.keys().cloned().collect();

        for key in keys {
            let due: Vec<String> = {
                let queue = state.queues.get(&key).expect("queue exists");
                queue
                    .iter()
                    .filter(|id| {
                        state
                            .requests
                            .get(*id)
                            .map(|r| {
                                r.status == RequestStatus::Pending && r.next_attempt_at <= now
                            })
                            .unwrap_or(false)
                    })
                    .cloned()
                    .collect()
            };
            if due.is_empty() {
                continue;
            }

            let (chain, class) = &key;
            match class {
                AnchorClass::OnCadence => {
                    let oldest_wait = due
                        .iter()
                        .filter_map(|id| state.requests.get(id))
                        .map(|r| now - r.submitted_at)
                        .max()
                        .unwrap_or_else(ChronoDuration::zero);
                    let cadence =
                        ChronoDuration::from_std(self.config.cadence_interval).unwrap_or_else(
                            |_| ChronoDuration::seconds(900),
                        );
                    if due.len() >= self.config.min_batch_size || oldest_wait >= cadence {
                        let batch_id =
                            self.seal_batch(&mut state, chain.clone(), *class, &due, now)?;
                        created.push(batch_id);
                    }
                }
                AnchorClass::OnDemand => {
                    for id in due {
                        let batch_id = self.seal_batch(
                            &mut state,
                            chain.clone(),
                            *class,
                            std::slice::from_ref(&id),
                            now,
                        )?;
                        created.push(batch_id);
                    }
                }
            }
        }
        Ok(created)
    }

    fn seal_batch(
        &self,
        state: &mut SchedulerState,
        chain: String,
        class: AnchorClass,
        request_ids: &[String],
        now: DateTime<Utc>,
    ) -> SchedulerResult<String> {
        let batch_id = Uuid::new_v4().to_string();
        let mut batch = Batch::open(batch_id.clone(), class, chain.clone(), now);
        let mut leaves = Vec::with_capacity(request_ids.len());

        for id in request_ids {
            let request = state
                .requests
                .get_mut(id)
                .ok_or_else(|| SchedulerError::UnknownRequest(id.clone()))?;
            let leaf_hash = canonical_sha256(&LeafPreimage {
                account_url: &request.account_url,
                proof_id: &request.proof_id,
                tx_hash: &request.tx_hash,
            })?;
            batch.push(BatchLeaf {
                proof_id: request.proof_id.clone(),
                tx_hash: request.tx_hash.clone(),
                account_url: request.account_url.clone(),
                leaf_hash,
            })?;
            leaves.push(leaf_hash);
            request.transition(RequestStatus::Batched)?;
            request.batch_id = Some(batch_id.clone());
        }

        batch.seal(merkle_root(&leaves))?;

        // Drop batched members from their queue.
        if let Some(queue) = state.queues.get_mut(&(chain, class)) {
            queue.retain(|id| !request_ids.contains(id));
        }

        info!(
            batch_id,
            members = request_ids.len(),
            class = %class,
            "batch sealed"
        );
        state.batches.insert(
            batch_id.clone(),
            BatchRecord {
                batch: batch.clone(),
                outcome: BatchOutcome::InFlight,
                request_ids: request_ids.to_vec(),
            },
        );
        self.ready_tx
            .send(batch)
            .map_err(|_| SchedulerError::ChannelClosed)?;
        Ok(batch_id)
    }

    /// Mark a batch as picked up by the orchestrator.
    pub fn mark_batch_processing(&self, batch_id: &str) -> SchedulerResult<()> {
        let mut state = self.state.lock();
        let record = state
            .batches
            .get(batch_id)
            .ok_or_else(|| SchedulerError::UnknownBatch(batch_id.to_string()))?;
        if record.outcome.is_resolved() {
            return Err(SchedulerError::BatchAlreadyResolved {
                batch_id: batch_id.to_string(),
                status: format!("{:?}", record.outcome),
            });
        }
        let ids = record.request_ids.clone();
        for id in ids {
            if let Some(request) = state.requests.get_mut(&id) {
                request.transition(RequestStatus::Processing)?;
            }
        }
        Ok(())
    }

    /// Resolve a batch as anchored. Re-marking a resolved batch is rejected.
    pub fn mark_batch_completed(
        &self,
        batch_id: &str,
        anchor_tx_hash: impl Into<String>,
        block_number: u64,
    ) -> SchedulerResult<()> {
        let mut state = self.state.lock();
        let record = state
            .batches
            .get(batch_id)
            .ok_or_else(|| SchedulerError::UnknownBatch(batch_id.to_string()))?;
        if record.outcome.is_resolved() {
            return Err(SchedulerError::BatchAlreadyResolved {
                batch_id: batch_id.to_string(),
                status: format!("{:?}", record.outcome),
            });
        }
        let ids = record.request_ids.clone();
        let size = ids.len();

        for id in &ids {
            if let Some(request) = state.requests.get_mut(id) {
                if request.status == RequestStatus::Batched {
                    request.transition(RequestStatus::Processing)?;
                }
                request.transition(RequestStatus::Completed)?;
            }
        }

        state.completed_batches += 1;
        let n = state.completed_batches as f64;
        state.mean_batch_size += (size as f64 - state.mean_batch_size) / n;

        let record = state.batches.get_mut(batch_id).expect("checked above");
        record.outcome = BatchOutcome::Completed {
            anchor_tx_hash: anchor_tx_hash.into(),
            block_number,
        };
        Ok(())
    }

    /// Resolve a batch as failed. Members with retries remaining are
    /// re-queued after the fixed delay; the rest fail terminally.
    pub fn mark_batch_failed(
        &self,
        batch_id: &str,
        error: impl Into<String>,
    ) -> SchedulerResult<()> {
        let error = error.into();
        let mut state = self.state.lock();
        let record = state
            .batches
            .get(batch_id)
            .ok_or_else(|| SchedulerError::UnknownBatch(batch_id.to_string()))?;
        if record.outcome.is_resolved() {
            return Err(SchedulerError::BatchAlreadyResolved {
                batch_id: batch_id.to_string(),
                status: format!("{:?}", record.outcome),
            });
        }
        let ids = record.request_ids.clone();
        let retry_at = Utc::now()
            + ChronoDuration::from_std(self.config.retry_delay)
                .unwrap_or_else(|_| ChronoDuration::seconds(30));

        for id in &ids {
            let Some(request) = state.requests.get_mut(id) else {
                continue;
            };
            if request.status == RequestStatus::Batched {
                request.transition(RequestStatus::Processing)?;
            }
            request.last_error = Some(error.clone());
            if request.retry_count < self.config.max_retries {
                request.retry_count += 1;
                request.transition(RequestStatus::Pending)?;
                request.next_attempt_at = retry_at;
                request.batch_id = None;
                let key = (request.target_chain.clone(), request.class);
                state.queues.entry(key).or_default().push_back(id.clone());
            } else {
                request.transition(RequestStatus::Failed)?;
                warn!(request_id = %id, error, "request failed terminally");
            }
        }

        let record = state.batches.get_mut(batch_id).expect("checked above");
        record.outcome = BatchOutcome::Failed { reason: error };
        Ok(())
    }

    /// Background loop: wake on the check interval and assemble due batches
    /// until shutdown.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.config.batch_check_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!("anchor scheduler started");
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.process_due(Utc::now()) {
                        warn!(error = %e, "batch assembly failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("anchor scheduler stopping");
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cv_02_chain_strategy::{ChainStrategyConfig, MockChainStrategy};
    use shared_types::ChainPlatform;

    fn registry_with_ethereum(strict: bool) -> Arc<ChainRegistry> {
        let mut registry = ChainRegistry::new(strict);
        registry.register(
            "ethereum",
            Arc::new(MockChainStrategy::new(ChainStrategyConfig {
                platform: ChainPlatform::Evm,
                chain_id: 1,
                network_name: "mainnet".into(),
                rpc: "http://localhost".into(),
                rpc_backup: None,
                contract_address: "0x00".into(),
                required_confirmations: None,
                attestation_scheme: None,
                platform_config: None,
                gas_config: None,
                enabled: true,
            })),
        );
        registry.register(
            "ton-mainnet",
            Arc::new(MockChainStrategy::new(ChainStrategyConfig {
                platform: ChainPlatform::Ton,
                chain_id: 0,
                network_name: "mainnet".into(),
                rpc: "http://localhost".into(),
                rpc_backup: None,
                contract_address: "".into(),
                required_confirmations: None,
                attestation_scheme: None,
                platform_config: None,
                gas_config: None,
                enabled: true,
            })),
        );
        Arc::new(registry)
    }

    #[tokio::test]
    async fn on_demand_request_flushes_immediately_and_completes() {
        let (scheduler, mut ready) =
            AnchorScheduler::new(SchedulerConfig::default(), registry_with_ethereum(true));
        let request_id = scheduler
            .submit_request(
                "P1",
                "acc://demo/book/1",
                format!("0x{}", "aa".repeat(32)),
                AnchorClass::OnDemand,
                "ethereum",
            )
            .unwrap();

        let created = scheduler.process_due(Utc::now()).unwrap();
        assert_eq!(created.len(), 1);

        let batch = ready.recv().await.unwrap();
        assert_eq!(batch.batch_id, created[0]);
        assert_eq!(batch.leaves.len(), 1);
        assert!(batch.is_sealed());
        assert!(!batch.merkle_root.is_zero());

        scheduler.mark_batch_processing(&batch.batch_id).unwrap();
        scheduler
            .mark_batch_completed(&batch.batch_id, format!("0x{}", "bb".repeat(32)), 18_000_000)
            .unwrap();

        let request = scheduler.request(&request_id).unwrap();
        assert_eq!(request.status, RequestStatus::Completed);

        // Re-marking is rejected.
        assert!(matches!(
            scheduler.mark_batch_completed(&batch.batch_id, "0xdd", 1),
            Err(SchedulerError::BatchAlreadyResolved { .. })
        ));
        assert_eq!(scheduler.stats().mean_batch_size, 1.0);
    }

    #[tokio::test]
    async fn on_cadence_waits_for_min_batch() {
        let (scheduler, mut ready) =
            AnchorScheduler::new(SchedulerConfig::default(), registry_with_ethereum(true));
        for i in 0..2 {
            scheduler
                .submit_request(
                    format!("P{i}"),
                    "acc://demo/book/1",
                    format!("0x{i:064x}"),
                    AnchorClass::OnCadence,
                    "ethereum",
                )
                .unwrap();
        }
        // Two of three: no batch yet.
        assert!(scheduler.process_due(Utc::now()).unwrap().is_empty());

        scheduler
            .submit_request(
                "P2",
                "acc://demo/book/1",
                format!("0x{:064x}", 99),
                AnchorClass::OnCadence,
                "ethereum",
            )
            .unwrap();
        let created = scheduler.process_due(Utc::now()).unwrap();
        assert_eq!(created.len(), 1);
        let batch = ready.recv().await.unwrap();
        assert_eq!(batch.leaves.len(), 3);
        // Insertion order is preserved.
        assert_eq!(batch.leaves[0].proof_id, "P0");
        assert_eq!(batch.leaves[2].proof_id, "P2");
    }

    #[tokio::test]
    async fn on_cadence_ages_out_after_interval() {
        let (scheduler, mut ready) =
            AnchorScheduler::new(SchedulerConfig::default(), registry_with_ethereum(true));
        scheduler
            .submit_request(
                "P1",
                "acc://demo/book/1",
                format!("0x{}", "aa".repeat(32)),
                AnchorClass::OnCadence,
                "ethereum",
            )
            .unwrap();
        assert!(scheduler.process_due(Utc::now()).unwrap().is_empty());

        let later = Utc::now() + ChronoDuration::seconds(16 * 60);
        let created = scheduler.process_due(later).unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(ready.recv().await.unwrap().leaves.len(), 1);
    }

    #[tokio::test]
    async fn failed_batch_requeues_until_retries_exhausted() {
        let config = SchedulerConfig {
            max_retries: 1,
            retry_delay: std::time::Duration::from_secs(0),
            ..SchedulerConfig::default()
        };
        let (scheduler, mut ready) =
            AnchorScheduler::new(config, registry_with_ethereum(true));
        let request_id = scheduler
            .submit_request(
                "P1",
                "acc://demo/book/1",
                format!("0x{}", "aa".repeat(32)),
                AnchorClass::OnDemand,
                "ethereum",
            )
            .unwrap();

        // First attempt fails: request re-queued.
        scheduler.process_due(Utc::now()).unwrap();
        let batch = ready.recv().await.unwrap();
        scheduler.mark_batch_processing(&batch.batch_id).unwrap();
        scheduler.mark_batch_failed(&batch.batch_id, "rpc down").unwrap();
        let request = scheduler.request(&request_id).unwrap();
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.retry_count, 1);
        assert_eq!(request.last_error.as_deref(), Some("rpc down"));

        // Second attempt fails: terminal.
        scheduler
            .process_due(Utc::now() + ChronoDuration::seconds(1))
            .unwrap();
        let batch = ready.recv().await.unwrap();
        scheduler.mark_batch_processing(&batch.batch_id).unwrap();
        scheduler.mark_batch_failed(&batch.batch_id, "rpc down").unwrap();
        assert_eq!(
            scheduler.request(&request_id).unwrap().status,
            RequestStatus::Failed
        );
    }

    #[test]
    fn strict_registry_rejects_stub_chain_at_submit() {
        let (scheduler, _ready) =
            AnchorScheduler::new(SchedulerConfig::default(), registry_with_ethereum(true));
        let result = scheduler.submit_request(
            "P1",
            "acc://demo/book/1",
            "0xaaa",
            AnchorClass::OnDemand,
            "ton-mainnet",
        );
        assert!(matches!(result, Err(SchedulerError::Chain(_))));
    }

    #[test]
    fn lenient_registry_accepts_stub_chain() {
        let (scheduler, _ready) =
            AnchorScheduler::new(SchedulerConfig::default(), registry_with_ethereum(false));
        assert!(scheduler
            .submit_request(
                "P1",
                "acc://demo/book/1",
                "0xaaa",
                AnchorClass::OnDemand,
                "ton-mainnet",
            )
            .is_ok());
    }

    #[tokio::test]
    async fn background_loop_emits_within_one_interval() {
        let config = SchedulerConfig {
            batch_check_interval: std::time::Duration::from_millis(10),
            ..SchedulerConfig::default()
        };
        let (scheduler, mut ready) = AnchorScheduler::new(config, registry_with_ethereum(true));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(scheduler.clone().run(shutdown_rx));

        scheduler
            .submit_request(
                "P1",
                "acc://demo/book/1",
                format!("0x{}", "aa".repeat(32)),
                AnchorClass::OnDemand,
                "ethereum",
            )
            .unwrap();

        let batch = tokio::time::timeout(std::time::Duration::from_secs(1), ready.recv())
            .await
            .expect("batch within one interval")
            .unwrap();
        assert_eq!(batch.leaves[0].proof_id, "P1");

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
