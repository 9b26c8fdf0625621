//! Background finality tracking.
//!
//! A single polling loop manages a set of pending transactions and fires
//! `on_finalized` / `on_failed` callbacks. The loop owns the pending map;
//! registration happens through a shared handle.

use crate::domain::ObservationResult;
use crate::error::ObserverError;
use crate::ports::EvmRpcApi;
use crate::service::FinalityObserver;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Callback invoked when a tracked transaction finalizes.
pub type OnFinalized = Box<dyn Fn(ObservationResult) + Send + Sync>;
/// Callback invoked when a tracked transaction conclusively fails.
pub type OnFailed = Box<dyn Fn(String, ObserverError) + Send + Sync>;

struct PendingTx {
    required_confirmations: u64,
}

/// Background tracker over one chain's RPC port.
pub struct BackgroundTracker<R> {
    observer: Arc<FinalityObserver<R>>,
    pending: Arc<Mutex<HashMap<String, PendingTx>>>,
    poll_interval: Duration,
    on_finalized: OnFinalized,
    on_failed: OnFailed,
    shutdown: watch::Receiver<bool>,
}

/// Handle for registering transactions and stopping the loop.
#[derive(Clone)]
pub struct TrackerHandle {
    pending: Arc<Mutex<HashMap<String, PendingTx>>>,
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl TrackerHandle {
    /// Track a transaction until finality.
    pub fn track(&self, tx_hash: impl Into<String>, required_confirmations: u64) {
        self.pending.lock().insert(
            tx_hash.into(),
            PendingTx {
                required_confirmations,
            },
        );
    }

    /// Number of transactions still pending.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Stop the polling loop.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

impl<R: EvmRpcApi + 'static> BackgroundTracker<R> {
    /// Build a tracker and its handle.
    pub fn new(
        observer: Arc<FinalityObserver<R>>,
        poll_interval: Duration,
        on_finalized: OnFinalized,
        on_failed: OnFailed,
    ) -> (Self, TrackerHandle) {
        let pending = Arc::new(Mutex::new(HashMap::new()));
        let (shutdown_tx, shutdown) = watch::channel(false);
        let handle = TrackerHandle {
            pending: pending.clone(),
            shutdown_tx: Arc::new(shutdown_tx),
        };
        (
            Self {
                observer,
                pending,
                poll_interval,
                on_finalized,
                on_failed,
                shutdown,
            },
            handle,
        )
    }

    /// Run the polling loop until shutdown.
    pub async fn run(self) {
        let mut shutdown = self.shutdown.clone();
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!("background tracker started");
        loop {
            tokio::select! {
                _ = interval.tick() => self.poll_all().await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("background tracker stopping");
                        return;
                    }
                }
            }
        }
    }

    async fn poll_all(&self) {
        let snapshot: Vec<(String, u64)> = self
            .pending
            .lock()
            .iter()
            .map(|(hash, tx)| (hash.clone(), tx.required_confirmations))
            .collect();

        for (tx_hash, required) in snapshot {
            match self.observer.poll_once(&tx_hash, required).await {
                Ok(result) => {
                    self.pending.lock().remove(&tx_hash);
                    (self.on_finalized)(result);
                }
                Err(e) if e.is_retry_carrying() => {
                    debug!(tx_hash, status = %e, "still pending");
                }
                Err(ObserverError::Rpc(reason)) => {
                    warn!(tx_hash, reason, "RPC failure, keeping transaction");
                }
                Err(e) => {
                    self.pending.lock().remove(&tx_hash);
                    (self.on_failed)(tx_hash, e);
                }
            }
        }
    }
}
