//! Synchronous finality observation.

use crate::config::ObserverConfig;
use crate::domain::{build_inclusion_proof, ObservationResult};
use crate::error::{ObserverError, ObserverResult};
use crate::ports::EvmRpcApi;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Polls one chain until a transaction reaches the required confirmation
/// depth, then builds its inclusion proofs.
pub struct FinalityObserver<R> {
    rpc: Arc<R>,
    config: ObserverConfig,
}

impl<R: EvmRpcApi> FinalityObserver<R> {
    /// Create an observer over an RPC port.
    pub fn new(rpc: Arc<R>, config: ObserverConfig) -> Self {
        Self { rpc, config }
    }

    /// The underlying RPC port.
    pub fn rpc(&self) -> &Arc<R> {
        &self.rpc
    }

    /// One polling step. Retry-carrying results (`NotYetMined`,
    /// `NotYetFinalized`) mean "poll again"; anything else is conclusive.
    pub async fn poll_once(
        &self,
        tx_hash: &str,
        required_confirmations: u64,
    ) -> ObserverResult<ObservationResult> {
        let receipt = self
            .rpc
            .transaction_receipt(tx_hash)
            .await?
            .ok_or_else(|| ObserverError::NotYetMined {
                tx_hash: tx_hash.to_string(),
            })?;

        let head = self.rpc.block_number().await?;
        let confirmations = head.saturating_sub(receipt.block_number) + 1;
        if confirmations < required_confirmations {
            return Err(ObserverError::NotYetFinalized {
                tx_hash: tx_hash.to_string(),
                confirmations,
                required: required_confirmations,
            });
        }

        if receipt.status == 0 {
            return Err(ObserverError::TransactionFailed {
                tx_hash: tx_hash.to_string(),
            });
        }

        let block = self
            .rpc
            .block_by_number(receipt.block_number)
            .await?
            .ok_or(ObserverError::MissingBlock(receipt.block_number))?;
        let receipts = self.rpc.block_receipts(receipt.block_number).await?;
        let index = receipt.transaction_index as usize;

        // Rebuild both tries in block order and extract the target paths.
        let tx_values: Vec<Vec<u8>> = block.transactions.iter().map(|t| t.raw.clone()).collect();
        let receipt_values: Vec<Vec<u8>> = receipts.iter().map(|r| r.trie_encoding()).collect();
        let merkle_proof = match build_inclusion_proof(&tx_values, index) {
            Ok(proof) => Some(proof),
            Err(e) => {
                warn!(tx_hash, error = %e, "transaction trie proof unavailable");
                None
            }
        };
        let receipt_proof = match build_inclusion_proof(&receipt_values, index) {
            Ok(proof) => Some(proof),
            Err(e) => {
                warn!(tx_hash, error = %e, "receipt trie proof unavailable");
                None
            }
        };

        Ok(ObservationResult {
            tx_hash: tx_hash.to_string(),
            block_number: receipt.block_number,
            block_hash: receipt.block_hash.clone(),
            confirmations,
            required_confirmations,
            success: receipt.status == 1,
            gas_used: receipt.gas_used.low_u64(),
            state_root: Some(block.state_root.clone()),
            transactions_root: Some(block.transactions_root.clone()),
            receipts_root: Some(block.receipts_root.clone()),
            merkle_proof,
            receipt_proof,
            observed_at: Utc::now(),
        })
    }

    /// Block until the transaction finalizes or the configured deadline
    /// elapses. RPC failures are retried alongside the retry-carrying
    /// observations; conclusive failures abort immediately.
    pub async fn observe(
        &self,
        tx_hash: &str,
        required_confirmations: u64,
    ) -> ObserverResult<ObservationResult> {
        let started = Instant::now();
        loop {
            match self.poll_once(tx_hash, required_confirmations).await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retry_carrying() => {
                    debug!(tx_hash, status = %e, "still waiting");
                }
                Err(ObserverError::Rpc(reason)) => {
                    warn!(tx_hash, reason, "RPC failure, will retry");
                }
                Err(e) => return Err(e),
            }
            if started.elapsed() >= self.config.timeout {
                return Err(ObserverError::Timeout {
                    tx_hash: tx_hash.to_string(),
                    waited_secs: started.elapsed().as_secs(),
                });
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }
}
