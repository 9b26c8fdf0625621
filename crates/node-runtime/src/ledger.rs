//! Source-ledger JSON-RPC adapter.
//!
//! Thin client over the Accumulate-side RPC surface the orchestrator needs;
//! the ledger node itself shapes the responses, this adapter only transports
//! and deserializes them.

use async_trait::async_trait;
use cv_01_proof_model::{ChainedProof, GovernanceProof};
use cv_06_orchestrator::{SourceLedger, SyntheticTransaction};
use serde_json::{json, Value};
use shared_types::Hash32;
use std::sync::atomic::{AtomicU64, Ordering};

/// HTTP JSON-RPC client for the source ledger.
pub struct JsonRpcSourceLedger {
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl JsonRpcSourceLedger {
    /// Client for a ledger RPC endpoint.
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            next_id: AtomicU64::new(1),
        }
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, String> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
            "method": method,
            "params": params,
        });
        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("ledger unreachable: {e}"))?;
        let envelope: Value = response
            .json()
            .await
            .map_err(|e| format!("ledger sent malformed response: {e}"))?;
        if let Some(error) = envelope.get("error") {
            if !error.is_null() {
                return Err(format!("ledger error: {error}"));
            }
        }
        envelope
            .get("result")
            .cloned()
            .ok_or_else(|| "missing result field".to_string())
    }
}

#[async_trait]
impl SourceLedger for JsonRpcSourceLedger {
    async fn chained_proof(
        &self,
        account_url: &str,
        tx_hash: &str,
        partition: &str,
    ) -> Result<ChainedProof, String> {
        let result = self
            .call(
                "query-receipt",
                json!({
                    "account_url": account_url,
                    "tx_hash": tx_hash,
                    "partition": partition,
                }),
            )
            .await?;
        serde_json::from_value(result).map_err(|e| format!("malformed receipt chain: {e}"))
    }

    async fn governance_proof(&self, operation_id: &Hash32) -> Result<GovernanceProof, String> {
        let result = self
            .call(
                "query-governance",
                json!({ "operation_id": operation_id.to_hex() }),
            )
            .await?;
        serde_json::from_value(result).map_err(|e| format!("malformed governance proof: {e}"))
    }

    async fn submit_synthetic_transaction(
        &self,
        tx: &SyntheticTransaction,
    ) -> Result<String, String> {
        let result = self
            .call(
                "execute-synthetic",
                serde_json::to_value(tx).map_err(|e| e.to_string())?,
            )
            .await?;
        result
            .get("txid")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| "missing txid in ledger response".to_string())
    }
}
