//! JSON-RPC adapter over HTTP.
//!
//! Implements [`EvmRpcApi`] against a standard EVM node. Requests go to the
//! primary endpoint first and fail over to the backup, when configured.

use crate::domain::{EvmBlock, EvmLog, EvmReceipt, EvmTransaction};
use crate::error::{ObserverError, ObserverResult};
use crate::ports::EvmRpcApi;
use async_trait::async_trait;
use ethereum_types::{H160, H256, U256};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

/// HTTP JSON-RPC client for an EVM node.
pub struct HttpEvmRpc {
    client: reqwest::Client,
    url: String,
    backup_url: Option<String>,
    next_id: AtomicU64,
}

impl HttpEvmRpc {
    /// Create a client for a primary endpoint and an optional backup.
    pub fn new(url: String, backup_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            backup_url,
            next_id: AtomicU64::new(1),
        }
    }

    async fn call(&self, method: &str, params: Value) -> ObserverResult<Value> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
            "method": method,
            "params": params,
        });

        match self.call_endpoint(&self.url, &body).await {
            Ok(result) => Ok(result),
            Err(primary_err) => match &self.backup_url {
                Some(backup) => {
                    warn!(method, error = %primary_err, "primary RPC failed, trying backup");
                    self.call_endpoint(backup, &body).await
                }
                None => Err(primary_err),
            },
        }
    }

    async fn call_endpoint(&self, url: &str, body: &Value) -> ObserverResult<Value> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| ObserverError::Rpc(e.to_string()))?;
        let envelope: Value = response
            .json()
            .await
            .map_err(|e| ObserverError::Rpc(e.to_string()))?;
        if let Some(error) = envelope.get("error") {
            if !error.is_null() {
                return Err(ObserverError::Rpc(error.to_string()));
            }
        }
        envelope
            .get("result")
            .cloned()
            .ok_or_else(|| ObserverError::Rpc("missing result field".into()))
    }
}

fn hex_u64(value: &Value) -> ObserverResult<u64> {
    let s = value
        .as_str()
        .ok_or_else(|| ObserverError::Rpc(format!("expected hex quantity, got {value}")))?;
    u64::from_str_radix(s.trim_start_matches("0x"), 16)
        .map_err(|e| ObserverError::Rpc(format!("bad hex quantity {s}: {e}")))
}

fn hex_u256(value: &Value) -> ObserverResult<U256> {
    let s = value
        .as_str()
        .ok_or_else(|| ObserverError::Rpc(format!("expected hex quantity, got {value}")))?;
    U256::from_str_radix(s.trim_start_matches("0x"), 16)
        .map_err(|e| ObserverError::Rpc(format!("bad hex quantity {s}: {e}")))
}

fn hex_bytes(value: &Value) -> ObserverResult<Vec<u8>> {
    let s = value
        .as_str()
        .ok_or_else(|| ObserverError::Rpc(format!("expected hex data, got {value}")))?;
    hex::decode(s.trim_start_matches("0x"))
        .map_err(|e| ObserverError::Rpc(format!("bad hex data: {e}")))
}

fn required_str(value: &Value, field: &str) -> ObserverResult<String> {
    value[field]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ObserverError::Rpc(format!("missing field {field}")))
}

fn parse_receipt(value: &Value) -> ObserverResult<EvmReceipt> {
    let logs = value["logs"]
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .map(|log| {
                    let address_bytes = hex_bytes(&log["address"])?;
                    let topics = log["topics"]
                        .as_array()
                        .map(|topics| {
                            topics
                                .iter()
                                .map(|t| Ok(H256::from_slice(&hex_bytes(t)?)))
                                .collect::<ObserverResult<Vec<H256>>>()
                        })
                        .transpose()?
                        .unwrap_or_default();
                    Ok(EvmLog {
                        address: H160::from_slice(&address_bytes),
                        topics,
                        data: hex_bytes(&log["data"])?,
                    })
                })
                .collect::<ObserverResult<Vec<EvmLog>>>()
        })
        .transpose()?
        .unwrap_or_default();

    Ok(EvmReceipt {
        transaction_hash: required_str(value, "transactionHash")?,
        transaction_index: hex_u64(&value["transactionIndex"])?,
        block_number: hex_u64(&value["blockNumber"])?,
        block_hash: required_str(value, "blockHash")?,
        status: hex_u64(&value["status"])?,
        gas_used: hex_u256(&value["gasUsed"])?,
        cumulative_gas_used: hex_u256(&value["cumulativeGasUsed"])?,
        logs_bloom: hex_bytes(&value["logsBloom"])?,
        logs,
        tx_type: value
            .get("type")
            .map(hex_u64)
            .transpose()?
            .unwrap_or(0) as u8,
    })
}

#[async_trait]
impl EvmRpcApi for HttpEvmRpc {
    async fn block_number(&self) -> ObserverResult<u64> {
        hex_u64(&self.call("eth_blockNumber", json!([])).await?)
    }

    async fn chain_id(&self) -> ObserverResult<u64> {
        hex_u64(&self.call("eth_chainId", json!([])).await?)
    }

    async fn transaction_receipt(&self, tx_hash: &str) -> ObserverResult<Option<EvmReceipt>> {
        let result = self
            .call("eth_getTransactionReceipt", json!([tx_hash]))
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        parse_receipt(&result).map(Some)
    }

    async fn block_by_number(&self, number: u64) -> ObserverResult<Option<EvmBlock>> {
        let tag = format!("0x{number:x}");
        let result = self
            .call("eth_getBlockByNumber", json!([tag, false]))
            .await?;
        if result.is_null() {
            return Ok(None);
        }

        let tx_hashes: Vec<String> = result["transactions"]
            .as_array()
            .map(|txs| {
                txs.iter()
                    .filter_map(|t| t.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        // The trie needs the raw signed bytes of every transaction, in order.
        let mut transactions = Vec::with_capacity(tx_hashes.len());
        for (index, hash) in tx_hashes.iter().enumerate() {
            let raw = self
                .call(
                    "eth_getRawTransactionByBlockNumberAndIndex",
                    json!([tag, format!("0x{index:x}")]),
                )
                .await?;
            transactions.push(EvmTransaction {
                hash: hash.clone(),
                index: index as u64,
                raw: hex_bytes(&raw)?,
            });
        }

        Ok(Some(EvmBlock {
            number,
            hash: required_str(&result, "hash")?,
            parent_hash: required_str(&result, "parentHash")?,
            state_root: required_str(&result, "stateRoot")?,
            transactions_root: required_str(&result, "transactionsRoot")?,
            receipts_root: required_str(&result, "receiptsRoot")?,
            timestamp: hex_u64(&result["timestamp"])?,
            transactions,
        }))
    }

    async fn block_receipts(&self, number: u64) -> ObserverResult<Vec<EvmReceipt>> {
        let result = self
            .call("eth_getBlockReceipts", json!([format!("0x{number:x}")]))
            .await?;
        result
            .as_array()
            .ok_or_else(|| ObserverError::Rpc("expected receipt array".into()))?
            .iter()
            .map(parse_receipt)
            .collect()
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> ObserverResult<String> {
        let result = self
            .call(
                "eth_sendRawTransaction",
                json!([format!("0x{}", hex::encode(raw))]),
            )
            .await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ObserverError::Rpc("expected transaction hash".into()))
    }

    async fn transaction_count(&self, address: &str) -> ObserverResult<u64> {
        hex_u64(
            &self
                .call("eth_getTransactionCount", json!([address, "latest"]))
                .await?,
        )
    }

    async fn gas_price(&self) -> ObserverResult<u128> {
        let value = self.call("eth_gasPrice", json!([])).await?;
        let quantity = hex_u256(&value)?;
        Ok(quantity.low_u128())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_quantities() {
        assert_eq!(hex_u64(&json!("0x10")).unwrap(), 16);
        assert_eq!(hex_u64(&json!("0x0")).unwrap(), 0);
        assert!(hex_u64(&json!(16)).is_err());
        assert!(hex_u64(&json!("0xzz")).is_err());
    }

    #[test]
    fn parses_receipt_json() {
        let value = json!({
            "transactionHash": "0xaaa",
            "transactionIndex": "0x1",
            "blockNumber": "0x112a880",
            "blockHash": "0xbbb",
            "status": "0x1",
            "gasUsed": "0x5208",
            "cumulativeGasUsed": "0xa410",
            "logsBloom": format!("0x{}", "00".repeat(256)),
            "type": "0x2",
            "logs": [{
                "address": format!("0x{}", "11".repeat(20)),
                "topics": [format!("0x{}", "22".repeat(32))],
                "data": "0x0102",
            }],
        });
        let receipt = parse_receipt(&value).unwrap();
        assert_eq!(receipt.transaction_index, 1);
        assert_eq!(receipt.block_number, 18_000_000);
        assert_eq!(receipt.status, 1);
        assert_eq!(receipt.tx_type, 2);
        assert_eq!(receipt.logs.len(), 1);
        assert_eq!(receipt.logs[0].data, vec![1, 2]);
    }

    #[test]
    fn missing_fields_are_rpc_errors() {
        let value = json!({"transactionHash": "0xaaa"});
        assert!(parse_receipt(&value).is_err());
    }
}
