//! Observation entities: EVM blocks, transactions, receipts and the
//! inclusion proofs built from them.

use super::trie::{key_nibbles, PatriciaTrie};
use crate::error::{ObserverError, ObserverResult};
use chrono::{DateTime, Utc};
use ethereum_types::{H160, H256, U256};
use rlp::RlpStream;
use serde::{Deserialize, Serialize};

/// A log entry emitted by a receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvmLog {
    /// Emitting contract address.
    pub address: H160,
    /// Indexed topics.
    pub topics: Vec<H256>,
    /// Unindexed data.
    #[serde(with = "hex::serde")]
    pub data: Vec<u8>,
}

impl EvmLog {
    fn rlp_append(&self, stream: &mut RlpStream) {
        stream.begin_list(3);
        stream.append(&self.address);
        stream.append_list(&self.topics);
        stream.append(&self.data);
    }
}

/// A transaction receipt as returned by the RPC layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvmReceipt {
    /// Transaction hash (keeps `0x`).
    pub transaction_hash: String,
    /// Index of the transaction within its block.
    pub transaction_index: u64,
    /// Block number of inclusion.
    pub block_number: u64,
    /// Block hash of inclusion (keeps `0x`).
    pub block_hash: String,
    /// Execution status: 1 success, 0 reverted.
    pub status: u64,
    /// Gas used by this transaction alone.
    pub gas_used: U256,
    /// Cumulative gas used in the block up to and including this receipt.
    pub cumulative_gas_used: U256,
    /// 256-byte logs bloom.
    #[serde(with = "hex::serde")]
    pub logs_bloom: Vec<u8>,
    /// Emitted logs.
    pub logs: Vec<EvmLog>,
    /// Transaction envelope type (0 legacy, 1/2/3 typed).
    pub tx_type: u8,
}

impl EvmReceipt {
    /// Consensus RLP encoding of the receipt, as stored in the receipt trie.
    ///
    /// Typed transactions prefix the RLP payload with their envelope byte.
    pub fn trie_encoding(&self) -> Vec<u8> {
        let mut stream = RlpStream::new_list(4);
        stream.append(&self.status);
        stream.append(&self.cumulative_gas_used);
        stream.append(&self.logs_bloom);
        stream.begin_list(self.logs.len());
        for log in &self.logs {
            log.rlp_append(&mut stream);
        }
        let payload = stream.out().to_vec();
        if self.tx_type == 0 {
            payload
        } else {
            let mut out = Vec::with_capacity(payload.len() + 1);
            out.push(self.tx_type);
            out.extend_from_slice(&payload);
            out
        }
    }
}

/// A transaction as it enters the transaction trie: its raw signed bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvmTransaction {
    /// Transaction hash (keeps `0x`).
    pub hash: String,
    /// Index within the block.
    pub index: u64,
    /// Raw signed transaction bytes (typed envelope included).
    #[serde(with = "hex::serde")]
    pub raw: Vec<u8>,
}

/// A block header plus its ordered transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvmBlock {
    /// Block number.
    pub number: u64,
    /// Block hash (keeps `0x`).
    pub hash: String,
    /// Parent block hash.
    pub parent_hash: String,
    /// State trie root.
    pub state_root: String,
    /// Transactions trie root.
    pub transactions_root: String,
    /// Receipts trie root.
    pub receipts_root: String,
    /// Block timestamp (unix seconds).
    pub timestamp: u64,
    /// Ordered transactions.
    pub transactions: Vec<EvmTransaction>,
}

/// Inclusion proof extracted from a reconstructed trie.
///
/// `proof_nodes` are the RLP encodings of the hash-referenced nodes on the
/// path; each node's key in the trie is its Keccak-256. `directions` is the
/// nibble expansion of the key, which drives every branch decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrieInclusionProof {
    /// Reconstructed trie root (hex, keeps `0x`).
    pub root: String,
    /// RLP-encoded trie key (`rlp(index)`), hex.
    #[serde(with = "hex::serde")]
    pub key: Vec<u8>,
    /// RLP node encodings, root first.
    pub proof_nodes: Vec<String>,
    /// Nibble path of the key.
    pub directions: Vec<u8>,
}

/// Build the inclusion proof for `index` over ordered trie values.
pub fn build_inclusion_proof(values: &[Vec<u8>], index: usize) -> ObserverResult<TrieInclusionProof> {
    if index >= values.len() {
        return Err(ObserverError::Proof(format!(
            "index {index} out of range for {} values",
            values.len()
        )));
    }
    let trie = PatriciaTrie::from_ordered_values(values);
    let key = rlp::encode(&index).to_vec();
    let proof_nodes = trie
        .prove(&key)
        .ok_or_else(|| ObserverError::Proof(format!("no proof path for index {index}")))?;
    Ok(TrieInclusionProof {
        root: format!("0x{}", hex::encode(trie.root().as_bytes())),
        directions: key_nibbles(&key),
        proof_nodes: proof_nodes.iter().map(hex::encode).collect(),
        key,
    })
}

/// Everything the observer learned about a finalized transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationResult {
    /// Observed transaction hash (keeps `0x`).
    pub tx_hash: String,
    /// Block number of inclusion.
    pub block_number: u64,
    /// Block hash of inclusion.
    pub block_hash: String,
    /// Confirmations at observation time.
    pub confirmations: u64,
    /// Confirmations the chain requires for finality.
    pub required_confirmations: u64,
    /// Whether the transaction executed successfully.
    pub success: bool,
    /// Gas used by the transaction.
    pub gas_used: u64,
    /// State trie root of the including block.
    pub state_root: Option<String>,
    /// Transactions trie root of the including block.
    pub transactions_root: Option<String>,
    /// Receipts trie root of the including block.
    pub receipts_root: Option<String>,
    /// Transaction inclusion proof.
    pub merkle_proof: Option<TrieInclusionProof>,
    /// Receipt inclusion proof.
    pub receipt_proof: Option<TrieInclusionProof>,
    /// When the observation completed.
    pub observed_at: DateTime<Utc>,
}
