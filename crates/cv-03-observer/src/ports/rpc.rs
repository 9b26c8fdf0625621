//! # Outbound Ports
//!
//! The RPC surface the observer needs from an EVM node.

use crate::domain::{EvmBlock, EvmReceipt};
use crate::error::ObserverResult;
use async_trait::async_trait;

/// EVM JSON-RPC surface used by the observer and the EVM chain strategy.
///
/// Implementations must be safe for concurrent use.
#[async_trait]
pub trait EvmRpcApi: Send + Sync {
    /// Latest block number.
    async fn block_number(&self) -> ObserverResult<u64>;

    /// Numeric chain id.
    async fn chain_id(&self) -> ObserverResult<u64>;

    /// Receipt for a transaction, `None` while unmined.
    async fn transaction_receipt(&self, tx_hash: &str) -> ObserverResult<Option<EvmReceipt>>;

    /// Block with raw transactions, `None` if unknown.
    async fn block_by_number(&self, number: u64) -> ObserverResult<Option<EvmBlock>>;

    /// All receipts of a block, in transaction order.
    async fn block_receipts(&self, number: u64) -> ObserverResult<Vec<EvmReceipt>>;

    /// Broadcast a raw signed transaction, returning its hash.
    async fn send_raw_transaction(&self, raw: &[u8]) -> ObserverResult<String>;

    /// Nonce of an account (`0x`-prefixed address), latest block.
    async fn transaction_count(&self, address: &str) -> ObserverResult<u64>;

    /// Current gas price in wei.
    async fn gas_price(&self) -> ObserverResult<u128>;
}

// =============================================================================
// Mock Implementation for Testing
// =============================================================================

/// Mock RPC node backed by in-memory state.
#[derive(Default)]
pub struct MockEvmRpc {
    inner: parking_lot::RwLock<MockState>,
}

#[derive(Default)]
struct MockState {
    /// Latest block number.
    pub head: u64,
    /// Chain id.
    pub chain_id: u64,
    /// Receipts by transaction hash.
    pub receipts: std::collections::HashMap<String, EvmReceipt>,
    /// Blocks by number.
    pub blocks: std::collections::HashMap<u64, EvmBlock>,
    /// Receipts by block number.
    pub receipts_by_block: std::collections::HashMap<u64, Vec<EvmReceipt>>,
    /// Fail every call when set.
    pub failing: bool,
    /// Hashes handed out for submitted raw transactions.
    pub submitted: Vec<String>,
}

impl MockEvmRpc {
    /// Mock with a chain id and head block.
    pub fn new(chain_id: u64, head: u64) -> Self {
        let mock = Self::default();
        {
            let mut state = mock.inner.write();
            state.chain_id = chain_id;
            state.head = head;
        }
        mock
    }

    /// Advance the head block.
    pub fn set_head(&self, head: u64) {
        self.inner.write().head = head;
    }

    /// Register a receipt for a transaction hash.
    pub fn insert_receipt(&self, receipt: EvmReceipt) {
        let mut state = self.inner.write();
        state
            .receipts_by_block
            .entry(receipt.block_number)
            .or_default()
            .push(receipt.clone());
        state.receipts.insert(receipt.transaction_hash.clone(), receipt);
    }

    /// Register a block.
    pub fn insert_block(&self, block: EvmBlock) {
        self.inner.write().blocks.insert(block.number, block);
    }

    /// Make every call fail.
    pub fn set_failing(&self, failing: bool) {
        self.inner.write().failing = failing;
    }

    /// Raw transactions submitted through the mock.
    pub fn submitted(&self) -> Vec<String> {
        self.inner.read().submitted.clone()
    }

    fn check_failing(&self) -> ObserverResult<()> {
        if self.inner.read().failing {
            Err(crate::error::ObserverError::Rpc("mock failure".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl EvmRpcApi for MockEvmRpc {
    async fn block_number(&self) -> ObserverResult<u64> {
        self.check_failing()?;
        Ok(self.inner.read().head)
    }

    async fn chain_id(&self) -> ObserverResult<u64> {
        self.check_failing()?;
        Ok(self.inner.read().chain_id)
    }

    async fn transaction_receipt(&self, tx_hash: &str) -> ObserverResult<Option<EvmReceipt>> {
        self.check_failing()?;
        Ok(self.inner.read().receipts.get(tx_hash).cloned())
    }

    async fn block_by_number(&self, number: u64) -> ObserverResult<Option<EvmBlock>> {
        self.check_failing()?;
        Ok(self.inner.read().blocks.get(&number).cloned())
    }

    async fn block_receipts(&self, number: u64) -> ObserverResult<Vec<EvmReceipt>> {
        self.check_failing()?;
        Ok(self
            .inner
            .read()
            .receipts_by_block
            .get(&number)
            .cloned()
            .unwrap_or_default())
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> ObserverResult<String> {
        self.check_failing()?;
        let hash = format!(
            "0x{}",
            shared_crypto::hashing::keccak256(raw).to_hex()
        );
        self.inner.write().submitted.push(hash.clone());
        Ok(hash)
    }

    async fn transaction_count(&self, _address: &str) -> ObserverResult<u64> {
        self.check_failing()?;
        Ok(self.inner.read().submitted.len() as u64)
    }

    async fn gas_price(&self) -> ObserverResult<u128> {
        self.check_failing()?;
        Ok(1_000_000_000)
    }
}
