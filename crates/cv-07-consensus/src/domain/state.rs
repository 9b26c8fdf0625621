//! In-memory consensus state.

use super::block::ValidatorBlock;
use shared_crypto::hashing::sha256;
use shared_types::Hash32;
use std::collections::{BTreeMap, BTreeSet};

/// Maximum validator blocks kept in memory; pruned oldest-height first.
pub const BLOCK_CACHE_CAPACITY: usize = 1000;

/// Outcome of one commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitResult {
    /// Height after the commit.
    pub height: u64,
    /// Application hash after the commit.
    pub app_hash: Hash32,
    /// Whether a new consensus entry was inserted (false on replay).
    pub entry_inserted: bool,
}

/// Mutable consensus state, guarded by the service's single writer.
#[derive(Debug, Default)]
pub struct ConsensusState {
    /// Last committed height.
    pub height: u64,
    /// Order-independent XOR over the hashes of stored bundle ids.
    pub app_hash: Hash32,
    bundle_ids: BTreeSet<String>,
    cache: BTreeMap<u64, ValidatorBlock>,
}

impl ConsensusState {
    /// Empty state at height 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a bundle id is already folded into the app hash.
    pub fn contains_bundle(&self, bundle_id: &str) -> bool {
        self.bundle_ids.contains(bundle_id)
    }

    /// Fold a bundle id into the application hash. XOR makes the fold
    /// order-independent; the sorted set keeps the stored ids canonical.
    pub fn fold_bundle(&mut self, bundle_id: &str) {
        if !self.bundle_ids.insert(bundle_id.to_string()) {
            return;
        }
        let mut next = [0u8; 32];
        let bundle_hash = sha256(bundle_id.as_bytes());
        for (i, byte) in next.iter_mut().enumerate() {
            *byte = self.app_hash.0[i] ^ bundle_hash.0[i];
        }
        self.app_hash = Hash32::from_bytes(next);
    }

    /// Recompute the app hash from scratch over the sorted bundle ids.
    pub fn recompute_app_hash(&self) -> Hash32 {
        let mut acc = [0u8; 32];
        for bundle_id in &self.bundle_ids {
            let h = sha256(bundle_id.as_bytes());
            for (i, byte) in acc.iter_mut().enumerate() {
                *byte ^= h.0[i];
            }
        }
        Hash32::from_bytes(acc)
    }

    /// Cache a committed block, pruning oldest heights beyond capacity.
    pub fn cache_block(&mut self, block: ValidatorBlock) {
        self.cache.insert(block.block_height, block);
        while self.cache.len() > BLOCK_CACHE_CAPACITY {
            let oldest = *self.cache.keys().next().expect("non-empty");
            self.cache.remove(&oldest);
        }
    }

    /// A cached block by height.
    pub fn cached_block(&self, height: u64) -> Option<&ValidatorBlock> {
        self.cache.get(&height)
    }

    /// Number of cached blocks.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Fast-forward to persisted state during recovery.
    pub fn fast_forward(&mut self, height: u64, app_hash: Hash32) {
        self.height = height;
        self.app_hash = app_hash;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::block::{BlockGovernance, ValidatorBlock};
    use chrono::Utc;
    use shared_types::AnchorClass;

    fn block_at(height: u64) -> ValidatorBlock {
        ValidatorBlock {
            bundle_id: format!("bundle-{height}"),
            block_height: height,
            timestamp: Utc::now(),
            validator_id: "v1".into(),
            operation_commitment: "commit".into(),
            merkle_root: Hash32::ZERO,
            synthetic_transactions: vec![],
            governance_proof: BlockGovernance::default(),
            cross_chain_proof: serde_json::Value::Null,
            stage: "anchored".into(),
            proof_class: AnchorClass::OnDemand,
            accumulate_anchor_reference: None,
        }
    }

    #[test]
    fn app_hash_is_order_independent() {
        let mut a = ConsensusState::new();
        a.fold_bundle("b1");
        a.fold_bundle("b2");
        let mut b = ConsensusState::new();
        b.fold_bundle("b2");
        b.fold_bundle("b1");
        assert_eq!(a.app_hash, b.app_hash);
        assert_eq!(a.app_hash, a.recompute_app_hash());
    }

    #[test]
    fn refolding_a_bundle_is_a_noop() {
        let mut state = ConsensusState::new();
        state.fold_bundle("b1");
        let first = state.app_hash;
        state.fold_bundle("b1");
        assert_eq!(state.app_hash, first);
    }

    #[test]
    fn cache_prunes_oldest_first() {
        let mut state = ConsensusState::new();
        for height in 0..(BLOCK_CACHE_CAPACITY as u64 + 5) {
            state.cache_block(block_at(height));
        }
        assert_eq!(state.cache_len(), BLOCK_CACHE_CAPACITY);
        assert!(state.cached_block(0).is_none());
        assert!(state.cached_block(4).is_none());
        assert!(state.cached_block(5).is_some());
    }
}
