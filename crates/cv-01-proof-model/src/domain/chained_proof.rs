//! Chained proof entities.
//!
//! A three-layer Merkle-receipt chain from a transaction to the source
//! network root: account chain (L1), partition anchor chain (L2), directory
//! network chain (L3). Each layer folds its entries into its start hash and
//! must land exactly on its stored anchor; adjacent layers must share their
//! boundary hash.

use serde::{Deserialize, Serialize};
use shared_crypto::hashing::fold_step;
use shared_types::Hash32;

/// One step of a Merkle receipt path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofEntry {
    /// Sibling hash combined at this step.
    pub hash: Hash32,
    /// Whether the sibling sits on the right of the running hash.
    pub right: bool,
}

/// One layer of the chained proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofLayer {
    /// Hash the fold starts from.
    pub start: Hash32,
    /// Ordered receipt entries.
    pub entries: Vec<ProofEntry>,
    /// Anchor the fold must land on.
    pub anchor: Hash32,
}

impl ProofLayer {
    /// Recompute the anchor by folding `entries` into `start`.
    pub fn recompute_anchor(&self) -> Hash32 {
        self.entries
            .iter()
            .fold(self.start, |acc, entry| fold_step(acc, entry.hash, entry.right))
    }
}

/// The full three-layer chain, terminated by the network root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainedProof {
    /// Account chain receipt.
    pub l1: ProofLayer,
    /// Partition anchor receipt.
    pub l2: ProofLayer,
    /// Directory network receipt.
    pub l3: ProofLayer,
    /// Network root hash the chain must terminate at.
    pub network_root: Hash32,
}

impl ChainedProof {
    /// Layers in order with their 1-based numbers.
    pub fn layers(&self) -> [(u8, &ProofLayer); 3] {
        [(1, &self.l1), (2, &self.l2), (3, &self.l3)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_crypto::hashing::sha256;

    /// Build a layer whose anchor really is the fold of its entries.
    pub(crate) fn valid_layer(start: Hash32, tags: &[(&str, bool)]) -> ProofLayer {
        let entries: Vec<ProofEntry> = tags
            .iter()
            .map(|(tag, right)| ProofEntry {
                hash: sha256(tag.as_bytes()),
                right: *right,
            })
            .collect();
        let anchor = entries
            .iter()
            .fold(start, |acc, e| fold_step(acc, e.hash, e.right));
        ProofLayer {
            start,
            entries,
            anchor,
        }
    }

    #[test]
    fn recompute_matches_stored_anchor() {
        let layer = valid_layer(sha256(b"start"), &[("s1", true), ("s2", false)]);
        assert_eq!(layer.recompute_anchor(), layer.anchor);
    }

    #[test]
    fn empty_entries_anchor_is_start() {
        let layer = ProofLayer {
            start: sha256(b"x"),
            entries: vec![],
            anchor: sha256(b"x"),
        };
        assert_eq!(layer.recompute_anchor(), layer.start);
    }
}
