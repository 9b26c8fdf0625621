//! Observer domain: EVM entities, the Patricia trie, and inclusion proofs.

pub mod observation;
pub mod trie;

pub use observation::{
    build_inclusion_proof, EvmBlock, EvmLog, EvmReceipt, EvmTransaction, ObservationResult,
    TrieInclusionProof,
};
pub use trie::{key_nibbles, verify_proof, PatriciaTrie, EMPTY_TRIE_ROOT};
