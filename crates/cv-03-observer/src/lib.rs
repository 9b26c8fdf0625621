//! # CV-03 External-Chain Observer
//!
//! Polls an external EVM chain until a transaction reaches finality, then
//! builds transaction and receipt inclusion proofs by reconstructing the
//! block's Patricia tries.
//!
//! ## Modes
//!
//! 1. **Synchronous**: [`FinalityObserver::observe`] blocks the caller until
//!    `confirmations >= required` or a deadline.
//! 2. **Background tracking**: [`tracker::BackgroundTracker`] runs a single
//!    polling loop over a set of pending transactions and invokes
//!    `on_finalized` / `on_failed` callbacks.
//!
//! `NotYetMined` and `NotYetFinalized` are retry-carrying non-errors; every
//! other failure aborts the observation.
//!
//! ## Proof construction
//!
//! On finalization the block's transaction trie and receipt trie are rebuilt
//! in order (keys are `rlp(index)`, values the raw transaction / receipt
//! RLP). Proof directions derive from the Patricia nibble layout; proof
//! hashes are the trie node keys and node values are never rehashed.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;
pub mod tracker;

// Re-exports
pub use adapters::HttpEvmRpc;
pub use config::ObserverConfig;
pub use domain::{
    EvmBlock, EvmLog, EvmReceipt, EvmTransaction, ObservationResult, TrieInclusionProof,
};
pub use error::{ObserverError, ObserverResult};
pub use ports::{EvmRpcApi, MockEvmRpc};
pub use service::FinalityObserver;
pub use tracker::{BackgroundTracker, TrackerHandle};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
