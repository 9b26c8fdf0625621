//! # CV-02 Chain Strategy
//!
//! A uniform contract every external-chain backend implements, so the
//! proof-cycle orchestrator stays chain-agnostic.
//!
//! ## Capability set
//!
//! `create_anchor`, `submit_proof`, `execute_with_governance`,
//! `observe_transaction`, `transaction_receipt`, `required_confirmations`,
//! `current_block`, `health_check`, plus config accessors.
//!
//! ## Variants
//!
//! EVM is the reference implementation. CosmWasm, Solana, Move, TON and NEAR
//! are platform variants without a full strategy here; how the registry
//! treats them is governed by the `strict_chain_registry` flag.
//!
//! ## Per-platform defaults
//!
//! | Platform | Attestation | Confirmations |
//! |----------|-------------|---------------|
//! | EVM mainnet | BLS | 12 |
//! | EVM testnet | BLS | 2 |
//! | CosmWasm | Ed25519 | 2 |
//! | TON | Ed25519 | 10 |
//! | Solana | Ed25519 | 32 |

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod evm;
pub mod registry;
pub mod strategy;

// Re-exports
pub use config::{ChainStrategyConfig, GasConfig};
pub use error::{StrategyError, StrategyResult};
pub use evm::{EvmChainStrategy, EvmTxSigner};
pub use registry::ChainRegistry;
pub use strategy::{
    ChainStrategy, CreateAnchorRequest, GovernanceExecutionParams, MockChainStrategy,
    ProofSubmission,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
