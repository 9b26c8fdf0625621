//! # Certen Validator Runtime
//!
//! Configuration loading, subsystem wiring and the peer-facing HTTP API for
//! the validator binary.
//!
//! ## Subsystems
//!
//! 1. Proof model (bundle production & verification)
//! 2. Chain strategies (EVM reference)
//! 3. External-chain observer
//! 4. Attestation strategies (BLS / Ed25519)
//! 5. Anchor scheduler
//! 6. Proof-cycle orchestrator
//! 7. Consensus state machine
//! 8. Lifecycle manager
//! 9. Audit & sync

pub mod api;
pub mod config;
pub mod ledger;
pub mod wiring;

pub use config::NodeConfig;
pub use wiring::{run, run_with_store};
