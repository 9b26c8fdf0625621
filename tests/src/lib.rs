//! # Certen Validator Test Suite
//!
//! Unified test crate containing the cross-subsystem integration flows.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── scheduling.rs      # Scheduler → orchestrator batch flow
//!     ├── quorum.rs          # BFT threshold scenarios
//!     ├── proof_chain.rs     # Proof model end-to-end properties
//!     └── consensus_flow.rs  # Validator block commit & recovery
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p cv-tests
//! cargo test -p cv-tests integration::quorum::
//! ```

#[cfg(test)]
mod integration;
