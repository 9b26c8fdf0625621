//! Orchestrator domain entities.

mod cycle;
mod message;

pub use cycle::{CycleOutcome, CycleRequest, IntentRef};
pub use message::AttestationMessage;
