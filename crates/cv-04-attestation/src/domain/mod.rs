//! Attestation domain entities.

mod attestation;
mod roster;
mod threshold;

pub use attestation::{AggregatedAttestation, Attestation, SignatureEntry};
pub use roster::{RosterEntry, ValidatorRoster};
pub use threshold::threshold_weight;
