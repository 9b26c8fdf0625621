//! Orchestrator ports: the peer attestation protocol and the source ledger.

mod ledger;
mod peer;

pub use ledger::{MockSourceLedger, SourceLedger, SyntheticTransaction};
pub use peer::{
    HttpPeerClient, MockPeerClient, PeerAttestationRequest, PeerAttestationResponse, PeerClient,
};
