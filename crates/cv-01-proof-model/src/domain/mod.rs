//! Domain entities of the proof model.

mod anchor_binding;
mod bundle;
mod chained_proof;
mod errors;
mod governance;

pub use anchor_binding::AnchorBinding;
pub use bundle::{
    AnchorReference, BundleAttestation, BundleComponents, BundleIntegrity, MerkleInclusion,
    ProofBundle, BUNDLE_SCHEMA_VERSION,
};
pub use chained_proof::{ChainedProof, ProofEntry, ProofLayer};
pub use errors::{AuthorityProofError, ProofError, ProofResult, StateProofError};
pub use governance::{
    EffectCheck, EffectKind, GovernanceLevel, GovernanceProof, KeyPageRef, OutcomeBinding,
    SignerEntry,
};
