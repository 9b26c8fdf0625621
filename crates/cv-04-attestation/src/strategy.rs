//! The attestation strategy contract.

use crate::domain::{AggregatedAttestation, Attestation};
use crate::error::AttestationError;
use shared_types::AttestationScheme;

/// Sign / Verify / Aggregate over one signature scheme.
///
/// Implementations must be safe for concurrent use; the orchestrator shares
/// one strategy across parallel cycles. Scheme implementations share no
/// state with each other.
pub trait AttestationStrategy: Send + Sync {
    /// The scheme this strategy implements.
    fn scheme(&self) -> AttestationScheme;

    /// Sign a message with the local validator key. The attestation carries
    /// `SHA256(message)` as its message hash.
    fn sign(&self, message: &[u8]) -> Result<Attestation, AttestationError>;

    /// Verify a single attestation against the roster.
    fn verify(&self, attestation: &Attestation) -> bool;

    /// Aggregate verified attestations over a common message hash and apply
    /// the threshold policy.
    fn aggregate(
        &self,
        attestations: &[Attestation],
    ) -> Result<AggregatedAttestation, AttestationError>;

    /// Verify an aggregate cryptographically.
    fn verify_aggregated(&self, aggregated: &AggregatedAttestation) -> bool;
}
