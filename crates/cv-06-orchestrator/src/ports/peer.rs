//! Peer attestation protocol (HTTP JSON).
//!
//! `POST {peer}/api/unified/attestation/request`, caller identified by the
//! `X-Validator-ID` header. Each peer re-signs the same canonical message
//! with its own key; the caller verifies every returned attestation before
//! admission.

use crate::config::PeerConfig;
use crate::domain::AttestationMessage;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cv_04_attestation::{Attestation, AttestationStrategy};
use serde::{Deserialize, Serialize};
use shared_types::AttestationScheme;
use std::collections::HashMap;
use std::sync::Arc;

/// Path the attestation endpoint is mounted at.
pub const ATTESTATION_PATH: &str = "/api/unified/attestation/request";

/// Header carrying the requesting validator's id.
pub const VALIDATOR_ID_HEADER: &str = "X-Validator-ID";

/// Request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerAttestationRequest {
    /// Cycle the attestation is requested for.
    pub cycle_id: String,
    /// Message the peer must re-sign.
    pub message: AttestationMessage,
    /// Scheme the caller expects.
    pub scheme: AttestationScheme,
    /// Requesting validator id.
    pub requesting_validator: String,
    /// When the request was issued.
    pub requested_at: DateTime<Utc>,
}

/// Response body; status 200 on acceptance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerAttestationResponse {
    /// Cycle echoed back.
    pub cycle_id: String,
    /// Whether the peer attested.
    pub success: bool,
    /// Failure reason when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// The peer's attestation when `success` is true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attestation: Option<Attestation>,
}

/// Transport for the peer attestation protocol.
#[async_trait]
pub trait PeerClient: Send + Sync {
    /// Request an attestation from one peer.
    async fn request_attestation(
        &self,
        peer: &PeerConfig,
        request: &PeerAttestationRequest,
    ) -> Result<PeerAttestationResponse, String>;
}

/// HTTP implementation over reqwest.
pub struct HttpPeerClient {
    client: reqwest::Client,
}

impl HttpPeerClient {
    /// Client with a per-request timeout.
    pub fn new(request_timeout: std::time::Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(request_timeout)
                .build()
                .unwrap_or_default(),
        }
    }
}

#[async_trait]
impl PeerClient for HttpPeerClient {
    async fn request_attestation(
        &self,
        peer: &PeerConfig,
        request: &PeerAttestationRequest,
    ) -> Result<PeerAttestationResponse, String> {
        let url = format!("{}{}", peer.url.trim_end_matches('/'), ATTESTATION_PATH);
        let response = self
            .client
            .post(&url)
            .header(VALIDATOR_ID_HEADER, &request.requesting_validator)
            .json(request)
            .send()
            .await
            .map_err(|e| format!("peer {} unreachable: {e}", peer.validator_id))?;
        if !response.status().is_success() {
            return Err(format!(
                "peer {} returned status {}",
                peer.validator_id,
                response.status()
            ));
        }
        response
            .json()
            .await
            .map_err(|e| format!("peer {} sent malformed response: {e}", peer.validator_id))
    }
}

// =============================================================================
// Mock Implementation for Testing
// =============================================================================

/// In-process peers backed by real attestation strategies.
#[derive(Default)]
pub struct MockPeerClient {
    peers: HashMap<String, Arc<dyn AttestationStrategy>>,
    /// Peers that refuse to answer.
    unreachable: parking_lot::RwLock<Vec<String>>,
    /// Artificial delay before answering.
    delay: Option<std::time::Duration>,
}

impl MockPeerClient {
    /// Empty mock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a peer's signing strategy.
    pub fn with_peer(
        mut self,
        validator_id: impl Into<String>,
        strategy: Arc<dyn AttestationStrategy>,
    ) -> Self {
        self.peers.insert(validator_id.into(), strategy);
        self
    }

    /// Delay every response (for deadline tests).
    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make a peer unreachable.
    pub fn set_unreachable(&self, validator_id: impl Into<String>) {
        self.unreachable.write().push(validator_id.into());
    }
}

#[async_trait]
impl PeerClient for MockPeerClient {
    async fn request_attestation(
        &self,
        peer: &PeerConfig,
        request: &PeerAttestationRequest,
    ) -> Result<PeerAttestationResponse, String> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.unreachable.read().contains(&peer.validator_id) {
            return Err(format!("peer {} unreachable", peer.validator_id));
        }
        let strategy = self
            .peers
            .get(&peer.validator_id)
            .ok_or_else(|| format!("no such peer {}", peer.validator_id))?;
        let bytes = request
            .message
            .signing_bytes()
            .map_err(|e| e.to_string())?;
        match strategy.sign(&bytes) {
            Ok(attestation) => Ok(PeerAttestationResponse {
                cycle_id: request.cycle_id.clone(),
                success: true,
                error: None,
                attestation: Some(attestation),
            }),
            Err(e) => Ok(PeerAttestationResponse {
                cycle_id: request.cycle_id.clone(),
                success: false,
                error: Some(e.to_string()),
                attestation: None,
            }),
        }
    }
}
