//! Peer-facing HTTP API.
//!
//! Mounts the unified attestation endpoint and a consensus block delivery
//! endpoint for the replication layer, plus a health probe.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use cv_04_attestation::AttestationStrategy;
use cv_06_orchestrator::{PeerAttestationRequest, PeerAttestationResponse};
use cv_07_consensus::{ConsensusService, ReplicationHeader};
use serde::{Deserialize, Serialize};
use shared_storage::ValidatorStore;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared API state.
pub struct ApiState<S> {
    /// This validator's id.
    pub validator_id: String,
    /// Local attestation strategy.
    pub attestation: Arc<dyn AttestationStrategy>,
    /// Consensus state machine.
    pub consensus: Arc<ConsensusService<S>>,
}

/// Replication-layer block delivery body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockDelivery {
    /// Header fields from the replication layer.
    pub header: ReplicationHeader,
    /// The proposed validator block.
    pub block: serde_json::Value,
}

/// Outcome of a block delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockDeliveryResponse {
    /// Whether the block committed.
    pub committed: bool,
    /// Committed height.
    pub height: u64,
    /// Application hash, hex.
    pub app_hash: String,
    /// Rejection reason, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Build the API router.
pub fn router<S>(state: Arc<ApiState<S>>) -> Router
where
    S: ValidatorStore + 'static,
{
    Router::new()
        .route(
            "/api/unified/attestation/request",
            post(handle_attestation_request::<S>),
        )
        .route("/api/consensus/block", post(handle_block_delivery::<S>))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// Re-sign the caller's attestation message with this validator's key.
async fn handle_attestation_request<S>(
    State(state): State<Arc<ApiState<S>>>,
    headers: HeaderMap,
    Json(request): Json<PeerAttestationRequest>,
) -> (StatusCode, Json<PeerAttestationResponse>)
where
    S: ValidatorStore + 'static,
{
    let caller = headers
        .get("X-Validator-ID")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");
    info!(
        cycle_id = %request.cycle_id,
        caller,
        "attestation requested"
    );

    if request.scheme != state.attestation.scheme() {
        let response = PeerAttestationResponse {
            cycle_id: request.cycle_id,
            success: false,
            error: Some(format!(
                "scheme mismatch: this validator runs {}",
                state.attestation.scheme()
            )),
            attestation: None,
        };
        return (StatusCode::BAD_REQUEST, Json(response));
    }

    let signing_bytes = match request.message.signing_bytes() {
        Ok(bytes) => bytes,
        Err(e) => {
            let response = PeerAttestationResponse {
                cycle_id: request.cycle_id,
                success: false,
                error: Some(e.to_string()),
                attestation: None,
            };
            return (StatusCode::BAD_REQUEST, Json(response));
        }
    };

    match state.attestation.sign(&signing_bytes) {
        Ok(attestation) => (
            StatusCode::OK,
            Json(PeerAttestationResponse {
                cycle_id: request.cycle_id,
                success: true,
                error: None,
                attestation: Some(attestation),
            }),
        ),
        Err(e) => {
            warn!(cycle_id = %request.cycle_id, error = %e, "attestation signing failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(PeerAttestationResponse {
                    cycle_id: request.cycle_id,
                    success: false,
                    error: Some(e.to_string()),
                    attestation: None,
                }),
            )
        }
    }
}

/// Deliver a proposed validator block from the replication layer.
async fn handle_block_delivery<S>(
    State(state): State<Arc<ApiState<S>>>,
    Json(delivery): Json<BlockDelivery>,
) -> (StatusCode, Json<BlockDeliveryResponse>)
where
    S: ValidatorStore + 'static,
{
    let raw = match serde_json::to_vec(&delivery.block) {
        Ok(raw) => raw,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(BlockDeliveryResponse {
                    committed: false,
                    height: state.consensus.height(),
                    app_hash: state.consensus.app_hash().to_hex(),
                    error: Some(e.to_string()),
                }),
            )
        }
    };

    match state.consensus.process_block(&raw, &delivery.header).await {
        Ok(result) => (
            StatusCode::OK,
            Json(BlockDeliveryResponse {
                committed: result.entry_inserted,
                height: result.height,
                app_hash: result.app_hash.to_hex(),
                error: None,
            }),
        ),
        Err(e) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(BlockDeliveryResponse {
                committed: false,
                height: state.consensus.height(),
                app_hash: state.consensus.app_hash().to_hex(),
                error: Some(e.to_string()),
            }),
        ),
    }
}
