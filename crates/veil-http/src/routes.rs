//! Crypto endpoints: capability probe, public-key distribution, handshake

use axum::extract::State;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::PipelineError;
use crate::state::CryptoState;
use veil_session::SessionId;

/// Capability probe response
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Whether the encryption layer is active
    pub enabled: bool,
}

/// Public key distribution response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyResponse {
    /// Base64 of the server's X25519 public key
    pub public_key: String,
}

/// Handshake request body. Transient; never persisted.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeRequest {
    /// Client-chosen opaque session identifier
    pub session_id: String,
    /// Base64 of the sealed-box-wrapped session key
    pub encrypted_session_key: String,
}

/// Router exposing the three crypto endpoints
pub fn crypto_router(state: Arc<CryptoState>) -> Router {
    Router::new()
        .route("/crypto/status", get(status))
        .route("/crypto/public-key", get(public_key))
        .route("/crypto/handshake", post(handshake))
        .with_state(state)
}

/// `GET /crypto/status` — capability probe
async fn status(State(state): State<Arc<CryptoState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        enabled: state.config().enabled,
    })
}

/// `GET /crypto/public-key` — the key clients wrap session keys for
async fn public_key(State(state): State<Arc<CryptoState>>) -> Json<PublicKeyResponse> {
    Json(PublicKeyResponse {
        public_key: state.public_key_b64(),
    })
}

/// `POST /crypto/handshake` — install (or rotate) a session key
async fn handshake(
    State(state): State<Arc<CryptoState>>,
    Json(request): Json<HandshakeRequest>,
) -> Result<Json<Value>, PipelineError> {
    let wrapped = BASE64
        .decode(&request.encrypted_session_key)
        .map_err(|_| PipelineError::BadEncoding)?;
    state
        .handshake()
        .handshake(SessionId::new(request.session_id), &wrapped)?;
    Ok(Json(json!({ "ok": true })))
}
