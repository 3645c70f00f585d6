//! Inbound pipeline stage: request decryption
//!
//! Per-request decision:
//! - layer disabled → pass through
//! - request not marked encrypted → pass through
//! - marked, no session key → pass through unchanged (fail-open; a client
//!   racing its own handshake must not be blocked) or reject in strict mode
//! - marked, key resolved → decrypt, validate, substitute the body; any
//!   failure past this point fails closed
//!
//! The asymmetry is intentional: a key that was found but a ciphertext that
//! does not verify is always an error, in both strictness modes.

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::sync::Arc;
use tracing::debug;

use crate::error::PipelineError;
use crate::state::CryptoState;
use crate::wire::{is_marked, session_id, EncryptedBody};
use veil_session::Strictness;

/// Largest request body the stage will buffer
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Axum middleware decrypting marked request bodies
pub async fn decrypt_request(
    State(state): State<Arc<CryptoState>>,
    request: Request,
    next: Next,
) -> Result<Response, PipelineError> {
    if !state.config().enabled || !is_marked(request.headers()) {
        return Ok(next.run(request).await);
    }

    let session = session_id(request.headers());
    let key = session.as_ref().and_then(|id| state.store().get(id));

    let Some(key) = key else {
        return match state.config().strictness {
            Strictness::Permissive => {
                debug!(
                    session = session.as_ref().map(veil_session::SessionId::as_str),
                    "marked request without session key, passing through"
                );
                Ok(next.run(request).await)
            }
            Strictness::Strict => Err(PipelineError::MissingKey),
        };
    };

    let (mut parts, body) = request.into_parts();
    let bytes = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|err| PipelineError::Body(err.to_string()))?;

    let envelope: EncryptedBody = serde_json::from_slice(&bytes)
        .map_err(|_| PipelineError::PayloadFormat("body is not an encrypted envelope"))?;
    let ciphertext = BASE64
        .decode(envelope.encrypted)
        .map_err(|_| PipelineError::Decryption)?;
    let plaintext = key.open(&ciphertext).map_err(|_| PipelineError::Decryption)?;

    // Downstream extractors expect structured JSON; reject garbage here
    // rather than let handlers see a half-decrypted body.
    serde_json::from_slice::<serde_json::Value>(&plaintext)
        .map_err(|_| PipelineError::PayloadFormat("plaintext is not valid JSON"))?;

    parts.headers.remove(CONTENT_LENGTH);
    if let Ok(len) = HeaderValue::from_str(&plaintext.len().to_string()) {
        parts.headers.insert(CONTENT_LENGTH, len);
    }
    parts
        .headers
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let request = Request::from_parts(parts, Body::from(plaintext));
    Ok(next.run(request).await)
}
