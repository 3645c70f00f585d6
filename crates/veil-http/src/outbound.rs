//! Outbound pipeline stage: response encryption
//!
//! Every response passing this stage gets the capability indicator header.
//! When the inbound request was marked and a session key resolves, the
//! finalized body is replaced with an encrypted envelope and the echo marker
//! is set. Encryption here is best-effort: any failure falls back to the
//! plaintext body (logged) instead of failing the request.

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

use crate::state::CryptoState;
use crate::wire::{is_marked, session_id, ENABLED_HEADER, ENCRYPTED_HEADER};
use veil_crypto::SessionKey;

/// Largest response body the stage will buffer
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Axum middleware enveloping response bodies for marked requests
pub async fn encrypt_response(
    State(state): State<Arc<CryptoState>>,
    request: Request,
    next: Next,
) -> Response {
    let enabled = state.config().enabled;
    let marked = enabled && is_marked(request.headers());
    let key = if marked {
        session_id(request.headers()).and_then(|id| state.store().get(&id))
    } else {
        None
    };

    let mut response = next.run(request).await;

    let enabled_value = HeaderValue::from_static(if enabled { "true" } else { "false" });
    response.headers_mut().insert(ENABLED_HEADER, enabled_value);

    // Error bodies stay plaintext: the client's session state is already in
    // question when these fire. Streaming responses are handled per event by
    // the stream codec instead.
    let Some(key) = key else {
        return plaintext_marked(response);
    };
    if !response.status().is_success() || is_event_stream(&response) {
        return plaintext_marked(response);
    }

    seal_body(response, &key).await
}

/// Whether the response is a server-push event stream
fn is_event_stream(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/event-stream"))
}

/// Mark a response as carrying a plaintext body
fn plaintext_marked(mut response: Response) -> Response {
    response
        .headers_mut()
        .insert(ENCRYPTED_HEADER, HeaderValue::from_static("0"));
    response
}

/// Replace the finalized body with `{"encrypted": "<base64>"}`
async fn seal_body(response: Response, key: &SessionKey) -> Response {
    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(%err, "response body could not be buffered, emitting empty body");
            parts
                .headers
                .insert(ENCRYPTED_HEADER, HeaderValue::from_static("0"));
            return Response::from_parts(parts, Body::empty());
        }
    };

    let envelope = key
        .seal(&bytes)
        .map(|sealed| json!({ "encrypted": BASE64.encode(sealed) }))
        .and_then(|value| {
            serde_json::to_vec(&value)
                .map_err(|err| veil_crypto::CryptoError::EncryptionFailed(err.to_string()))
        });

    match envelope {
        Ok(encrypted_body) => {
            parts
                .headers
                .insert(ENCRYPTED_HEADER, HeaderValue::from_static("1"));
            parts
                .headers
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            parts.headers.remove(CONTENT_LENGTH);
            if let Ok(len) = HeaderValue::from_str(&encrypted_body.len().to_string()) {
                parts.headers.insert(CONTENT_LENGTH, len);
            }
            Response::from_parts(parts, Body::from(encrypted_body))
        }
        Err(err) => {
            // Best-effort confidentiality: fall back to the plaintext body.
            warn!(%err, "response encryption failed, emitting plaintext body");
            parts
                .headers
                .insert(ENCRYPTED_HEADER, HeaderValue::from_static("0"));
            Response::from_parts(parts, Body::from(bytes))
        }
    }
}
