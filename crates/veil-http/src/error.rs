//! Pipeline error type and its HTTP mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;
use veil_session::HandshakeError;

/// Failures surfaced by the crypto routes and the inbound pipeline stage.
///
/// Everything here fails closed: a presented ciphertext that does not verify
/// is propagated, never silently dropped. The one deliberately non-fatal
/// condition, a marked request whose session has no installed key, is not an
/// error in permissive mode and only appears here as [`Self::MissingKey`]
/// under strict configuration.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Handshake rejected the wrapped key material
    #[error("handshake failed: {0}")]
    Handshake(#[from] HandshakeError),

    /// Wire field is not valid base64
    #[error("field is not valid base64")]
    BadEncoding,

    /// Presented ciphertext failed to decrypt under the resolved key
    #[error("request ciphertext failed to decrypt")]
    Decryption,

    /// Decrypted plaintext is not a well-formed structured payload
    #[error("decrypted payload is malformed: {0}")]
    PayloadFormat(&'static str),

    /// Strict mode: marked request with no installed session key
    #[error("no session key installed for this session")]
    MissingKey,

    /// Request body could not be read
    #[error("failed to read request body: {0}")]
    Body(String),
}

impl PipelineError {
    /// Stable machine-readable code for the wire
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Handshake(err) => err.code(),
            Self::BadEncoding => "bad_encoding",
            Self::Decryption => "decryption_failed",
            Self::PayloadFormat(_) => "payload_malformed",
            Self::MissingKey => "handshake_required",
            Self::Body(_) => "body_unreadable",
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::MissingKey => StatusCode::PRECONDITION_REQUIRED,
            Self::Handshake(_)
            | Self::BadEncoding
            | Self::Decryption
            | Self::PayloadFormat(_)
            | Self::Body(_) => StatusCode::BAD_REQUEST,
        };

        tracing::warn!(code = self.code(), "request rejected: {}", self);

        (status, Json(json!({ "error": self.code() }))).into_response()
    }
}
