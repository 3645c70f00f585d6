//! Veil HTTP - the wire surface of the session encryption layer
//!
//! Three pieces compose onto any axum application:
//! - [`crypto_router`]: capability probe, public-key distribution and the
//!   handshake endpoint
//! - [`protect`]: wraps a router in the inbound decryption and outbound
//!   encryption stages
//! - [`StreamCrypto`]: per-event encryption for server-push streams
//!
//! # Example
//!
//! ```rust,ignore
//! use axum::{routing::post, Json, Router};
//! use std::sync::Arc;
//! use veil_http::{crypto_router, protect, CryptoState};
//! use veil_session::SessionCryptoConfig;
//!
//! let state = Arc::new(CryptoState::new(SessionCryptoConfig::default()));
//! state.spawn_sweeper();
//!
//! let api = Router::new().route("/ask", post(ask_handler));
//! let app = protect(api, state.clone()).merge(crypto_router(state));
//! ```

pub mod error;
pub mod inbound;
pub mod outbound;
pub mod routes;
pub mod state;
pub mod stream;
pub mod wire;

pub use error::PipelineError;
pub use routes::{crypto_router, HandshakeRequest, PublicKeyResponse, StatusResponse};
pub use state::CryptoState;
pub use stream::StreamCrypto;
pub use wire::{
    EncryptedBody, ENABLED_HEADER, ENCRYPTED_HEADER, SESSION_COOKIE, SESSION_HEADER,
};

use axum::middleware::from_fn_with_state;
use axum::Router;
use std::sync::Arc;

/// Wrap a router in both pipeline stages.
///
/// The outbound stage is outermost so every response, including fail-closed
/// rejections from the inbound stage, carries the capability header.
#[must_use]
pub fn protect(router: Router, state: Arc<CryptoState>) -> Router {
    router
        .layer(from_fn_with_state(
            Arc::clone(&state),
            inbound::decrypt_request,
        ))
        .layer(from_fn_with_state(state, outbound::encrypt_response))
}
