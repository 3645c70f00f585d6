//! Error types for the client agent

use thiserror::Error;
use veil_crypto::CryptoError;

/// Failures surfaced to callers of the client agent.
///
/// [`AgentError::Decryption`] on a response usually means the server no
/// longer holds this session's key; callers should re-handshake.
#[derive(Debug, Error)]
pub enum AgentError {
    /// A decrypt was requested but the agent never completed a handshake
    #[error("encryption is not active for this client")]
    Inactive,

    /// The server explicitly rejected the handshake
    #[error("handshake rejected by server (status {status})")]
    HandshakeRejected {
        /// HTTP status the server answered with
        status: u16,
    },

    /// The server's response did not match the protocol
    #[error("protocol violation: {0}")]
    Protocol(&'static str),

    /// A presented envelope failed to decode or decrypt
    #[error("payload decryption failed; session likely expired")]
    Decryption,

    /// Local cryptographic failure
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Transport-level failure
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}
