//! Error types for session establishment

use thiserror::Error;

/// Why a handshake was rejected.
///
/// Absence of a key for a later request is deliberately not represented
/// here: the store reports it as `None` and the pipeline handles it via its
/// documented fail-open path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HandshakeError {
    /// Wrapped key material could not be decrypted or failed authentication
    #[error("encrypted session key is malformed or undecryptable")]
    BadCiphertext,

    /// Decrypted key material is not a valid session key
    #[error("session key material has wrong length: {actual} bytes")]
    BadKeyLength {
        /// Length of the unwrapped material
        actual: usize,
    },
}

impl HandshakeError {
    /// Stable machine-readable code for the wire
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadCiphertext => "bad_ciphertext",
            Self::BadKeyLength { .. } => "bad_key_length",
        }
    }
}
