//! Error types for the crypto primitives

use thiserror::Error;

/// Errors produced by keypair and envelope operations
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key material has the wrong size
    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    BadKeyLength {
        /// Required length in bytes
        expected: usize,
        /// Length that was presented
        actual: usize,
    },

    /// Ciphertext is malformed, truncated, or fails the authentication check
    #[error("ciphertext rejected: {0}")]
    BadCiphertext(String),

    /// Encryption could not be performed
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),
}
