//! Symmetric session key and payload envelope
//!
//! Every protected payload travels as an AES-256-GCM envelope under the
//! session key: `[nonce:12][ciphertext][tag:16]`. The envelope carries no
//! plaintext besides what the cipher mode structurally requires.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::CryptoError;
use crate::keypair::{NONCE_LEN, TAG_LEN};

/// Session key length in bytes (AES-256)
pub const SESSION_KEY_LEN: usize = 32;
/// Bytes an envelope adds on top of the plaintext
pub const ENVELOPE_OVERHEAD: usize = NONCE_LEN + TAG_LEN;

/// A per-session symmetric secret.
///
/// In 1:1 relation with a session id; created at handshake, read on every
/// protected call, overwritten on rotation. `Debug` never prints the key
/// material, only its fingerprint.
#[derive(Clone)]
pub struct SessionKey([u8; SESSION_KEY_LEN]);

impl SessionKey {
    /// Generate a fresh random key
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; SESSION_KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Construct from raw bytes, validating the length
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let key: [u8; SESSION_KEY_LEN] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::BadKeyLength {
                    expected: SESSION_KEY_LEN,
                    actual: bytes.len(),
                })?;
        Ok(Self(key))
    }

    /// Raw key bytes
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; SESSION_KEY_LEN] {
        &self.0
    }

    /// Short non-reversible identifier for logs (first 4 bytes of SHA-256)
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0);
        hex::encode(&digest[..4])
    }

    /// Encrypt a payload into an envelope: `[nonce:12][ciphertext][tag:16]`
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);

        let cipher = Aes256Gcm::new_from_slice(&self.0)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        let mut output = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        output.extend_from_slice(&nonce_bytes);
        output.extend_from_slice(&ciphertext);
        Ok(output)
    }

    /// Decrypt an envelope back to the payload.
    ///
    /// Fails with [`CryptoError::BadCiphertext`] on truncated input or when
    /// the authentication tag does not verify.
    pub fn open(&self, envelope: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if envelope.len() < ENVELOPE_OVERHEAD {
            return Err(CryptoError::BadCiphertext(format!(
                "envelope too short: {} bytes (minimum {})",
                envelope.len(),
                ENVELOPE_OVERHEAD
            )));
        }

        let (nonce_bytes, ciphertext) = envelope.split_at(NONCE_LEN);
        let cipher = Aes256Gcm::new_from_slice(&self.0)
            .map_err(|e| CryptoError::BadCiphertext(e.to_string()))?;
        cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| CryptoError::BadCiphertext("authentication failed".into()))
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionKey({})", self.fingerprint())
    }
}
