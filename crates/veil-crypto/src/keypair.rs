//! Process-scoped X25519 keypair and sealed-box key wrap
//!
//! The server holds one static X25519 keypair for its whole lifetime. A
//! client wraps a freshly generated session key for it sealed-box style:
//! - generate an ephemeral X25519 keypair
//! - derive a shared secret via ECDH with the server's static public key
//! - derive an AES-256 wrapping key via HKDF-SHA256
//! - encrypt with AES-256-GCM under a random nonce
//!
//! Wire format: `[ephemeral_pubkey:32][nonce:12][ciphertext][tag:16]`

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use hkdf::Hkdf;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use x25519_dalek::{PublicKey, StaticSecret};

use crate::error::CryptoError;

/// X25519 key length in bytes
pub const PUBLIC_KEY_LEN: usize = 32;
/// AES-GCM nonce length
pub const NONCE_LEN: usize = 12;
/// AES-GCM authentication tag length
pub const TAG_LEN: usize = 16;
/// Bytes a sealed payload adds on top of the plaintext
pub const SEALED_OVERHEAD: usize = PUBLIC_KEY_LEN + NONCE_LEN + TAG_LEN;

/// HKDF info string binding derived keys to this protocol
const HKDF_INFO: &[u8] = b"veil-session-key-wrap";

/// Derive the AES-256 wrapping key from an ECDH shared secret
fn derive_wrap_key(shared_secret: &[u8; 32]) -> [u8; 32] {
    let hk = Hkdf::<Sha256>::new(None, shared_secret);
    let mut wrap_key = [0u8; 32];
    hk.expand(HKDF_INFO, &mut wrap_key)
        .expect("HKDF expand with fixed-length output cannot fail");
    wrap_key
}

/// The process's asymmetric identity for session-key establishment
///
/// Generated once at startup, immutable afterwards. The secret half never
/// leaves process memory; only [`ServerKeyPair::public_key`] is distributed.
/// All methods are read-only and safe to call from concurrent handlers.
pub struct ServerKeyPair {
    secret: StaticSecret,
    public: PublicKey,
}

impl ServerKeyPair {
    /// Generate a fresh keypair
    #[must_use]
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// The public half, distributed to clients
    #[inline]
    #[must_use]
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Public key as raw bytes
    #[inline]
    #[must_use]
    pub fn public_key_bytes(&self) -> [u8; PUBLIC_KEY_LEN] {
        self.public.to_bytes()
    }

    /// Unwrap key material a client sealed to this keypair.
    ///
    /// Expects `[ephemeral_pubkey:32][nonce:12][ciphertext][tag:16]` and
    /// returns the plaintext key material. Fails with
    /// [`CryptoError::BadCiphertext`] on truncated input or when the GCM tag
    /// does not verify.
    pub fn open_sealed(&self, sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if sealed.len() < SEALED_OVERHEAD {
            return Err(CryptoError::BadCiphertext(format!(
                "sealed input too short: {} bytes (minimum {})",
                sealed.len(),
                SEALED_OVERHEAD
            )));
        }

        let ephemeral_bytes: [u8; PUBLIC_KEY_LEN] = sealed[..PUBLIC_KEY_LEN]
            .try_into()
            .map_err(|_| CryptoError::BadCiphertext("invalid ephemeral key".into()))?;
        let nonce_bytes: [u8; NONCE_LEN] = sealed[PUBLIC_KEY_LEN..PUBLIC_KEY_LEN + NONCE_LEN]
            .try_into()
            .map_err(|_| CryptoError::BadCiphertext("invalid nonce".into()))?;
        let ciphertext = &sealed[PUBLIC_KEY_LEN + NONCE_LEN..];

        let ephemeral = PublicKey::from(ephemeral_bytes);
        let shared = self.secret.diffie_hellman(&ephemeral);
        let wrap_key = derive_wrap_key(shared.as_bytes());

        let cipher = Aes256Gcm::new_from_slice(&wrap_key)
            .map_err(|e| CryptoError::BadCiphertext(e.to_string()))?;
        cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext)
            .map_err(|_| CryptoError::BadCiphertext("authentication failed".into()))
    }
}

impl std::fmt::Debug for ServerKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerKeyPair")
            .field("public", &hex::encode(self.public.to_bytes()))
            .finish_non_exhaustive()
    }
}

/// Seal key material for a recipient's public key (client side of the wrap)
///
/// Produces `[ephemeral_pubkey:32][nonce:12][ciphertext][tag:16]`.
pub fn seal_for(recipient: &PublicKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let ephemeral_secret = StaticSecret::random_from_rng(OsRng);
    let ephemeral_public = PublicKey::from(&ephemeral_secret);

    let shared = ephemeral_secret.diffie_hellman(recipient);
    let wrap_key = derive_wrap_key(shared.as_bytes());

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);

    let cipher = Aes256Gcm::new_from_slice(&wrap_key)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let mut output = Vec::with_capacity(PUBLIC_KEY_LEN + NONCE_LEN + ciphertext.len());
    output.extend_from_slice(&ephemeral_public.to_bytes());
    output.extend_from_slice(&nonce_bytes);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

/// Parse a public key from raw bytes
pub fn public_key_from_bytes(bytes: &[u8]) -> Result<PublicKey, CryptoError> {
    let key_bytes: [u8; PUBLIC_KEY_LEN] =
        bytes
            .try_into()
            .map_err(|_| CryptoError::BadKeyLength {
                expected: PUBLIC_KEY_LEN,
                actual: bytes.len(),
            })?;
    Ok(PublicKey::from(key_bytes))
}
