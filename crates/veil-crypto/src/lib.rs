//! Veil Crypto - primitives for session-level end-to-end encryption
//!
//! Three building blocks:
//! - [`ServerKeyPair`]: the process-scoped X25519 identity a client wraps
//!   session keys for
//! - [`seal_for`] / [`ServerKeyPair::open_sealed`]: the sealed-box key wrap
//!   used by the handshake
//! - [`SessionKey`]: the per-session AES-256-GCM secret every protected
//!   payload is enveloped under
//!
//! # Example
//!
//! ```rust
//! use veil_crypto::{seal_for, ServerKeyPair, SessionKey};
//!
//! # fn main() -> Result<(), veil_crypto::CryptoError> {
//! let server = ServerKeyPair::generate();
//!
//! // Client side: wrap a fresh session key for the server
//! let key = SessionKey::generate();
//! let wrapped = seal_for(server.public_key(), key.as_bytes())?;
//!
//! // Server side: unwrap and use it
//! let material = server.open_sealed(&wrapped)?;
//! let installed = SessionKey::from_bytes(&material)?;
//!
//! let envelope = key.seal(b"{\"question\":\"hi\"}")?;
//! assert_eq!(installed.open(&envelope)?, b"{\"question\":\"hi\"}");
//! # Ok(())
//! # }
//! ```

pub mod envelope;
pub mod error;
pub mod keypair;

pub use envelope::{SessionKey, ENVELOPE_OVERHEAD, SESSION_KEY_LEN};
pub use error::CryptoError;
pub use keypair::{
    public_key_from_bytes, seal_for, ServerKeyPair, NONCE_LEN, PUBLIC_KEY_LEN, SEALED_OVERHEAD,
    TAG_LEN,
};

pub use x25519_dalek::PublicKey;
