//! Handshake service
//!
//! Validates client-wrapped key material and installs the resulting session
//! key. Re-invoking the handshake for an existing session id overwrites the
//! stored key; that overwrite is the only rotation mechanism.

use std::sync::Arc;
use tracing::{info, warn};
use veil_crypto::{ServerKeyPair, SessionKey};

use crate::error::HandshakeError;
use crate::store::{SessionId, SessionKeyStore};

/// Installs session keys delivered through the asymmetric key wrap
#[derive(Debug, Clone)]
pub struct HandshakeService {
    keypair: Arc<ServerKeyPair>,
    store: Arc<SessionKeyStore>,
}

impl HandshakeService {
    /// Create a service over the process keypair and the shared store
    #[must_use]
    pub fn new(keypair: Arc<ServerKeyPair>, store: Arc<SessionKeyStore>) -> Self {
        Self { keypair, store }
    }

    /// The process keypair the client must wrap keys for
    #[inline]
    #[must_use]
    pub fn keypair(&self) -> &ServerKeyPair {
        &self.keypair
    }

    /// Unwrap, validate and install a session key.
    ///
    /// On any failure nothing is installed and the previous key (if any)
    /// stays in effect. Distinguishes undecryptable input from key material
    /// of the wrong length.
    pub fn handshake(
        &self,
        session_id: SessionId,
        wrapped_key: &[u8],
    ) -> Result<(), HandshakeError> {
        let material = self.keypair.open_sealed(wrapped_key).map_err(|err| {
            warn!(session = %session_id, %err, "handshake rejected: undecryptable key material");
            HandshakeError::BadCiphertext
        })?;

        let key = SessionKey::from_bytes(&material).map_err(|_| {
            warn!(
                session = %session_id,
                actual = material.len(),
                "handshake rejected: wrong key length"
            );
            HandshakeError::BadKeyLength {
                actual: material.len(),
            }
        })?;

        info!(session = %session_id, fingerprint = %key.fingerprint(), "session key installed");
        self.store.put(session_id, key);
        Ok(())
    }
}
