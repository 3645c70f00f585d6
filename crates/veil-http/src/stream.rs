//! Server side of the push-event codec
//!
//! Encryption is applied per individual event, not per connection: events may
//! start flowing before a session's handshake completes, and those early
//! events simply go out as plaintext. The consumer is expected to attempt
//! decryption and fall back to the raw string, so a mixed stream during the
//! handshake window is a benign race, not an error.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::sync::Arc;
use tracing::warn;
use veil_session::{SessionId, SessionKeyStore};

/// Per-event encryptor for server-push streams
#[derive(Debug, Clone)]
pub struct StreamCrypto {
    store: Arc<SessionKeyStore>,
}

impl StreamCrypto {
    /// Build over the shared key store
    #[must_use]
    pub fn new(store: Arc<SessionKeyStore>) -> Self {
        Self { store }
    }

    /// Encrypt one event's data string if the session has a key.
    ///
    /// No key (handshake not finished, or expired) or a failed encrypt means
    /// the event is emitted as-is.
    #[must_use]
    pub fn encode(&self, session: Option<&SessionId>, data: &str) -> String {
        let Some(key) = session.and_then(|id| self.store.get(id)) else {
            return data.to_string();
        };
        match key.seal(data.as_bytes()) {
            Ok(sealed) => BASE64.encode(sealed),
            Err(err) => {
                warn!(%err, "stream event encryption failed, emitting plaintext");
                data.to_string()
            }
        }
    }
}
