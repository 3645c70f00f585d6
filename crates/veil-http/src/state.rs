//! Process-scoped crypto state
//!
//! One [`CryptoState`] is constructed at startup and injected into every
//! handler and stage through axum's `State`; nothing in this crate reads
//! ambient globals.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::sync::Arc;
use veil_crypto::ServerKeyPair;
use veil_session::{HandshakeService, SessionCryptoConfig, SessionKeyStore};

/// Everything the crypto routes and pipeline stages share
#[derive(Debug)]
pub struct CryptoState {
    config: SessionCryptoConfig,
    keypair: Arc<ServerKeyPair>,
    store: Arc<SessionKeyStore>,
    handshake: HandshakeService,
}

impl CryptoState {
    /// Build the state, generating the process keypair
    #[must_use]
    pub fn new(config: SessionCryptoConfig) -> Self {
        let keypair = Arc::new(ServerKeyPair::generate());
        let store = Arc::new(SessionKeyStore::new(config.key_ttl()));
        let handshake = HandshakeService::new(Arc::clone(&keypair), Arc::clone(&store));
        Self {
            config,
            keypair,
            store,
            handshake,
        }
    }

    /// Start the proactive expiry sweeper for the key store
    pub fn spawn_sweeper(&self) -> tokio::task::JoinHandle<()> {
        self.store.spawn_sweeper(self.config.sweep_interval())
    }

    /// Layer configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SessionCryptoConfig {
        &self.config
    }

    /// The shared session-key store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<SessionKeyStore> {
        &self.store
    }

    /// The handshake service
    #[inline]
    #[must_use]
    pub fn handshake(&self) -> &HandshakeService {
        &self.handshake
    }

    /// Base64 of the process public key, as served to clients
    #[must_use]
    pub fn public_key_b64(&self) -> String {
        BASE64.encode(self.keypair.public_key_bytes())
    }
}
