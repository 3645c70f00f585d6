//! Client crypto agent
//!
//! Drives capability discovery, the handshake, and envelope encode/decode on
//! the client side. The agent only flips to active after the server
//! explicitly acknowledged the handshake; a failed handshake never leaves the
//! client believing it is encrypted when it is not.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};
use veil_crypto::{public_key_from_bytes, seal_for, SessionKey};
use veil_session::SessionId;

use crate::error::AgentError;

/// Request/response encryption marker header
const ENCRYPTED_HEADER: &str = "x-veil-encrypted";
/// Session-identifying header
const SESSION_HEADER: &str = "x-veil-session";

#[derive(Debug, Deserialize)]
struct StatusBody {
    enabled: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublicKeyBody {
    public_key: String,
}

#[derive(Debug, Deserialize)]
struct EncryptedBody {
    encrypted: String,
}

/// Where the agent stands in the protocol
enum AgentState {
    /// Server reported the layer disabled; every operation is a passthrough
    Disabled,
    /// Handshake acknowledged; payloads are enveloped under this key
    Active { key: SessionKey },
}

/// Client-side counterpart of the session encryption layer
pub struct ClientCryptoAgent {
    http: reqwest::Client,
    base_url: String,
    session_id: SessionId,
    state: AgentState,
}

impl ClientCryptoAgent {
    /// Probe the server and, if the layer is enabled, complete a handshake
    /// under a freshly generated session id.
    pub async fn connect(base_url: impl Into<String>) -> Result<Self, AgentError> {
        Self::connect_with_session(base_url, SessionId::generate()).await
    }

    /// Like [`Self::connect`], reusing an existing session id (e.g. one
    /// persisted in local storage or taken from a session cookie).
    pub async fn connect_with_session(
        base_url: impl Into<String>,
        session_id: SessionId,
    ) -> Result<Self, AgentError> {
        let base_url = base_url.into();
        let http = reqwest::Client::new();

        let status: StatusBody = http
            .get(format!("{base_url}/crypto/status"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut agent = Self {
            http,
            base_url,
            session_id,
            state: AgentState::Disabled,
        };

        if !status.enabled {
            debug!("server reports encryption disabled; agent is inert");
            return Ok(agent);
        }

        agent.handshake().await?;
        Ok(agent)
    }

    /// Fetch the server key, wrap a fresh session key and submit it.
    ///
    /// Also the re-handshake path: a second call rotates the session key on
    /// both ends.
    pub async fn handshake(&mut self) -> Result<(), AgentError> {
        let pk: PublicKeyBody = self
            .http
            .get(format!("{}/crypto/public-key", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let raw = BASE64
            .decode(pk.public_key)
            .map_err(|_| AgentError::Protocol("public key is not valid base64"))?;
        let server_key = public_key_from_bytes(&raw)?;

        let key = SessionKey::generate();
        let wrapped = seal_for(&server_key, key.as_bytes())?;

        let response = self
            .http
            .post(format!("{}/crypto/handshake", self.base_url))
            .json(&json!({
                "sessionId": self.session_id.as_str(),
                "encryptedSessionKey": BASE64.encode(wrapped),
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AgentError::HandshakeRejected {
                status: response.status().as_u16(),
            });
        }

        info!(session = %self.session_id, "handshake acknowledged, encryption active");
        self.state = AgentState::Active { key };
        Ok(())
    }

    /// Whether payloads are currently enveloped
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self.state, AgentState::Active { .. })
    }

    /// The session id this agent handshakes and sends under
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Envelope a payload; passthrough while inactive
    pub fn encrypt_payload(&self, payload: &Value) -> Result<Value, AgentError> {
        let AgentState::Active { key } = &self.state else {
            return Ok(payload.clone());
        };
        let sealed = key.seal(payload.to_string().as_bytes())?;
        Ok(json!({ "encrypted": BASE64.encode(sealed) }))
    }

    /// Open a response envelope.
    ///
    /// Fails with [`AgentError::Inactive`] when the agent holds no key, and
    /// with [`AgentError::Decryption`] when the envelope does not verify —
    /// both mean the session state is stale and a re-handshake is due.
    pub fn decrypt_payload(&self, envelope: &Value) -> Result<Value, AgentError> {
        let AgentState::Active { key } = &self.state else {
            return Err(AgentError::Inactive);
        };
        let body: EncryptedBody = serde_json::from_value(envelope.clone())
            .map_err(|_| AgentError::Protocol("response is not an encrypted envelope"))?;
        let sealed = BASE64
            .decode(body.encrypted)
            .map_err(|_| AgentError::Decryption)?;
        let plaintext = key.open(&sealed).map_err(|_| AgentError::Decryption)?;
        serde_json::from_slice(&plaintext).map_err(|_| AgentError::Decryption)
    }

    /// Decode one push-stream event, best-effort.
    ///
    /// Events may arrive before the handshake completes, so a string that
    /// does not decode or decrypt is returned unchanged rather than raised:
    /// a mixed plaintext/ciphertext stream during that window is expected.
    #[must_use]
    pub fn decode_stream_event(&self, data: &str) -> String {
        let AgentState::Active { key } = &self.state else {
            return data.to_string();
        };
        let Ok(sealed) = BASE64.decode(data) else {
            return data.to_string();
        };
        match key.open(&sealed) {
            Ok(plaintext) => String::from_utf8(plaintext).unwrap_or_else(|_| data.to_string()),
            Err(_) => data.to_string(),
        }
    }

    /// POST a JSON payload through the protected pipeline.
    ///
    /// While active the body is enveloped and the marker/session headers are
    /// attached; a marked response is transparently opened.
    pub async fn post_json(&self, path: &str, payload: &Value) -> Result<Value, AgentError> {
        let mut request = self
            .http
            .post(format!("{}{path}", self.base_url))
            .header(SESSION_HEADER, self.session_id.as_str());
        if self.is_active() {
            request = request.header(ENCRYPTED_HEADER, "1");
        }

        let response = request
            .json(&self.encrypt_payload(payload)?)
            .send()
            .await?
            .error_for_status()?;

        let marked = response
            .headers()
            .get(ENCRYPTED_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == "1");
        let body: Value = response.json().await?;

        if marked {
            self.decrypt_payload(&body)
        } else {
            Ok(body)
        }
    }
}

impl std::fmt::Debug for ClientCryptoAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCryptoAgent")
            .field("base_url", &self.base_url)
            .field("session_id", &self.session_id)
            .field("active", &self.is_active())
            .finish()
    }
}
