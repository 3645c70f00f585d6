//! Configuration for the session encryption layer

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default key lifetime: 24 hours
const DEFAULT_KEY_TTL_SECS: u64 = 24 * 60 * 60;
/// Default sweep cadence: 10 minutes
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 10 * 60;

/// How a marked request with no installed session key is handled.
///
/// A client that has not yet completed a handshake may race its first
/// protected requests against key installation. `Permissive` lets those
/// requests through unmodified; `Strict` rejects them. A ciphertext that was
/// presented and fails to verify is rejected in both modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    /// Pass the request through unchanged (logged at debug level)
    #[default]
    Permissive,
    /// Reject the request until a handshake has installed a key
    Strict,
}

/// Configuration for the session encryption layer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionCryptoConfig {
    /// Whether the layer is active at all; when false every stage is a
    /// passthrough
    pub enabled: bool,
    /// Session key lifetime in seconds
    pub key_ttl_secs: u64,
    /// Cadence of the proactive expiry sweep in seconds
    pub sweep_interval_secs: u64,
    /// Missing-key handling for marked requests
    pub strictness: Strictness,
}

impl Default for SessionCryptoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            key_ttl_secs: DEFAULT_KEY_TTL_SECS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            strictness: Strictness::default(),
        }
    }
}

impl SessionCryptoConfig {
    /// Create config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the whole layer
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the session key lifetime
    #[must_use]
    pub fn with_key_ttl(mut self, ttl: Duration) -> Self {
        self.key_ttl_secs = ttl.as_secs();
        self
    }

    /// Set the proactive sweep cadence
    #[must_use]
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval_secs = interval.as_secs();
        self
    }

    /// Set the missing-key strictness
    #[must_use]
    pub fn with_strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self
    }

    /// Key lifetime as a [`Duration`]
    #[inline]
    #[must_use]
    pub fn key_ttl(&self) -> Duration {
        Duration::from_secs(self.key_ttl_secs)
    }

    /// Sweep cadence as a [`Duration`]
    #[inline]
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}
