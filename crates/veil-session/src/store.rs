//! Concurrent session-key store with expiry
//!
//! Maps session ids to symmetric keys. Shared mutable state for every
//! in-flight request: reads are O(1) and never wait on writes for other
//! sessions. Expiry is enforced lazily on `get` and proactively by an
//! optional sweeper task. Last write wins on concurrent `put` for the same
//! id.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;
use veil_crypto::SessionKey;

/// Opaque per-browser-session identifier.
///
/// Client-generated, not secret, carries no semantic content. Keys are only
/// ever looked up by id, never by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap an existing identifier (e.g. from a session cookie)
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random identifier
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The identifier as a string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A key plus its installation instant
#[derive(Debug, Clone)]
struct StoredKey {
    key: SessionKey,
    installed_at: Instant,
}

impl StoredKey {
    fn expired(&self, ttl: Duration) -> bool {
        self.installed_at.elapsed() > ttl
    }
}

/// Concurrent map from session id to session key, with TTL
#[derive(Debug)]
pub struct SessionKeyStore {
    keys: DashMap<SessionId, StoredKey>,
    ttl: Duration,
}

impl SessionKeyStore {
    /// Create a store whose entries live for `ttl` after installation
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            keys: DashMap::new(),
            ttl,
        }
    }

    /// Install a key, unconditionally overwriting any previous one.
    ///
    /// Overwrite is what makes re-handshake the rotation mechanism: the old
    /// key stops resolving the moment the new one lands.
    pub fn put(&self, id: SessionId, key: SessionKey) {
        self.keys.insert(
            id,
            StoredKey {
                key,
                installed_at: Instant::now(),
            },
        );
    }

    /// Look up the key for a session, enforcing TTL lazily.
    ///
    /// A stale entry is removed on the way out and reported as absent.
    #[must_use]
    pub fn get(&self, id: &SessionId) -> Option<SessionKey> {
        {
            let entry = self.keys.get(id)?;
            if !entry.expired(self.ttl) {
                return Some(entry.key.clone());
            }
        }
        // Guard dropped before removal; re-check inside remove_if so a key
        // rotated in the gap is not discarded.
        self.keys.remove_if(id, |_, stored| stored.expired(self.ttl));
        debug!(session = %id, "session key expired on lookup");
        None
    }

    /// Forget a session's key (logout)
    pub fn remove(&self, id: &SessionId) {
        self.keys.remove(id);
    }

    /// Drop every entry older than the TTL
    pub fn sweep(&self) {
        let before = self.keys.len();
        self.keys.retain(|_, stored| !stored.expired(self.ttl));
        let evicted = before.saturating_sub(self.keys.len());
        if evicted > 0 {
            debug!(evicted, "swept expired session keys");
        }
    }

    /// Number of entries currently held (stale entries included until swept)
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the store holds no entries
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Spawn a background task sweeping stale entries every `interval`.
    ///
    /// Holds only a weak handle: the task ends on its own once the store is
    /// dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let store = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                match store.upgrade() {
                    Some(store) => store.sweep(),
                    None => break,
                }
            }
        })
    }
}
