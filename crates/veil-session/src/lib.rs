//! Veil Session - per-session key lifecycle
//!
//! Owns everything between "client wrapped a key" and "a request stage needs
//! that key":
//! - [`SessionKeyStore`]: concurrent id → key map with TTL expiry
//! - [`HandshakeService`]: unwrap, validate, install (and rotate) keys
//! - [`SessionCryptoConfig`]: TTL, sweep cadence and strictness knobs
//!
//! Keys live only in the memory of the process that performed the handshake;
//! horizontally scaled deployments need sticky routing or an external store
//! behind the same `put`/`get` surface.

pub mod config;
pub mod error;
pub mod handshake;
pub mod store;

pub use config::{SessionCryptoConfig, Strictness};
pub use error::HandshakeError;
pub use handshake::HandshakeService;
pub use store::{SessionId, SessionKeyStore};
