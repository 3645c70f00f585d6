//! Veil Client - the browser-equivalent protocol client
//!
//! [`ClientCryptoAgent`] mirrors what the admin console's crypto agent does:
//! probe capability, fetch the server key, establish a session key, then
//! envelope every protected payload and open every marked response.
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use veil_client::ClientCryptoAgent;
//!
//! # async fn example() -> Result<(), veil_client::AgentError> {
//! let agent = ClientCryptoAgent::connect("http://localhost:8080").await?;
//! let reply = agent.post_json("/ask", &json!({ "question": "hi" })).await?;
//! assert_eq!(reply["answer"], "hello");
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod error;

pub use agent::ClientCryptoAgent;
pub use error::AgentError;
