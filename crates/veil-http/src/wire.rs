//! Wire-level constants and helpers shared by the pipeline stages

use axum::http::header::COOKIE;
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use veil_session::SessionId;

/// Request/response marker: body is an encrypted envelope
pub const ENCRYPTED_HEADER: &str = "x-veil-encrypted";
/// Session-identifying request header
pub const SESSION_HEADER: &str = "x-veil-session";
/// Capability indicator set on every outbound response
pub const ENABLED_HEADER: &str = "x-veil-enabled";
/// Cookie fallback for the session id
pub const SESSION_COOKIE: &str = "veil_session";

/// The sole wire shape of a protected payload: `{"encrypted": "<base64>"}`
#[derive(Debug, Serialize, Deserialize)]
pub struct EncryptedBody {
    /// Base64-encoded envelope
    pub encrypted: String,
}

/// Whether the sender declared the body encrypted
#[must_use]
pub fn is_marked(headers: &HeaderMap) -> bool {
    headers
        .get(ENCRYPTED_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

/// Extract the session id from the dedicated header, falling back to the
/// session cookie
#[must_use]
pub fn session_id(headers: &HeaderMap) -> Option<SessionId> {
    if let Some(id) = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
    {
        return Some(SessionId::new(id));
    }
    let cookies = headers.get(COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        pair.trim()
            .strip_prefix(SESSION_COOKIE)?
            .strip_prefix('=')
            .filter(|v| !v.is_empty())
            .map(SessionId::new)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn marker_accepts_one_and_true() {
        let mut headers = HeaderMap::new();
        assert!(!is_marked(&headers));

        headers.insert(ENCRYPTED_HEADER, HeaderValue::from_static("1"));
        assert!(is_marked(&headers));

        headers.insert(ENCRYPTED_HEADER, HeaderValue::from_static("true"));
        assert!(is_marked(&headers));

        headers.insert(ENCRYPTED_HEADER, HeaderValue::from_static("0"));
        assert!(!is_marked(&headers));
    }

    #[test]
    fn session_header_takes_precedence_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("veil_session=from-cookie"));
        assert_eq!(session_id(&headers).unwrap().as_str(), "from-cookie");

        headers.insert(SESSION_HEADER, HeaderValue::from_static("from-header"));
        assert_eq!(session_id(&headers).unwrap().as_str(), "from-header");
    }

    #[test]
    fn cookie_is_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; veil_session=abc123; lang=en"),
        );
        assert_eq!(session_id(&headers).unwrap().as_str(), "abc123");
    }

    #[test]
    fn empty_values_do_not_identify_a_session() {
        let mut headers = HeaderMap::new();
        headers.insert(SESSION_HEADER, HeaderValue::from_static(""));
        headers.insert(COOKIE, HeaderValue::from_static("veil_session="));
        assert!(session_id(&headers).is_none());
    }
}
