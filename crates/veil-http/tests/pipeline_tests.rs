//! Pipeline behavior over a real server: fail-open, fail-closed, markers

use axum::response::sse::{Event, Sse};
use axum::response::Json;
use axum::routing::post;
use axum::Router;
use futures::stream;
use std::convert::Infallible;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use veil_crypto::SessionKey;
use veil_http::{crypto_router, protect, CryptoState};
use veil_session::{SessionCryptoConfig, SessionId, Strictness};

async fn answer(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({ "answer": "hello", "echo": body }))
}

/// Serve a protected test app on an ephemeral port
async fn spawn_app(config: SessionCryptoConfig) -> (String, Arc<CryptoState>) {
    let state = Arc::new(CryptoState::new(config));
    let _sweeper = state.spawn_sweeper();

    // Push-event route: each event is encrypted individually by the codec,
    // for whichever session the fixed demo id resolves to.
    let codec = veil_http::StreamCrypto::new(Arc::clone(state.store()));
    let events = move |Json(_request): Json<Value>| {
        let codec = codec.clone();
        async move {
            let session = SessionId::from("abc123");
            let items = ["tok-1", "tok-2"].map(|token| {
                Ok::<_, Infallible>(Event::default().data(codec.encode(Some(&session), token)))
            });
            Sse::new(stream::iter(items))
        }
    };

    let api = Router::new()
        .route("/ask", post(answer))
        .route("/events", post(events));
    let app = protect(api, Arc::clone(&state)).merge(crypto_router(Arc::clone(&state)));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), state)
}

fn envelope_body(key: &SessionKey, payload: &Value) -> Value {
    let sealed = key.seal(payload.to_string().as_bytes()).unwrap();
    json!({ "encrypted": BASE64.encode(sealed) })
}

fn install_key(state: &CryptoState, id: &str) -> SessionKey {
    let key = SessionKey::generate();
    state.store().put(SessionId::from(id), key.clone());
    key
}

#[tokio::test]
async fn capability_probe_reflects_config() {
    let (base, _state) = spawn_app(SessionCryptoConfig::default()).await;
    let status: Value = reqwest::get(format!("{base}/crypto/status"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status, json!({ "enabled": true }));

    let (base, _state) = spawn_app(SessionCryptoConfig::new().with_enabled(false)).await;
    let status: Value = reqwest::get(format!("{base}/crypto/status"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status, json!({ "enabled": false }));
}

#[tokio::test]
async fn public_key_is_served_as_base64() {
    let (base, state) = spawn_app(SessionCryptoConfig::default()).await;
    let body: Value = reqwest::get(format!("{base}/crypto/public-key"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["publicKey"].as_str().unwrap(), state.public_key_b64());
    let raw = BASE64.decode(body["publicKey"].as_str().unwrap()).unwrap();
    assert_eq!(raw.len(), 32);
}

#[tokio::test]
async fn handshake_rejections_carry_distinguishing_codes() {
    let (base, state) = spawn_app(SessionCryptoConfig::default()).await;
    let client = reqwest::Client::new();

    // Not base64 at all
    let response = client
        .post(format!("{base}/crypto/handshake"))
        .json(&json!({ "sessionId": "abc123", "encryptedSessionKey": "%%%" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "bad_encoding");

    // Valid base64, garbage ciphertext
    let response = client
        .post(format!("{base}/crypto/handshake"))
        .json(&json!({
            "sessionId": "abc123",
            "encryptedSessionKey": BASE64.encode([0u8; 80]),
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "bad_ciphertext");

    // Correctly sealed, wrong key length
    let wrapped =
        veil_crypto::seal_for(state.handshake().keypair().public_key(), &[0u8; 16]).unwrap();
    let response = client
        .post(format!("{base}/crypto/handshake"))
        .json(&json!({
            "sessionId": "abc123",
            "encryptedSessionKey": BASE64.encode(wrapped),
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "bad_key_length");
}

#[tokio::test]
async fn unmarked_requests_pass_through_with_capability_header() {
    let (base, _state) = spawn_app(SessionCryptoConfig::default()).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/ask"))
        .json(&json!({ "question": "hi" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["x-veil-enabled"], "true");
    assert_eq!(response.headers()["x-veil-encrypted"], "0");
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["answer"], "hello");
    assert_eq!(body["echo"]["question"], "hi");
}

#[tokio::test]
async fn marked_request_without_key_fails_open() {
    let (base, _state) = spawn_app(SessionCryptoConfig::default()).await;
    let client = reqwest::Client::new();

    // Never-handshaken session id, plaintext body: must be processed as-is
    let response = client
        .post(format!("{base}/ask"))
        .header("x-veil-encrypted", "1")
        .header("x-veil-session", "never-handshaken")
        .json(&json!({ "question": "hi" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["echo"]["question"], "hi");
}

#[tokio::test]
async fn strict_mode_rejects_marked_request_without_key() {
    let config = SessionCryptoConfig::new().with_strictness(Strictness::Strict);
    let (base, _state) = spawn_app(config).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/ask"))
        .header("x-veil-encrypted", "1")
        .header("x-veil-session", "never-handshaken")
        .json(&json!({ "question": "hi" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 428);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "handshake_required");
}

#[tokio::test]
async fn marked_request_with_key_round_trips() {
    let (base, state) = spawn_app(SessionCryptoConfig::default()).await;
    let key = install_key(&state, "abc123");
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/ask"))
        .header("x-veil-encrypted", "1")
        .header("x-veil-session", "abc123")
        .json(&envelope_body(&key, &json!({ "question": "hi" })))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["x-veil-encrypted"], "1");

    let body: Value = response.json().await.unwrap();
    let sealed = BASE64.decode(body["encrypted"].as_str().unwrap()).unwrap();
    let plaintext = key.open(&sealed).unwrap();
    let payload: Value = serde_json::from_slice(&plaintext).unwrap();
    assert_eq!(payload["answer"], "hello");
    assert_eq!(payload["echo"]["question"], "hi");
}

#[tokio::test]
async fn corrupted_ciphertext_fails_closed() {
    let (base, state) = spawn_app(SessionCryptoConfig::default()).await;
    let key = install_key(&state, "abc123");
    let client = reqwest::Client::new();

    let mut body = envelope_body(&key, &json!({ "question": "hi" }));
    let corrupted = format!("AAAA{}", body["encrypted"].as_str().unwrap());
    body["encrypted"] = Value::String(corrupted);

    let response = client
        .post(format!("{base}/ask"))
        .header("x-veil-encrypted", "1")
        .header("x-veil-session", "abc123")
        .json(&body)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "decryption_failed");
}

#[tokio::test]
async fn marked_request_with_key_but_no_envelope_fails_closed() {
    let (base, state) = spawn_app(SessionCryptoConfig::default()).await;
    let _key = install_key(&state, "abc123");
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/ask"))
        .header("x-veil-encrypted", "1")
        .header("x-veil-session", "abc123")
        .json(&json!({ "question": "hi" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "payload_malformed");
}

#[tokio::test]
async fn session_id_resolves_from_cookie() {
    let (base, state) = spawn_app(SessionCryptoConfig::default()).await;
    let key = install_key(&state, "cookie-session");
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/ask"))
        .header("x-veil-encrypted", "1")
        .header("cookie", "theme=dark; veil_session=cookie-session")
        .json(&envelope_body(&key, &json!({ "question": "hi" })))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["x-veil-encrypted"], "1");
}

#[tokio::test]
async fn disabled_layer_ignores_markers() {
    let (base, _state) = spawn_app(SessionCryptoConfig::new().with_enabled(false)).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/ask"))
        .header("x-veil-encrypted", "1")
        .header("x-veil-session", "abc123")
        .json(&json!({ "question": "hi" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["x-veil-enabled"], "false");
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["echo"]["question"], "hi");
}

#[tokio::test]
async fn event_streams_bypass_body_substitution_and_encrypt_per_event() {
    let (base, state) = spawn_app(SessionCryptoConfig::default()).await;
    let key = install_key(&state, "abc123");
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/events"))
        .header("x-veil-encrypted", "1")
        .header("x-veil-session", "abc123")
        .json(&envelope_body(&key, &json!({ "question": "hi" })))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    // The outbound stage leaves the stream body alone
    assert_eq!(response.headers()["x-veil-encrypted"], "0");
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));

    let text = response.text().await.unwrap();
    let decoded: Vec<Vec<u8>> = text
        .lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .map(|data| {
            let sealed = BASE64.decode(data).expect("event should be base64");
            key.open(&sealed).expect("event should decrypt")
        })
        .collect();
    assert_eq!(decoded, vec![b"tok-1".to_vec(), b"tok-2".to_vec()]);
}

#[tokio::test]
async fn events_without_session_key_stream_as_plaintext() {
    let (base, _state) = spawn_app(SessionCryptoConfig::default()).await;
    let client = reqwest::Client::new();

    // No handshake yet: the same route emits readable plaintext events
    let response = client
        .post(format!("{base}/events"))
        .json(&json!({ "question": "hi" }))
        .send()
        .await
        .unwrap();

    let text = response.text().await.unwrap();
    let data: Vec<&str> = text
        .lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .collect();
    assert_eq!(data, vec!["tok-1", "tok-2"]);
}

#[tokio::test]
async fn expired_key_falls_back_to_passthrough() {
    let config = SessionCryptoConfig::new().with_key_ttl(Duration::ZERO);
    let (base, state) = spawn_app(config).await;
    install_key(&state, "abc123");
    tokio::time::sleep(Duration::from_millis(10)).await;

    // Key has expired: the marked plaintext request takes the fail-open path
    let client = reqwest::Client::new();
    let response = client
        .post(format!("{base}/ask"))
        .header("x-veil-encrypted", "1")
        .header("x-veil-session", "abc123")
        .json(&json!({ "question": "hi" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["x-veil-encrypted"], "0");
}
