//! HTTP adapter tests: encoding helpers and route behavior.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use common::{temp_data_dir, test_config};
use http_body_util::BodyExt;
use stratum::engine::Engine;
use stratum::http::encoding::{json_escape, url_decode, url_encode};
use stratum::http::{app, AppState};
use tempfile::TempDir;
use tower::ServiceExt;

// ============================================================================
// Encoding tests
// ============================================================================

#[test]
fn json_escape_covers_escape_set() {
    assert_eq!(
        json_escape(b"\"\\\x08\x0c\n\r\t"),
        b"\\\"\\\\\\b\\f\\n\\r\\t".to_vec()
    );
    assert_eq!(json_escape(&[0x01]), b"\\u0001".to_vec());
    assert_eq!(json_escape(&[0x1f]), b"\\u001f".to_vec());
}

#[test]
fn json_escape_roundtrips_through_a_json_decoder() {
    let inputs = [
        "plain",
        "with \"quotes\" and \\backslashes\\",
        "tabs\tand\nnewlines\r",
        "control \x01\x02\x1f bytes",
        "unicode: héllo wörld ☃",
    ];

    for input in inputs {
        let escaped = String::from_utf8(json_escape(input.as_bytes())).unwrap();
        let document = format!("\"{}\"", escaped);
        let decoded: String = serde_json::from_str(&document).unwrap();
        assert_eq!(decoded, input);
    }
}

#[test]
fn json_escape_passes_high_bytes_through() {
    assert_eq!(json_escape(&[0x80, 0xab, 0xff]), vec![0x80, 0xab, 0xff]);
}

#[test]
fn url_decode_handles_percent_and_plus() {
    assert_eq!(url_decode(b"a%2Fb"), b"a/b".to_vec());
    assert_eq!(url_decode(b"a+b"), b"a b".to_vec());
    assert_eq!(url_decode(b"%41%42c"), b"ABc".to_vec());
    // Malformed escapes pass through literally.
    assert_eq!(url_decode(b"100%zz"), b"100%zz".to_vec());
    assert_eq!(url_decode(b"trailing%4"), b"trailing%4".to_vec());
}

#[test]
fn url_encode_roundtrips_arbitrary_bytes() {
    let bytes: Vec<u8> = (0u8..=255).collect();
    let encoded = url_encode(&bytes);
    assert_eq!(url_decode(encoded.as_bytes()), bytes);

    assert_eq!(url_encode(b"a b/c"), "a%20b%2Fc");
    assert_eq!(url_encode(b"safe-chars_.~"), "safe-chars_.~");
}

// ============================================================================
// Route tests
// ============================================================================

/// Build an app over a fresh two-partition engine. The TempDir must outlive
/// the requests.
async fn test_app() -> (Router, Engine, TempDir) {
    let dir = temp_data_dir();
    let config = test_config(dir.path(), 2, 16);
    let engine = Engine::start(&config).await.unwrap();
    let router = app(AppState::new(engine.router()));
    (router, engine, dir)
}

async fn send(router: &Router, method: &str, uri: &str, body: &[u8]) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::from(body.to_vec()))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec())
}

#[tokio::test]
async fn health_endpoint() {
    let (router, mut engine, _dir) = test_app().await;

    let (status, body) = send(&router, "GET", "/health", b"").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, br#"{"status":"success","message":"Server is healthy"}"#);

    engine.stop().await;
}

#[tokio::test]
async fn stats_reports_shard_count() {
    let (router, mut engine, _dir) = test_app().await;

    let (status, body) = send(&router, "GET", "/stats", b"").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        br#"{"status":"success","data":{"stats":{"shard_count":2}}}"#
    );

    engine.stop().await;
}

#[tokio::test]
async fn put_then_get_roundtrip() {
    let (router, mut engine, _dir) = test_app().await;

    let (status, body) = send(&router, "PUT", "/api/v1/kv/keys/hello", b"world").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        br#"{"status":"success","message":"Key stored successfully"}"#
    );

    let (status, body) = send(&router, "GET", "/api/v1/kv/keys/hello", b"").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        br#"{"status":"success","data":{"value":"world"}}"#
    );

    engine.stop().await;
}

#[tokio::test]
async fn get_missing_key_is_404() {
    let (router, mut engine, _dir) = test_app().await;

    let (status, body) = send(&router, "GET", "/api/v1/kv/keys/nope", b"").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, br#"{"status":"error","message":"Key not found"}"#);

    engine.stop().await;
}

#[tokio::test]
async fn delete_removes_key() {
    let (router, mut engine, _dir) = test_app().await;

    send(&router, "PUT", "/api/v1/kv/keys/doomed", b"x").await;
    let (status, body) = send(&router, "DELETE", "/api/v1/kv/keys/doomed", b"").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        br#"{"status":"success","message":"Key deleted successfully"}"#
    );

    let (status, _) = send(&router, "GET", "/api/v1/kv/keys/doomed", b"").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    engine.stop().await;
}

#[tokio::test]
async fn list_keys_sorted_ascending() {
    let (router, mut engine, _dir) = test_app().await;

    send(&router, "PUT", "/api/v1/kv/keys/banana", b"2").await;
    send(&router, "PUT", "/api/v1/kv/keys/apple", b"1").await;
    send(&router, "PUT", "/api/v1/kv/keys/cherry", b"3").await;

    let (status, body) = send(&router, "GET", "/api/v1/kv/keys", b"").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        br#"{"status":"success","data":{"keys":["apple","banana","cherry"]}}"#
    );

    engine.stop().await;
}

#[tokio::test]
async fn url_encoded_keys_are_decoded() {
    let (router, mut engine, _dir) = test_app().await;

    let (status, _) = send(&router, "PUT", "/api/v1/kv/keys/a%2Fb", b"slash").await;
    assert_eq!(status, StatusCode::OK);

    // `+` in a path segment decodes to a space, as does %20.
    let (status, _) = send(&router, "PUT", "/api/v1/kv/keys/a+b", b"space").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&router, "GET", "/api/v1/kv/keys/a%2Fb", b"").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, br#"{"status":"success","data":{"value":"slash"}}"#);

    let (status, body) = send(&router, "GET", "/api/v1/kv/keys/a%20b", b"").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, br#"{"status":"success","data":{"value":"space"}}"#);

    engine.stop().await;
}

#[tokio::test]
async fn oversized_key_is_400() {
    let (router, mut engine, _dir) = test_app().await;

    let long_key = "a".repeat(256);
    let uri = format!("/api/v1/kv/keys/{long_key}");
    let (status, body) = send(&router, "PUT", &uri, b"v").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        br#"{"status":"error","message":"Key too long (max 255 bytes)"}"#
    );

    // A 255-byte key is accepted.
    let max_key = "a".repeat(255);
    let uri = format!("/api/v1/kv/keys/{max_key}");
    let (status, _) = send(&router, "PUT", &uri, b"v").await;
    assert_eq!(status, StatusCode::OK);

    engine.stop().await;
}

#[tokio::test]
async fn values_with_quotes_and_newlines_roundtrip() {
    let (router, mut engine, _dir) = test_app().await;

    let value = "he said \"hi\",\nthen left\t";
    send(&router, "PUT", "/api/v1/kv/keys/quote", value.as_bytes()).await;

    let (status, body) = send(&router, "GET", "/api/v1/kv/keys/quote", b"").await;
    assert_eq!(status, StatusCode::OK);

    let document: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(document["status"], "success");
    assert_eq!(document["data"]["value"], value);

    engine.stop().await;
}

#[tokio::test]
async fn list_after_restart_sees_persisted_keys() {
    let dir = temp_data_dir();
    let config = test_config(dir.path(), 2, 16);

    let mut engine = Engine::start(&config).await.unwrap();
    let router = app(AppState::new(engine.router()));
    send(&router, "PUT", "/api/v1/kv/keys/persist", b"yes").await;
    engine.stop().await;

    let mut engine = Engine::start(&config).await.unwrap();
    let router = app(AppState::new(engine.router()));
    let (status, body) = send(&router, "GET", "/api/v1/kv/keys/persist", b"").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, br#"{"status":"success","data":{"value":"yes"}}"#);

    engine.stop().await;
}
