//! HTTP adapter over the engine.
//!
//! A thin axum layer: handlers decode the key from the path, dispatch the
//! typed operation through the [`ShardRouter`], and render the result as
//! JSON. Response bodies are assembled byte-wise (values are arbitrary
//! bytes, not UTF-8), using the helpers in [`encoding`].
//!
//! Routes:
//! - `GET    /api/v1/kv/keys/{key}` - fetch value
//! - `PUT    /api/v1/kv/keys/{key}` - store value (request body = raw bytes)
//! - `DELETE /api/v1/kv/keys/{key}` - delete key
//! - `GET    /api/v1/kv/keys`       - list all keys, sorted ascending
//! - `GET    /health`               - health check
//! - `GET    /stats`                - server statistics

pub mod encoding;

use crate::core::error::KvError;
use crate::engine::router::ShardRouter;
use crate::storage::partition::validate_key;
use axum::body::Bytes;
use axum::extract::{RawPathParams, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;

/// Shared state for the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    router: Arc<ShardRouter>,
}

impl AppState {
    /// Build handler state over an engine's router.
    pub fn new(router: Arc<ShardRouter>) -> Self {
        Self { router }
    }
}

/// Build the HTTP application.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/kv/keys", get(list_keys))
        .route(
            "/api/v1/kv/keys/:key",
            get(get_key).put(put_key).delete(delete_key),
        )
        .route("/health", get(health))
        .route("/stats", get(stats))
        .with_state(state)
}

async fn get_key(State(state): State<AppState>, params: RawPathParams) -> Response {
    let key = match key_from_params(&params) {
        Ok(key) => key,
        Err(response) => return response,
    };

    match state.router.get(&key).await {
        Ok(Some(value)) => value_response(&value),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "Key not found"),
        Err(err) => internal_response(err, "Failed to fetch key"),
    }
}

async fn put_key(
    State(state): State<AppState>,
    params: RawPathParams,
    body: Bytes,
) -> Response {
    let key = match key_from_params(&params) {
        Ok(key) => key,
        Err(response) => return response,
    };

    match state.router.put(&key, body).await {
        Ok(()) => success_response("Key stored successfully"),
        Err(err) => internal_response(err, "Failed to store key"),
    }
}

async fn delete_key(State(state): State<AppState>, params: RawPathParams) -> Response {
    let key = match key_from_params(&params) {
        Ok(key) => key,
        Err(response) => return response,
    };

    match state.router.remove(&key).await {
        Ok(()) => success_response("Key deleted successfully"),
        Err(err) => internal_response(err, "Failed to delete key"),
    }
}

async fn list_keys(State(state): State<AppState>) -> Response {
    match state.router.list_keys_all().await {
        Ok(keys) => keys_response(&keys),
        Err(err) => internal_response(err, "Failed to list keys"),
    }
}

async fn health() -> Response {
    json_response(
        StatusCode::OK,
        br#"{"status":"success","message":"Server is healthy"}"#.to_vec(),
    )
}

async fn stats(State(state): State<AppState>) -> Response {
    let body = format!(
        r#"{{"status":"success","data":{{"stats":{{"shard_count":{}}}}}}}"#,
        state.router.partition_count()
    );
    json_response(StatusCode::OK, body.into_bytes())
}

/// Decode and validate the `{key}` path parameter. The raw (still
/// percent-encoded) segment is decoded with the crate's own `url_decode`,
/// so keys may be arbitrary bytes.
fn key_from_params(params: &RawPathParams) -> Result<Vec<u8>, Response> {
    let raw = params
        .iter()
        .find(|(name, _)| *name == "key")
        .map(|(_, value)| value)
        .unwrap_or("");

    let key = encoding::url_decode(raw.as_bytes());
    match validate_key(&key) {
        Ok(()) => Ok(key),
        Err(KvError::EmptyKey) => Err(error_response(StatusCode::BAD_REQUEST, "Empty key")),
        Err(_) => Err(error_response(
            StatusCode::BAD_REQUEST,
            "Key too long (max 255 bytes)",
        )),
    }
}

fn json_response(status: StatusCode, body: Vec<u8>) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}

fn value_response(value: &[u8]) -> Response {
    let mut body = Vec::with_capacity(value.len() + 48);
    body.extend_from_slice(br#"{"status":"success","data":{"value":""#);
    body.extend_from_slice(&encoding::json_escape(value));
    body.extend_from_slice(br#""}}"#);
    json_response(StatusCode::OK, body)
}

fn keys_response(keys: &[Vec<u8>]) -> Response {
    let mut body = Vec::new();
    body.extend_from_slice(br#"{"status":"success","data":{"keys":["#);
    for (i, key) in keys.iter().enumerate() {
        if i > 0 {
            body.push(b',');
        }
        body.push(b'"');
        body.extend_from_slice(&encoding::json_escape(key));
        body.push(b'"');
    }
    body.extend_from_slice(b"]}}");
    json_response(StatusCode::OK, body)
}

fn success_response(message: &str) -> Response {
    let mut body = Vec::with_capacity(message.len() + 40);
    body.extend_from_slice(br#"{"status":"success","message":""#);
    body.extend_from_slice(&encoding::json_escape(message.as_bytes()));
    body.extend_from_slice(br#""}"#);
    json_response(StatusCode::OK, body)
}

fn error_response(status: StatusCode, message: &str) -> Response {
    let mut body = Vec::with_capacity(message.len() + 40);
    body.extend_from_slice(br#"{"status":"error","message":""#);
    body.extend_from_slice(&encoding::json_escape(message.as_bytes()));
    body.extend_from_slice(br#""}"#);
    json_response(status, body)
}

/// Map a dispatch failure to a response. Validation never reaches here;
/// everything else is an internal failure.
fn internal_response(err: KvError, message: &str) -> Response {
    if err.is_validation() {
        return error_response(StatusCode::BAD_REQUEST, &err.to_string());
    }
    error_response(StatusCode::INTERNAL_SERVER_ERROR, message)
}
