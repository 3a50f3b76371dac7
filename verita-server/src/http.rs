//! Verita HTTP REST API
//!
//! Axum-based HTTP server exposing the fact-check pipeline.
//!
//! Architecture: each endpoint has a thin axum handler that delegates to a
//! directly-testable inner function. Authentication is an upstream
//! concern; the `requesterId` a caller supplies is trusted as
//! already-resolved identity.
//!
//! Endpoints:
//! - GET  /health                      — health check with DB status
//! - GET  /version                     — server version info
//! - POST /fact-check/verify-external  — synchronous verification
//! - POST /fact-check                  — streaming verification (text/plain)
//! - POST /fact-check/verify           — media/URL-augmented verification (multipart)
//! - POST /fact-check/auto-verify      — evidence-based auto-verdict (multipart)
//! - GET  /fact-check                  — record history, newest first
//! - GET  /fact-check/stats            — record counts by status
//! - GET  /fact-check/:id              — one record

use std::sync::Arc;

use anyhow::Result;
use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde::Deserialize;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use uuid::Uuid;
use verita_core::{GatewayError, VeritaConfig, VeritaError};

use crate::subsystems::media::MediaUpload;
use crate::subsystems::orchestrator::FactCheckOrchestrator;

/// MIME type prefixes admitted for media uploads.
const ALLOWED_MIME_PREFIXES: &[&str] = &["image/", "video/", "audio/"];

/// Shared state for all HTTP handlers
#[derive(Clone)]
pub struct HttpState {
    pub orchestrator: Arc<FactCheckOrchestrator>,
    /// Present when running against Postgres; `None` in in-memory setups.
    pub pool: Option<PgPool>,
    pub config: VeritaConfig,
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<HttpState>) -> Router {
    let body_limit = state.config.media.max_upload_bytes + 64 * 1024;

    Router::new()
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route("/fact-check/verify-external", post(verify_external_handler))
        .route("/fact-check", post(verify_stream_handler).get(list_handler))
        .route("/fact-check/verify", post(verify_media_handler))
        .route("/fact-check/auto-verify", post(auto_verify_handler))
        .route("/fact-check/stats", get(stats_handler))
        .route("/fact-check/:id", get(find_one_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    state: Arc<HttpState>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", state.config.http.host, state.config.http.port);
    let app = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Verita HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Request / Response DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub requester_id: Option<String>,
    pub query: Option<String>,
}

/// Standard HTTP error response
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status: String,
    pub retryable: bool,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>, retryable: bool) -> Self {
        Self {
            error: msg.into(),
            status: "error".to_string(),
            retryable,
        }
    }
}

/// Map a pipeline error to an HTTP status plus structured body.
pub fn error_to_http(err: &VeritaError) -> (StatusCode, serde_json::Value) {
    let status = match err {
        VeritaError::NotFound(_) => StatusCode::NOT_FOUND,
        VeritaError::EmptyQuery => StatusCode::BAD_REQUEST,
        VeritaError::MediaUpload(_) | VeritaError::MediaUnreachable(_) => StatusCode::BAD_REQUEST,
        VeritaError::VerificationFailed(g) => match g {
            GatewayError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Unauthorized | GatewayError::Unknown(_) => StatusCode::BAD_GATEWAY,
        },
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let body = serde_json::to_value(ErrorResponse::new(err.to_string(), err.is_retryable()))
        .unwrap_or_else(|_| serde_json::json!({ "error": "internal error", "status": "error" }));

    (status, body)
}

fn bad_request(msg: &str) -> (StatusCode, serde_json::Value) {
    (
        StatusCode::BAD_REQUEST,
        serde_json::to_value(ErrorResponse::new(msg, false))
            .unwrap_or(serde_json::Value::Null),
    )
}

/// Pull a trimmed, non-empty value out of an optional request field.
fn required_field(value: Option<String>, name: &str) -> Result<String, (StatusCode, serde_json::Value)> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(bad_request(&format!("{} field is required", name))),
    }
}

// ============================================================================
// Inner (directly testable) business logic functions
// ============================================================================

/// Inner health check — probes DB when configured.
pub async fn health_inner(pool: Option<&PgPool>) -> (StatusCode, serde_json::Value) {
    let database = match pool {
        Some(pool) => match verita_core::db::health_check(pool).await {
            Ok(version) => version,
            Err(e) => {
                return (
                    StatusCode::SERVICE_UNAVAILABLE,
                    serde_json::json!({
                        "status": "unhealthy",
                        "error": e.to_string(),
                    }),
                );
            }
        },
        None => "in-memory".to_string(),
    };

    (
        StatusCode::OK,
        serde_json::json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION"),
            "database": database,
        }),
    )
}

/// Inner version — returns version info (pure, no IO).
pub fn version_inner() -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": "verita/1",
    })
}

/// Inner synchronous verification.
pub async fn verify_external_inner(
    state: &HttpState,
    req: VerifyRequest,
) -> (StatusCode, serde_json::Value) {
    let requester_id = match required_field(req.requester_id, "requesterId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let query = match required_field(req.query, "query") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match state.orchestrator.verify_external(&requester_id, &query).await {
        Ok(outcome) => (
            StatusCode::OK,
            serde_json::json!({
                "id": outcome.record_id,
                "result": outcome.result,
            }),
        ),
        Err(e) => error_to_http(&e),
    }
}

/// Inner media/URL-augmented verification.
pub async fn verify_media_inner(
    state: &HttpState,
    requester_id: String,
    query: String,
    media: Option<MediaUpload>,
) -> (StatusCode, serde_json::Value) {
    if media.is_none() && query.trim().is_empty() {
        return bad_request("either query or media is required");
    }

    match state
        .orchestrator
        .verify_with_media(&requester_id, &query, media)
        .await
    {
        Ok(outcome) => (
            StatusCode::OK,
            serde_json::json!({
                "id": outcome.record_id,
                "result": outcome.result,
            }),
        ),
        Err(e) => error_to_http(&e),
    }
}

/// Inner auto-verification.
pub async fn auto_verify_inner(
    state: &HttpState,
    text: String,
    media: Option<MediaUpload>,
) -> (StatusCode, serde_json::Value) {
    if text.trim().is_empty() {
        return bad_request("text field is required");
    }

    match state.orchestrator.auto_verify(&text, media).await {
        Ok(outcome) => match serde_json::to_value(&outcome) {
            Ok(body) => (StatusCode::OK, body),
            Err(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": e.to_string(), "status": "error" }),
            ),
        },
        Err(e) => error_to_http(&e),
    }
}

/// Inner record listing, newest first.
pub async fn list_inner(state: &HttpState) -> (StatusCode, serde_json::Value) {
    match state.orchestrator.find_all().await {
        Ok(records) => match serde_json::to_value(&records) {
            Ok(body) => (StatusCode::OK, body),
            Err(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": e.to_string(), "status": "error" }),
            ),
        },
        Err(e) => error_to_http(&e),
    }
}

/// Inner single-record lookup.
pub async fn find_one_inner(state: &HttpState, id: Uuid) -> (StatusCode, serde_json::Value) {
    match state.orchestrator.find_one(id).await {
        Ok(record) => match serde_json::to_value(&record) {
            Ok(body) => (StatusCode::OK, body),
            Err(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": e.to_string(), "status": "error" }),
            ),
        },
        Err(e) => error_to_http(&e),
    }
}

/// Inner status counts.
pub async fn stats_inner(state: &HttpState) -> (StatusCode, serde_json::Value) {
    match state.orchestrator.stats().await {
        Ok(counts) => match serde_json::to_value(&counts) {
            Ok(body) => (StatusCode::OK, body),
            Err(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": e.to_string(), "status": "error" }),
            ),
        },
        Err(e) => error_to_http(&e),
    }
}

// ============================================================================
// Multipart parsing
// ============================================================================

struct MultipartFields {
    values: std::collections::HashMap<String, String>,
    media: Option<MediaUpload>,
}

async fn read_multipart(
    state: &HttpState,
    mut multipart: Multipart,
) -> Result<MultipartFields, (StatusCode, serde_json::Value)> {
    let mut fields = MultipartFields {
        values: std::collections::HashMap::new(),
        media: None,
    };

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(bad_request(&format!("malformed multipart body: {}", e))),
        };

        let name = field.name().unwrap_or_default().to_string();

        if name == "media" {
            let mime_type = field.content_type().unwrap_or_default().to_string();
            if !ALLOWED_MIME_PREFIXES.iter().any(|p| mime_type.starts_with(p)) {
                return Err(bad_request(&format!(
                    "unsupported media type: {:?} (expected image/video/audio)",
                    mime_type
                )));
            }

            let original_name = field.file_name().unwrap_or("upload").to_string();
            let bytes: Bytes = match field.bytes().await {
                Ok(bytes) => bytes,
                Err(e) => return Err(bad_request(&format!("failed to read media field: {}", e))),
            };

            if bytes.len() > state.config.media.max_upload_bytes {
                return Err((
                    StatusCode::PAYLOAD_TOO_LARGE,
                    serde_json::to_value(ErrorResponse::new(
                        format!(
                            "media exceeds the {} byte limit",
                            state.config.media.max_upload_bytes
                        ),
                        false,
                    ))
                    .unwrap_or(serde_json::Value::Null),
                ));
            }

            fields.media = Some(MediaUpload {
                bytes,
                mime_type,
                original_name,
            });
        } else {
            let value = match field.text().await {
                Ok(text) => text,
                Err(e) => return Err(bad_request(&format!("failed to read field {}: {}", name, e))),
            };
            fields.values.insert(name, value);
        }
    }

    Ok(fields)
}

// ============================================================================
// Axum handler wrappers (thin — delegate to inner functions)
// ============================================================================

pub async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = health_inner(state.pool.as_ref()).await;
    (status, Json(body))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

pub async fn verify_external_handler(
    State(state): State<Arc<HttpState>>,
    Json(req): Json<VerifyRequest>,
) -> impl IntoResponse {
    let (status, body) = verify_external_inner(&state, req).await;
    (status, Json(body))
}

/// Streaming handler: relays verdict bytes as a chunked `text/plain` body.
/// A mid-stream upstream failure surfaces as a body error that terminates
/// the connection — never a silent truncation.
pub async fn verify_stream_handler(
    State(state): State<Arc<HttpState>>,
    Json(req): Json<VerifyRequest>,
) -> Response {
    let requester_id = match required_field(req.requester_id, "requesterId") {
        Ok(v) => v,
        Err((status, body)) => return (status, Json(body)).into_response(),
    };
    let query = match required_field(req.query, "query") {
        Ok(v) => v,
        Err((status, body)) => return (status, Json(body)).into_response(),
    };

    match state.orchestrator.verify_stream(&requester_id, &query).await {
        Ok(handle) => {
            let builder = Response::builder()
                .status(StatusCode::OK)
                .header("content-type", "text/plain; charset=utf-8")
                .header("x-fact-check-id", handle.record_id.to_string());

            match builder.body(Body::from_stream(handle.stream)) {
                Ok(response) => response,
                Err(e) => {
                    tracing::error!(error = %e, "failed to build stream response");
                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                }
            }
        }
        Err(e) => {
            let (status, body) = error_to_http(&e);
            (status, Json(body)).into_response()
        }
    }
}

pub async fn verify_media_handler(
    State(state): State<Arc<HttpState>>,
    multipart: Multipart,
) -> impl IntoResponse {
    let mut fields = match read_multipart(&state, multipart).await {
        Ok(fields) => fields,
        Err((status, body)) => return (status, Json(body)),
    };

    let requester_id = match required_field(fields.values.remove("requesterId"), "requesterId") {
        Ok(v) => v,
        Err((status, body)) => return (status, Json(body)),
    };
    let query = fields.values.remove("query").unwrap_or_default();

    let (status, body) = verify_media_inner(&state, requester_id, query, fields.media).await;
    (status, Json(body))
}

pub async fn auto_verify_handler(
    State(state): State<Arc<HttpState>>,
    multipart: Multipart,
) -> impl IntoResponse {
    let mut fields = match read_multipart(&state, multipart).await {
        Ok(fields) => fields,
        Err((status, body)) => return (status, Json(body)),
    };

    let text = fields.values.remove("text").unwrap_or_default();

    let (status, body) = auto_verify_inner(&state, text, fields.media).await;
    (status, Json(body))
}

pub async fn list_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = list_inner(&state).await;
    (status, Json(body))
}

pub async fn find_one_handler(
    State(state): State<Arc<HttpState>>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    let (status, body) = find_one_inner(&state, id).await;
    (status, Json(body))
}

pub async fn stats_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = stats_inner(&state).await;
    (status, Json(body))
}

// ============================================================================
// Unit Tests — pure pieces; full dispatch tests live in tests/
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_inner_pure() {
        let v = version_inner();
        assert!(v["version"].is_string(), "version must be string");
        assert_eq!(v["protocol"], "verita/1", "protocol must be verita/1");
    }

    #[test]
    fn test_error_to_http_not_found() {
        let (status, body) = error_to_http(&VeritaError::NotFound(Uuid::new_v4()));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], "error");
        assert_eq!(body["retryable"], false);
    }

    #[test]
    fn test_error_to_http_gateway_reasons() {
        let cases = [
            (GatewayError::RateLimited, StatusCode::TOO_MANY_REQUESTS, true),
            (GatewayError::Timeout, StatusCode::GATEWAY_TIMEOUT, true),
            (GatewayError::Unauthorized, StatusCode::BAD_GATEWAY, false),
            (
                GatewayError::Unknown("boom".to_string()),
                StatusCode::BAD_GATEWAY,
                false,
            ),
        ];

        for (gateway_err, expected_status, retryable) in cases {
            let (status, body) = error_to_http(&VeritaError::VerificationFailed(gateway_err));
            assert_eq!(status, expected_status);
            assert_eq!(body["retryable"], retryable);
        }
    }

    #[test]
    fn test_error_to_http_media_errors_are_client_retryable() {
        let (status, body) = error_to_http(&VeritaError::MediaUpload("disk full".to_string()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["retryable"], true);

        let (status, _) =
            error_to_http(&VeritaError::MediaUnreachable("http://x".to_string()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_required_field_rejects_empty_and_missing() {
        assert!(required_field(None, "query").is_err());
        assert!(required_field(Some("  ".to_string()), "query").is_err());
        assert_eq!(
            required_field(Some(" ok ".to_string()), "query").unwrap(),
            "ok"
        );
    }
}
