//! Verification gateway — the single call point for the authoritative
//! external claim-verification capability.
//!
//! Provides a `VerificationGateway` trait with the production
//! [`VeraGatewayClient`] implementation, supporting:
//! - **blocking** — one request, one verdict string, bounded by a 30 s timeout
//! - **streaming** — incremental verdict bytes relayed as they arrive
//!
//! The gateway never retries on its own; retry policy belongs to callers.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::GatewayConfig;

/// Incremental verdict output. Each item is a chunk of UTF-8 text as the
/// upstream service produced it; an `Err` item terminates the stream.
pub type VerdictStream = Pin<Box<dyn Stream<Item = Result<Bytes, GatewayError>> + Send>>;

// ============================================================================
// VerificationGateway trait
// ============================================================================

#[async_trait]
pub trait VerificationGateway: Send + Sync {
    /// Blocking verification: returns the full verdict text.
    async fn verify(&self, requester_id: &str, query: &str) -> Result<String, GatewayError>;

    /// Streaming verification: chunks are relayed as they arrive, never
    /// buffered into a whole response first.
    async fn verify_streaming(
        &self,
        requester_id: &str,
        query: &str,
    ) -> Result<VerdictStream, GatewayError>;
}

// ============================================================================
// Error types
// ============================================================================

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("unauthorized: invalid verification API key")]
    Unauthorized,

    #[error("rate limit exceeded, try again later")]
    RateLimited,

    #[error("verification service timed out")]
    Timeout,

    #[error("verification service error: {0}")]
    Unknown(String),
}

impl GatewayError {
    /// `rate_limited` and `timeout` are candidates for caller-level retry
    /// with backoff; `unauthorized` and `unknown` are fatal to the request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::RateLimited | GatewayError::Timeout)
    }

    /// Stable machine-readable reason tag.
    pub fn reason(&self) -> &'static str {
        match self {
            GatewayError::Unauthorized => "unauthorized",
            GatewayError::RateLimited => "rate_limited",
            GatewayError::Timeout => "timeout",
            GatewayError::Unknown(_) => "unknown",
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GatewayError::Timeout
        } else {
            GatewayError::Unknown(e.to_string())
        }
    }
}

// ============================================================================
// Wire structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyRequest<'a> {
    requester_id: &'a str,
    query: &'a str,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    result: Option<String>,
    text: Option<String>,
}

// ============================================================================
// VeraGatewayClient
// ============================================================================

/// HTTP client for the Vera verification API.
pub struct VeraGatewayClient {
    /// Bounded client for the blocking path.
    client: reqwest::Client,
    /// Unbounded-read client for the streaming path; the overall request
    /// timeout would otherwise cap the stream's lifetime.
    stream_client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl VeraGatewayClient {
    pub fn new(config: &GatewayConfig, api_key: String) -> Result<Self, GatewayError> {
        Self::with_base_url(config, api_key, config.base_url.clone())
    }

    /// Create a client with a custom base URL (for testing / integration)
    pub fn with_base_url(
        config: &GatewayConfig,
        api_key: String,
        base_url: String,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        let stream_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            stream_client,
            api_key,
            base_url,
        })
    }

    fn map_status(status: reqwest::StatusCode, body: String) -> GatewayError {
        match status.as_u16() {
            401 | 403 => GatewayError::Unauthorized,
            429 => GatewayError::RateLimited,
            code => GatewayError::Unknown(format!("HTTP {}: {}", code, body)),
        }
    }
}

#[async_trait]
impl VerificationGateway for VeraGatewayClient {
    async fn verify(&self, requester_id: &str, query: &str) -> Result<String, GatewayError> {
        let url = format!("{}/verify", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("X-API-Key", &self.api_key)
            .json(&VerifyRequest {
                requester_id,
                query,
                stream: false,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(code = status.as_u16(), body = %body, "verification gateway error");
            return Err(Self::map_status(status, body));
        }

        // The service answers either a bare string or a JSON envelope with
        // a `result` (older deployments: `text`) field.
        let raw = response.text().await?;
        if let Ok(envelope) = serde_json::from_str::<VerifyResponse>(&raw) {
            if let Some(result) = envelope.result.or(envelope.text) {
                return Ok(result);
            }
        }

        Ok(raw)
    }

    async fn verify_streaming(
        &self,
        requester_id: &str,
        query: &str,
    ) -> Result<VerdictStream, GatewayError> {
        let url = format!("{}/verify", self.base_url);

        let response = self
            .stream_client
            .post(&url)
            .header("X-API-Key", &self.api_key)
            .json(&VerifyRequest {
                requester_id,
                query,
                stream: true,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(code = status.as_u16(), body = %body, "verification gateway stream refused");
            return Err(Self::map_status(status, body));
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(GatewayError::from));

        Ok(Box::pin(stream))
    }
}

// ============================================================================
// TESTS
// ============================================================================
