//! Vision/audio description client.
//!
//! Sends an uploaded media payload inline (base64) to the external
//! vision/audio-understanding service and extracts a single-sentence
//! description. The prompt pins the output contract: exactly one short
//! factual sentence — a verifiable statement or a yes/no question — or the
//! fixed [`NO_CLAIM_SENTINEL`] when nothing checkable is present.

use std::time::Duration;

use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::VisionConfig;

/// Fixed sentinel the service must return when the media carries no
/// verifiable claim.
pub const NO_CLAIM_SENTINEL: &str = "NO VERIFIABLE CLAIM";

const CLAIM_PROMPT: &str = "State what this media shows as exactly one short factual sentence: \
either a verifiable statement or a yes/no question. No advice, no explanation, no opinion. \
If nothing checkable is visible or audible, reply exactly: NO VERIFIABLE CLAIM";

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("missing description in response")]
    MissingDescription,

    #[error("missing API key")]
    MissingApiKey,
}

// ============================================================================
// Wire structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

// ============================================================================
// VisionClient
// ============================================================================

#[derive(Debug, Clone)]
pub struct VisionClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl VisionClient {
    pub fn new(config: &VisionConfig, api_key: String) -> Result<Self, VisionError> {
        Self::with_base_url(config, api_key, config.base_url.clone())
    }

    /// Create a client with a custom base URL (for testing / integration)
    pub fn with_base_url(
        config: &VisionConfig,
        api_key: String,
        base_url: String,
    ) -> Result<Self, VisionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            base_url,
        })
    }

    /// Describe a media payload. Enrichment callers are expected to catch
    /// errors at their own boundary and substitute degraded content.
    pub async fn describe(&self, mime_type: &str, data: &[u8]) -> Result<String, VisionError> {
        if self.api_key.is_empty() {
            return Err(VisionError::MissingApiKey);
        }

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part {
                        inline_data: Some(InlineData {
                            mime_type: mime_type.to_string(),
                            data: base64::engine::general_purpose::STANDARD.encode(data),
                        }),
                        text: None,
                    },
                    Part {
                        inline_data: None,
                        text: Some(CLAIM_PROMPT.to_string()),
                    },
                ],
            }],
        };

        let response = self.client.post(&url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(code = status.as_u16(), message = %message, "vision API error");
            return Err(VisionError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let body: GenerateResponse = response.json().await?;

        body.candidates
            .and_then(|mut c| c.drain(..).next())
            .and_then(|c| c.content)
            .and_then(|c| c.parts)
            .and_then(|mut p| p.drain(..).next())
            .and_then(|p| p.text)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(VisionError::MissingDescription)
    }
}

// ============================================================================
// TESTS
// ============================================================================
