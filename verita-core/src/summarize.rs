//! Web-content summarization client (chat-completions shape).
//!
//! Used by URL analysis to obtain a prose summary of a page's factual
//! content. Enrichment-only: callers fall back to evidence search when
//! this client errors.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SummarizerConfig;

const SYSTEM_PROMPT: &str = "You are a fact-checking assistant. Summarize the factual content \
of the page at the given URL and surface its checkable claims.";

#[derive(Error, Debug)]
pub enum SummarizeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("missing summary in response")]
    MissingSummary,

    #[error("missing API key")]
    MissingApiKey,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Option<Vec<ChatChoice>>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SummarizerClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl SummarizerClient {
    pub fn new(config: &SummarizerConfig, api_key: String) -> Result<Self, SummarizeError> {
        Self::with_base_url(config, api_key, config.base_url.clone())
    }

    /// Create a client with a custom base URL (for testing / integration)
    pub fn with_base_url(
        config: &SummarizerConfig,
        api_key: String,
        base_url: String,
    ) -> Result<Self, SummarizeError> {
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

    pub async fn summarize_url(&self, url: &str) -> Result<String, SummarizeError> {
        if self.api_key.is_empty() {
            return Err(SummarizeError::MissingApiKey);
        }

        let endpoint = format!("{}/chat/completions", self.base_url);

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: format!("Analyze this URL: {}", url),
                },
            ],
        };

        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(code = status.as_u16(), message = %message, "summarizer API error");
            return Err(SummarizeError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response.json().await?;

        body.choices
            .and_then(|mut c| c.drain(..).next())
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(SummarizeError::MissingSummary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer, api_key: &str) -> SummarizerClient {
        let config = SummarizerConfig {
            base_url: String::new(),
            model: "sonar-pro".to_string(),
            timeout_seconds: 5,
        };
        SummarizerClient::with_base_url(&config, api_key.to_string(), server.uri()).unwrap()
    }

    #[tokio::test]
    async fn test_summarize_extracts_first_choice_content() {
        let server = MockServer::start().await;
        let client = test_client(&server, "test-key");

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [
                    { "message": { "content": "The page claims X happened in 2019." } }
                ]
            })))
            .mount(&server)
            .await;

        let summary = client
            .summarize_url("http://example.com/page")
            .await
            .unwrap();
        assert_eq!(summary, "The page claims X happened in 2019.");
    }

    #[tokio::test]
    async fn test_summarize_fails_without_api_key() {
        let server = MockServer::start().await;
        let client = test_client(&server, "");

        let err = client.summarize_url("http://example.com").await.unwrap_err();
        assert!(matches!(err, SummarizeError::MissingApiKey));
    }

    #[tokio::test]
    async fn test_summarize_errors_on_empty_choices() {
        let server = MockServer::start().await;
        let client = test_client(&server, "test-key");

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })),
            )
            .mount(&server)
            .await;

        let err = client.summarize_url("http://example.com").await.unwrap_err();
        assert!(matches!(err, SummarizeError::MissingSummary));
    }

    #[tokio::test]
    async fn test_summarize_errors_on_api_failure() {
        let server = MockServer::start().await;
        let client = test_client(&server, "test-key");

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = client.summarize_url("http://example.com").await.unwrap_err();
        match err {
            SummarizeError::Api { code, .. } => assert_eq!(code, 429),
            other => panic!("expected Api error, got {:?}", other),
        }
    }
}
