//! URL analysis — a prose summary of a page's factual content.
//!
//! Primary path is the external summarization service; on any failure the
//! analyzer falls back to evidence search with the URL as the query and
//! synthesizes a short summary line from the hits. The contract is
//! never-fails and never-empty.

use std::sync::Arc;

use async_trait::async_trait;
use verita_core::summarize::SummarizerClient;

use super::evidence::EvidenceSearch;

const FALLBACK_HIT_LIMIT: usize = 3;

#[async_trait]
pub trait UrlAnalyzer: Send + Sync {
    /// Summarize the page behind `url`. Always returns non-empty prose.
    async fn analyze_url(&self, url: &str) -> String;
}

pub struct PageSummaryAnalyzer {
    summarizer: Option<SummarizerClient>,
    evidence: Arc<dyn EvidenceSearch>,
}

impl PageSummaryAnalyzer {
    pub fn new(summarizer: Option<SummarizerClient>, evidence: Arc<dyn EvidenceSearch>) -> Self {
        Self {
            summarizer,
            evidence,
        }
    }

    async fn fallback_summary(&self, url: &str) -> String {
        let hits = self.evidence.search(url, FALLBACK_HIT_LIMIT).await;
        if hits.is_empty() {
            return format!("Summary (fallback) — no corroborating sources found for {}", url);
        }

        let lines: Vec<String> = hits
            .iter()
            .map(|h| format!("{}: {}", h.source, h.title))
            .collect();
        format!("Summary (fallback) — {}", lines.join(" | "))
    }
}

#[async_trait]
impl UrlAnalyzer for PageSummaryAnalyzer {
    async fn analyze_url(&self, url: &str) -> String {
        if let Some(summarizer) = &self.summarizer {
            match summarizer.summarize_url(url).await {
                Ok(summary) => return summary,
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "summarizer failed, falling back to evidence search");
                }
            }
        }

        self.fallback_summary(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verita_core::config::SummarizerConfig;
    use verita_core::models::EvidenceHit;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct StubEvidence {
        hits: Vec<EvidenceHit>,
    }

    #[async_trait]
    impl EvidenceSearch for StubEvidence {
        async fn search(&self, _query: &str, limit: usize) -> Vec<EvidenceHit> {
            self.hits.iter().take(limit).cloned().collect()
        }
    }

    fn stub_evidence() -> Arc<dyn EvidenceSearch> {
        Arc::new(StubEvidence {
            hits: vec![
                EvidenceHit {
                    source: "Reuters".to_string(),
                    title: "Debunked: viral claim".to_string(),
                    url: None,
                    snippet: String::new(),
                    score: 0.9,
                },
                EvidenceHit {
                    source: "Snopes".to_string(),
                    title: "Fact check of the claim".to_string(),
                    url: None,
                    snippet: String::new(),
                    score: 0.9,
                },
            ],
        })
    }

    fn summarizer(server: &MockServer) -> SummarizerClient {
        let config = SummarizerConfig {
            base_url: String::new(),
            model: "sonar-pro".to_string(),
            timeout_seconds: 2,
        };
        SummarizerClient::with_base_url(&config, "key".to_string(), server.uri()).unwrap()
    }

    #[tokio::test]
    async fn test_summarizer_result_wins() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [ { "message": { "content": "The page reports a flood in 2020." } } ]
            })))
            .mount(&server)
            .await;

        let analyzer = PageSummaryAnalyzer::new(Some(summarizer(&server)), stub_evidence());
        let summary = analyzer.analyze_url("http://example.com/article").await;
        assert_eq!(summary, "The page reports a flood in 2020.");
    }

    #[tokio::test]
    async fn test_falls_back_to_evidence_on_summarizer_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let analyzer = PageSummaryAnalyzer::new(Some(summarizer(&server)), stub_evidence());
        let summary = analyzer.analyze_url("http://example.com/article").await;
        assert_eq!(
            summary,
            "Summary (fallback) — Reuters: Debunked: viral claim | Snopes: Fact check of the claim"
        );
    }

    #[tokio::test]
    async fn test_no_summarizer_uses_fallback_directly() {
        let analyzer = PageSummaryAnalyzer::new(None, stub_evidence());
        let summary = analyzer.analyze_url("http://example.com").await;
        assert!(summary.starts_with("Summary (fallback) — Reuters:"));
    }

    #[tokio::test]
    async fn test_result_is_non_empty_even_without_hits() {
        let analyzer = PageSummaryAnalyzer::new(None, Arc::new(StubEvidence { hits: Vec::new() }));
        let summary = analyzer.analyze_url("http://nowhere.example").await;
        assert!(!summary.is_empty());
        assert!(summary.contains("no corroborating sources"));
    }
}
