//! Fact-check orchestration — the top-level coordinator.
//!
//! Drives the enrichment components and the verification gateway in order,
//! owns the per-request record lifecycle (Pending → Completed/Failed), and
//! exposes blocking, streaming, media-augmented, and evidence-based
//! auto-verification entry points.
//!
//! Collaborators are constructor-injected trait objects; the orchestrator
//! holds no mutable state of its own and handles requests fully in
//! parallel. Each record is only ever written by the request that owns it.

use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;
use regex::Regex;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;
use verita_core::gateway::{GatewayError, VerificationGateway};
use verita_core::models::{FactCheckRecord, FactCheckStatus};
use verita_core::store::{RecordStore, StatusCounts};
use verita_core::{EvidenceHit, VeritaError};

use super::claims::ClaimExtractor;
use super::evidence::EvidenceSearch;
use super::media::{MediaAnalysis, MediaAnalyzer, MediaUpload};
use super::url::UrlAnalyzer;

/// Behavioral preamble prepended to every query sent to the gateway. It
/// pins the answer style so downstream output can be relayed verbatim.
pub const INSTRUCTION_PREAMBLE: &str = "Answer directly and factually. State the verdict first, \
then the key evidence. Do not add greetings, disclaimers, or commentary about the verification \
process.";

/// Any hit at or above this score makes a claim "likely true".
const SCORE_LIKELY_TRUE: f32 = 0.7;
/// Failing that, any hit at or above this score makes it "likely false".
const SCORE_LIKELY_FALSE: f32 = 0.5;

const EVIDENCE_PER_CLAIM: usize = 4;
const STREAM_CHANNEL_CAPACITY: usize = 32;

// ============================================================================
// Result types
// ============================================================================

#[derive(Debug, Clone)]
pub struct VerifyOutcome {
    pub record_id: Uuid,
    pub result: String,
}

/// Coarse evidence-based label for a single claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    LikelyTrue,
    LikelyFalse,
    Insufficient,
}

impl Verdict {
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::LikelyTrue => "likely true",
            Verdict::LikelyFalse => "likely false",
            Verdict::Insufficient => "insufficient evidence",
        }
    }

    pub fn from_hits(hits: &[EvidenceHit]) -> Self {
        if hits.iter().any(|h| h.score >= SCORE_LIKELY_TRUE) {
            Verdict::LikelyTrue
        } else if hits.iter().any(|h| h.score >= SCORE_LIKELY_FALSE) {
            Verdict::LikelyFalse
        } else {
            Verdict::Insufficient
        }
    }
}

impl Serialize for Verdict {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimReport {
    pub claim: String,
    pub verdict: Verdict,
    pub evidence: Vec<EvidenceHit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_analysis: Option<MediaAnalysis>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoVerifyOutcome {
    pub status: FactCheckStatus,
    pub message: String,
    pub report: Vec<ClaimReport>,
}

/// A live verification stream and the record it feeds. The stream is
/// consumable exactly once; by the time it yields its final item the
/// record's terminal state is already persisted.
#[derive(Debug)]
pub struct StreamHandle {
    pub record_id: Uuid,
    pub stream: ReceiverStream<Result<Bytes, GatewayError>>,
}

enum StreamOutcome {
    Completed,
    Cancelled,
    Upstream(GatewayError),
}

// ============================================================================
// FactCheckOrchestrator
// ============================================================================

pub struct FactCheckOrchestrator {
    store: Arc<dyn RecordStore>,
    gateway: Arc<dyn VerificationGateway>,
    evidence: Arc<dyn EvidenceSearch>,
    media: Arc<dyn MediaAnalyzer>,
    urls: Arc<dyn UrlAnalyzer>,
    claims: ClaimExtractor,
}

impl FactCheckOrchestrator {
    pub fn new(
        store: Arc<dyn RecordStore>,
        gateway: Arc<dyn VerificationGateway>,
        evidence: Arc<dyn EvidenceSearch>,
        media: Arc<dyn MediaAnalyzer>,
        urls: Arc<dyn UrlAnalyzer>,
        claims: ClaimExtractor,
    ) -> Self {
        Self {
            store,
            gateway,
            evidence,
            media,
            urls,
            claims,
        }
    }

    /// Baseline single-shot path: record → gateway → terminal state.
    pub async fn verify_external(
        &self,
        requester_id: &str,
        query: &str,
    ) -> Result<VerifyOutcome, VeritaError> {
        let record = self.store.create_record(requester_id, query).await?;
        tracing::info!(id = %record.id, requester = %requester_id, "verifying claim");

        match self.gateway.verify(requester_id, query).await {
            Ok(result) => {
                if let Err(e) = self.store.complete_record(record.id, &result).await {
                    self.mark_failed(record.id, Some("Error: failed to persist verification result"))
                        .await;
                    return Err(e.into());
                }
                Ok(VerifyOutcome {
                    record_id: record.id,
                    result,
                })
            }
            Err(e) => {
                self.mark_failed(record.id, Some(&format!("Error: {}", e))).await;
                tracing::error!(id = %record.id, reason = e.reason(), error = %e, "verification failed");
                Err(VeritaError::VerificationFailed(e))
            }
        }
    }

    /// Streaming path: bytes are relayed to the caller as they arrive while
    /// the full text accumulates for persistence. The terminal store write
    /// lands before the returned stream closes (or before its error item),
    /// so a caller that drained the stream always reads a settled record.
    pub async fn verify_stream(
        &self,
        requester_id: &str,
        query: &str,
    ) -> Result<StreamHandle, VeritaError> {
        let record = self.store.create_record(requester_id, query).await?;
        tracing::info!(id = %record.id, requester = %requester_id, "opening verification stream");

        let mut upstream = match self.gateway.verify_streaming(requester_id, query).await {
            Ok(stream) => stream,
            Err(e) => {
                self.mark_failed(record.id, Some(&format!("Error: {}", e))).await;
                return Err(VeritaError::VerificationFailed(e));
            }
        };

        let (tx, rx) = mpsc::channel::<Result<Bytes, GatewayError>>(STREAM_CHANNEL_CAPACITY);
        let store = Arc::clone(&self.store);
        let record_id = record.id;

        tokio::spawn(async move {
            let mut accumulated = String::new();
            let mut outcome = StreamOutcome::Completed;

            while let Some(item) = upstream.next().await {
                match item {
                    Ok(chunk) => {
                        accumulated.push_str(&String::from_utf8_lossy(&chunk));
                        if tx.send(Ok(chunk)).await.is_err() {
                            // Receiver gone: the caller disconnected.
                            outcome = StreamOutcome::Cancelled;
                            break;
                        }
                    }
                    Err(e) => {
                        outcome = StreamOutcome::Upstream(e);
                        break;
                    }
                }
            }
            drop(upstream);

            let partial = (!accumulated.is_empty()).then_some(accumulated.as_str());

            match outcome {
                StreamOutcome::Completed => {
                    match store.complete_record(record_id, &accumulated).await {
                        Ok(true) => {
                            tracing::info!(id = %record_id, bytes = accumulated.len(), "stream completed");
                        }
                        Ok(false) => {
                            tracing::warn!(id = %record_id, "stream completed but record already terminal");
                        }
                        Err(e) => {
                            tracing::error!(id = %record_id, error = %e, "failed to persist streamed result");
                        }
                    }
                    // tx drops here, closing the caller's stream after the
                    // record has settled.
                }
                StreamOutcome::Cancelled => {
                    tracing::warn!(id = %record_id, "client disconnected mid-stream, aborting upstream");
                    if let Err(e) = store.fail_record(record_id, partial).await {
                        tracing::error!(id = %record_id, error = %e, "failed to mark cancelled stream as failed");
                    }
                }
                StreamOutcome::Upstream(e) => {
                    tracing::error!(id = %record_id, error = %e, "upstream stream error");
                    if let Err(se) = store.fail_record(record_id, partial).await {
                        tracing::error!(id = %record_id, error = %se, "failed to mark record as failed");
                    }
                    // Error event goes out only after the failure is
                    // persisted.
                    let _ = tx.send(Err(e)).await;
                }
            }
        });

        Ok(StreamHandle {
            record_id,
            stream: ReceiverStream::new(rx),
        })
    }

    /// Media/URL-augmented verification. Media analysis wins when a file is
    /// attached; otherwise the first embedded URL is summarized; otherwise
    /// the query passes through unchanged. Every branch prepends the fixed
    /// instruction preamble and delegates to [`verify_external`].
    ///
    /// [`verify_external`]: Self::verify_external
    pub async fn verify_with_media(
        &self,
        requester_id: &str,
        query: &str,
        media: Option<MediaUpload>,
    ) -> Result<VerifyOutcome, VeritaError> {
        let augmented = self.augment_query(query, media).await?;
        self.verify_external(requester_id, &augmented).await
    }

    async fn augment_query(
        &self,
        query: &str,
        media: Option<MediaUpload>,
    ) -> Result<String, VeritaError> {
        if let Some(upload) = media {
            let analysis = self.media.analyze(&upload).await?;
            let body = if query.trim().is_empty() {
                format!(
                    "{} ANALYSIS: {}",
                    analysis.media_type.heading(),
                    analysis.description
                )
            } else {
                format!(
                    "{} ANALYSIS: {}\n\nORIGINAL QUERY: {}",
                    analysis.media_type.heading(),
                    analysis.description,
                    query
                )
            };
            return Ok(with_preamble(&body));
        }

        if let Some(url) = first_url(query) {
            let summary = self.urls.analyze_url(&url).await;
            return Ok(with_preamble(&format!(
                "URL ANALYSIS: {}\n\nORIGINAL QUERY: {}",
                summary, query
            )));
        }

        Ok(with_preamble(query))
    }

    /// Self-contained evidence-based verdict over extracted claims. Never
    /// calls the verification gateway.
    pub async fn auto_verify(
        &self,
        raw_text: &str,
        media: Option<MediaUpload>,
    ) -> Result<AutoVerifyOutcome, VeritaError> {
        let record = self
            .store
            .create_record("system", &format!("auto_verify:{}", raw_text))
            .await?;
        tracing::info!(id = %record.id, "auto-verifying content");

        let claims = self.claims.extract_claims(raw_text).await;

        let media_analysis = match media {
            Some(upload) => match self.media.analyze(&upload).await {
                Ok(analysis) => Some(analysis),
                Err(e) => {
                    self.mark_failed(record.id, Some(&format!("Error: {}", e))).await;
                    return Err(e);
                }
            },
            None => None,
        };

        let mut report = Vec::with_capacity(claims.len());
        for claim in &claims {
            let hits = self.evidence.search(&claim.text, EVIDENCE_PER_CLAIM).await;
            report.push(ClaimReport {
                claim: claim.text.clone(),
                verdict: Verdict::from_hits(&hits),
                evidence: hits,
                media_analysis: media_analysis.clone(),
            });
        }

        let summary: Vec<String> = report
            .iter()
            .map(|entry| {
                let mut line = format!("• \"{}\" → {}", entry.claim, entry.verdict.label());
                if let Some(analysis) = &entry.media_analysis {
                    line.push_str(&format!(
                        " | media: {}, description: {}",
                        analysis.media_type, analysis.description
                    ));
                }
                line
            })
            .collect();
        let message = format!("Report:\n{}", summary.join("\n"));

        if let Err(e) = self.store.complete_record(record.id, &message).await {
            self.mark_failed(record.id, None).await;
            return Err(e.into());
        }

        Ok(AutoVerifyOutcome {
            status: FactCheckStatus::Completed,
            message,
            report,
        })
    }

    pub async fn find_all(&self) -> Result<Vec<FactCheckRecord>, VeritaError> {
        Ok(self.store.list_records().await?)
    }

    pub async fn find_one(&self, id: Uuid) -> Result<FactCheckRecord, VeritaError> {
        self.store
            .find_record(id)
            .await?
            .ok_or(VeritaError::NotFound(id))
    }

    pub async fn stats(&self) -> Result<StatusCounts, VeritaError> {
        Ok(self.store.count_by_status().await?)
    }

    /// Best-effort FAILED write: a failing write is logged, never surfaced,
    /// so the original error stays the one the caller sees.
    async fn mark_failed(&self, id: Uuid, summary: Option<&str>) {
        match self.store.fail_record(id, summary).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(id = %id, "record already terminal, failure not recorded");
            }
            Err(e) => {
                tracing::error!(id = %id, error = %e, "failed to mark record as failed");
            }
        }
    }
}

fn with_preamble(body: &str) -> String {
    format!("{}\n\n{}", INSTRUCTION_PREAMBLE, body)
}

/// First http(s) URL embedded in the text, with trailing punctuation
/// stripped. `None` when the text carries no URL.
pub fn first_url(text: &str) -> Option<String> {
    let re = Regex::new(r"https?://\S+").ok()?;
    let found = re.find(text)?;
    let trimmed = found
        .as_str()
        .trim_end_matches(|c| matches!(c, '.' | ',' | ')' | ']' | '"' | '\''));
    Some(trimmed.to_string())
}

// ============================================================================
// TESTS — pure pieces; orchestration flows live in tests/
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(score: f32) -> EvidenceHit {
        EvidenceHit {
            source: "Test".to_string(),
            title: "t".to_string(),
            url: None,
            snippet: String::new(),
            score,
        }
    }

    #[test]
    fn test_verdict_thresholds() {
        assert_eq!(Verdict::from_hits(&[hit(0.8)]), Verdict::LikelyTrue);
        assert_eq!(Verdict::from_hits(&[hit(0.55)]), Verdict::LikelyFalse);
        assert_eq!(Verdict::from_hits(&[hit(0.3)]), Verdict::Insufficient);
        assert_eq!(Verdict::from_hits(&[]), Verdict::Insufficient);
        // Boundary values land on the stronger label.
        assert_eq!(Verdict::from_hits(&[hit(0.7)]), Verdict::LikelyTrue);
        assert_eq!(Verdict::from_hits(&[hit(0.5)]), Verdict::LikelyFalse);
        // One strong hit wins regardless of weak company.
        assert_eq!(
            Verdict::from_hits(&[hit(0.1), hit(0.9), hit(0.2)]),
            Verdict::LikelyTrue
        );
    }

    #[test]
    fn test_verdict_serializes_as_label() {
        let json = serde_json::to_string(&Verdict::Insufficient).unwrap();
        assert_eq!(json, "\"insufficient evidence\"");
    }

    #[test]
    fn test_first_url_extraction() {
        assert_eq!(
            first_url("Check http://example.com/page for facts"),
            Some("http://example.com/page".to_string())
        );
        assert_eq!(
            first_url("see https://a.example/x, then more"),
            Some("https://a.example/x".to_string())
        );
        assert_eq!(first_url("plain claim, no url"), None);
        assert_eq!(first_url(""), None);
        // Only the first URL is analyzed.
        assert_eq!(
            first_url("http://first.example and http://second.example"),
            Some("http://first.example".to_string())
        );
    }

    #[test]
    fn test_preamble_prepended() {
        let out = with_preamble("BODY");
        assert!(out.starts_with(INSTRUCTION_PREAMBLE));
        assert!(out.ends_with("\n\nBODY"));
    }
}
