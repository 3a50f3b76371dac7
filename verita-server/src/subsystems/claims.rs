//! Claim extraction — turns free text into discrete checkable assertions.
//!
//! The default path is a pure heuristic: sentence split, then a keyword
//! gate for factual-assertion markers. An optional remote extraction hook
//! can be plugged in; any failure there falls back transparently to the
//! heuristic, so callers never observe the delegation failing.

use std::sync::Arc;

use async_trait::async_trait;
use verita_core::models::ClaimUnit;

/// Sentences at or below this length never qualify as claims.
const MIN_CLAIM_LEN: usize = 10;

/// Reporting verbs, copulas, and modal-conditional markers that flag a
/// sentence as a checkable assertion.
const ASSERTION_KEYWORDS: &[&str] = &[
    "says", "said", "claims", "claimed", "announced", "announces", "reported", "reports",
    "alleges", "alleged", "states", "stated", "is", "are", "was", "were", "will", "would",
    "has", "have", "banned", "confirmed",
];

/// Optional external text-completion hook for smarter extraction.
#[async_trait]
pub trait RemoteClaimExtraction: Send + Sync {
    async fn extract(&self, text: &str) -> anyhow::Result<Vec<String>>;
}

pub struct ClaimExtractor {
    remote: Option<Arc<dyn RemoteClaimExtraction>>,
}

impl ClaimExtractor {
    /// Pure heuristic extractor — deterministic, no I/O.
    pub fn heuristic() -> Self {
        Self { remote: None }
    }

    pub fn with_remote(remote: Arc<dyn RemoteClaimExtraction>) -> Self {
        Self {
            remote: Some(remote),
        }
    }

    pub async fn extract_claims(&self, text: &str) -> Vec<ClaimUnit> {
        if let Some(remote) = &self.remote {
            match remote.extract(text).await {
                Ok(claims) if !claims.is_empty() => {
                    return claims.into_iter().map(ClaimUnit::new).collect();
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "remote claim extraction failed, using heuristic");
                }
            }
        }

        extract_claims_heuristic(text)
    }
}

/// Heuristic extraction. Never returns empty for non-empty input: when no
/// sentence passes the keyword gate, the first one or two sentences are
/// returned verbatim.
pub fn extract_claims_heuristic(text: &str) -> Vec<ClaimUnit> {
    let sentences = split_sentences(text);
    if sentences.is_empty() {
        return Vec::new();
    }

    let claims: Vec<ClaimUnit> = sentences
        .iter()
        .filter(|s| looks_like_claim(s))
        .map(|s| ClaimUnit::new(s.clone()))
        .collect();

    if claims.is_empty() {
        return sentences
            .into_iter()
            .take(2)
            .map(ClaimUnit::new)
            .collect();
    }

    claims
}

fn looks_like_claim(sentence: &str) -> bool {
    if sentence.len() <= MIN_CLAIM_LEN {
        return false;
    }

    let lowered = sentence.to_lowercase();
    if lowered.contains("according to") {
        return true;
    }

    lowered
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| ASSERTION_KEYWORDS.contains(&word))
}

/// Split on sentence-ending punctuation, keeping the terminator attached.
fn split_sentences(text: &str) -> Vec<String> {
    let flattened = text.replace('\n', " ");
    let mut sentences = Vec::new();
    let mut current = String::new();

    for c in flattened.chars() {
        current.push(c);
        if matches!(c, '.' | '!' | '?' | ';') {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        }
    }

    let tail = current.trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }

    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_sentences_become_claims() {
        let claims = extract_claims_heuristic(
            "The minister announced a new tax. What a day! Blue sky here.",
        );
        // Only the sentence with a reporting verb survives the gate.
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].text, "The minister announced a new tax.");
    }

    #[test]
    fn test_short_sentences_are_skipped() {
        // "It is.." passes the keyword gate but not the length gate.
        let claims = extract_claims_heuristic("It is. The vaccine was approved in 2021.");
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].text, "The vaccine was approved in 2021.");
    }

    #[test]
    fn test_fallback_returns_first_two_sentences() {
        let claims = extract_claims_heuristic("Hello there friend. Nice weather today. More talk.");
        assert_eq!(claims.len(), 2);
        assert_eq!(claims[0].text, "Hello there friend.");
        assert_eq!(claims[1].text, "Nice weather today.");
    }

    #[test]
    fn test_non_empty_input_never_yields_empty() {
        for text in ["x", "ok", "short one here", "a. b. c."] {
            assert!(
                !extract_claims_heuristic(text).is_empty(),
                "no claims for {:?}",
                text
            );
        }
    }

    #[test]
    fn test_empty_input_yields_empty() {
        assert!(extract_claims_heuristic("").is_empty());
        assert!(extract_claims_heuristic("   ").is_empty());
    }

    #[test]
    fn test_keyword_matches_whole_words_only() {
        // "this" contains "is" as a substring but is not an assertion.
        let claims = extract_claims_heuristic("Regarding this matter, nothing further.");
        // Falls back: the only sentence has no whole-word keyword.
        assert_eq!(claims.len(), 1);
    }

    #[test]
    fn test_according_to_marks_a_claim() {
        let claims = extract_claims_heuristic("According to the report, crime fell by half.");
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].text, "According to the report, crime fell by half.");
    }

    #[test]
    fn test_deterministic() {
        let text = "The senator said GDP doubled. Unrelated chatter here.";
        assert_eq!(extract_claims_heuristic(text), extract_claims_heuristic(text));
    }

    struct FailingRemote;

    #[async_trait]
    impl RemoteClaimExtraction for FailingRemote {
        async fn extract(&self, _text: &str) -> anyhow::Result<Vec<String>> {
            anyhow::bail!("remote unavailable")
        }
    }

    #[tokio::test]
    async fn test_remote_failure_falls_back_to_heuristic() {
        let extractor = ClaimExtractor::with_remote(Arc::new(FailingRemote));
        let claims = extractor
            .extract_claims("The senator said GDP doubled.")
            .await;
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].text, "The senator said GDP doubled.");
    }

    struct FixedRemote;

    #[async_trait]
    impl RemoteClaimExtraction for FixedRemote {
        async fn extract(&self, _text: &str) -> anyhow::Result<Vec<String>> {
            Ok(vec!["GDP doubled last year.".to_string()])
        }
    }

    #[tokio::test]
    async fn test_remote_claims_win_when_available() {
        let extractor = ClaimExtractor::with_remote(Arc::new(FixedRemote));
        let claims = extractor.extract_claims("anything").await;
        assert_eq!(claims, vec![ClaimUnit::new("GDP doubled last year.")]);
    }
}
