use serde::{Deserialize, Serialize};

/// A single checkable assertion extracted from a longer text. Ephemeral —
/// consumed by evidence search, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimUnit {
    pub text: String,
}

impl ClaimUnit {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// One piece of retrieved external material supporting or undermining a
/// claim. `score` is a 0.0–1.0 source-type confidence, not a ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceHit {
    pub source: String,
    pub title: String,
    pub url: Option<String>,
    pub snippet: String,
    pub score: f32,
}
