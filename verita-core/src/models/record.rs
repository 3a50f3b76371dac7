use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a fact-check request. A record is created `Pending` and
/// transitions exactly once, to `Completed` or `Failed`; terminal states
/// never change afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactCheckStatus {
    Pending,
    Completed,
    Failed,
}

impl FactCheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactCheckStatus::Pending => "pending",
            FactCheckStatus::Completed => "completed",
            FactCheckStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, FactCheckStatus::Pending)
    }
}

impl std::str::FromStr for FactCheckStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(FactCheckStatus::Pending),
            "completed" => Ok(FactCheckStatus::Completed),
            "failed" => Ok(FactCheckStatus::Failed),
            other => Err(format!("unknown fact-check status: {}", other)),
        }
    }
}

impl std::fmt::Display for FactCheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One persisted verification request and its outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactCheckRecord {
    pub id: Uuid,
    pub requester_id: String,
    pub query: String,
    pub response: Option<String>,
    pub status: FactCheckStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
