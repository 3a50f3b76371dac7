//! Durable record store for fact-check records and media assets.
//!
//! The orchestration pipeline only needs create/update/find semantics; the
//! engine behind them is interchangeable. [`PgRecordStore`] is the
//! production implementation, [`InMemoryRecordStore`] backs tests.
//!
//! State monotonicity is enforced here, not in callers: `complete_record`
//! and `fail_record` only apply to records still in `Pending` and report
//! whether a transition happened. A terminal record can never regress.

mod memory;
mod postgres;

pub use memory::InMemoryRecordStore;
pub use postgres::PgRecordStore;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{FactCheckRecord, MediaAsset};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("record {0} does not exist")]
    RecordMissing(Uuid),
}

/// Fields for a media asset row created before analysis runs.
#[derive(Debug, Clone)]
pub struct NewMediaAsset {
    pub filename: String,
    pub storage_path: String,
    pub mime_type: String,
    pub size_bytes: i64,
}

/// Aggregate record counts, newest-first listing's companion.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct StatusCounts {
    pub total: i64,
    pub pending: i64,
    pub completed: i64,
    pub failed: i64,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create a new record in `Pending` and return it.
    async fn create_record(
        &self,
        requester_id: &str,
        query: &str,
    ) -> Result<FactCheckRecord, StoreError>;

    /// Transition a pending record to `Completed` with its response.
    /// Returns `false` if the record was already terminal (no write).
    async fn complete_record(&self, id: Uuid, response: &str) -> Result<bool, StoreError>;

    /// Transition a pending record to `Failed`, optionally retaining any
    /// partial response for debuggability. Returns `false` if the record
    /// was already terminal (no write).
    async fn fail_record(&self, id: Uuid, response: Option<&str>) -> Result<bool, StoreError>;

    async fn find_record(&self, id: Uuid) -> Result<Option<FactCheckRecord>, StoreError>;

    /// All records, newest first.
    async fn list_records(&self) -> Result<Vec<FactCheckRecord>, StoreError>;

    async fn count_by_status(&self) -> Result<StatusCounts, StoreError>;

    async fn create_media_asset(&self, asset: NewMediaAsset) -> Result<MediaAsset, StoreError>;

    /// Fill in the description once external analysis settles.
    async fn set_media_description(&self, id: Uuid, description: &str) -> Result<(), StoreError>;
}
