//! Postgres-backed [`RecordStore`].
//!
//! Expected schema:
//!
//! ```sql
//! CREATE TABLE fact_checks (
//!     id            UUID PRIMARY KEY,
//!     requester_id  TEXT NOT NULL,
//!     query         TEXT NOT NULL,
//!     response      TEXT,
//!     status        TEXT NOT NULL DEFAULT 'pending',
//!     created_at    TIMESTAMPTZ NOT NULL,
//!     updated_at    TIMESTAMPTZ NOT NULL
//! );
//!
//! CREATE TABLE media_assets (
//!     id            UUID PRIMARY KEY,
//!     filename      TEXT NOT NULL,
//!     storage_path  TEXT NOT NULL,
//!     mime_type     TEXT NOT NULL,
//!     size_bytes    BIGINT NOT NULL,
//!     description   TEXT,
//!     created_at    TIMESTAMPTZ NOT NULL
//! );
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{FactCheckRecord, FactCheckStatus, MediaAsset};

use super::{NewMediaAsset, RecordStore, StatusCounts, StoreError};

#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct RecordRow {
    id: Uuid,
    requester_id: String,
    query: String,
    response: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RecordRow> for FactCheckRecord {
    fn from(row: RecordRow) -> Self {
        let status = row
            .status
            .parse::<FactCheckStatus>()
            .unwrap_or(FactCheckStatus::Failed);
        FactCheckRecord {
            id: row.id,
            requester_id: row.requester_id,
            query: row.query,
            response: row.response,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AssetRow {
    id: Uuid,
    filename: String,
    storage_path: String,
    mime_type: String,
    size_bytes: i64,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<AssetRow> for MediaAsset {
    fn from(row: AssetRow) -> Self {
        MediaAsset {
            id: row.id,
            filename: row.filename,
            storage_path: row.storage_path,
            mime_type: row.mime_type,
            size_bytes: row.size_bytes,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn create_record(
        &self,
        requester_id: &str,
        query: &str,
    ) -> Result<FactCheckRecord, StoreError> {
        let record = FactCheckRecord {
            id: Uuid::new_v4(),
            requester_id: requester_id.to_string(),
            query: query.to_string(),
            response: None,
            status: FactCheckStatus::Pending,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO fact_checks (id, requester_id, query, response, status, created_at, updated_at)
             VALUES ($1, $2, $3, NULL, $4, $5, $6)",
        )
        .bind(record.id)
        .bind(&record.requester_id)
        .bind(&record.query)
        .bind(record.status.as_str())
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(record)
    }

    async fn complete_record(&self, id: Uuid, response: &str) -> Result<bool, StoreError> {
        // The status guard keeps terminal records immutable.
        let result = sqlx::query(
            "UPDATE fact_checks
             SET response = $2, status = 'completed', updated_at = $3
             WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .bind(response)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn fail_record(&self, id: Uuid, response: Option<&str>) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE fact_checks
             SET response = COALESCE($2, response), status = 'failed', updated_at = $3
             WHERE id = $1 AND status = 'pending'",
        )
        .bind(id)
        .bind(response)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_record(&self, id: Uuid) -> Result<Option<FactCheckRecord>, StoreError> {
        let row: Option<RecordRow> = sqlx::query_as(
            "SELECT id, requester_id, query, response, status, created_at, updated_at
             FROM fact_checks WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(FactCheckRecord::from))
    }

    async fn list_records(&self) -> Result<Vec<FactCheckRecord>, StoreError> {
        let rows: Vec<RecordRow> = sqlx::query_as(
            "SELECT id, requester_id, query, response, status, created_at, updated_at
             FROM fact_checks ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(FactCheckRecord::from).collect())
    }

    async fn count_by_status(&self) -> Result<StatusCounts, StoreError> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM fact_checks GROUP BY status")
                .fetch_all(&self.pool)
                .await?;

        let mut counts = StatusCounts::default();
        for (status, n) in rows {
            counts.total += n;
            match status.as_str() {
                "pending" => counts.pending = n,
                "completed" => counts.completed = n,
                "failed" => counts.failed = n,
                _ => {}
            }
        }

        Ok(counts)
    }

    async fn create_media_asset(&self, asset: NewMediaAsset) -> Result<MediaAsset, StoreError> {
        let row = MediaAsset {
            id: Uuid::new_v4(),
            filename: asset.filename,
            storage_path: asset.storage_path,
            mime_type: asset.mime_type,
            size_bytes: asset.size_bytes,
            description: None,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO media_assets (id, filename, storage_path, mime_type, size_bytes, description, created_at)
             VALUES ($1, $2, $3, $4, $5, NULL, $6)",
        )
        .bind(row.id)
        .bind(&row.filename)
        .bind(&row.storage_path)
        .bind(&row.mime_type)
        .bind(row.size_bytes)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;

        Ok(row)
    }

    async fn set_media_description(&self, id: Uuid, description: &str) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE media_assets SET description = $2 WHERE id = $1")
            .bind(id)
            .bind(description)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::RecordMissing(id));
        }

        Ok(())
    }
}
