//! In-memory [`RecordStore`] implementation for tests.
//!
//! `HashMap`s behind `std::sync::RwLock`; listing order is reconstructed
//! from `created_at`. Mirrors the Postgres implementation's terminal-state
//! guard so state-machine tests exercise the same semantics.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::models::{FactCheckRecord, FactCheckStatus, MediaAsset};

use super::{NewMediaAsset, RecordStore, StatusCounts, StoreError};

#[derive(Default)]
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<Uuid, FactCheckRecord>>,
    assets: RwLock<HashMap<Uuid, MediaAsset>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
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

        self.records
            .write()
            .expect("record lock poisoned")
            .insert(record.id, record.clone());

        Ok(record)
    }

    async fn complete_record(&self, id: Uuid, response: &str) -> Result<bool, StoreError> {
        let mut records = self.records.write().expect("record lock poisoned");
        match records.get_mut(&id) {
            Some(record) if !record.status.is_terminal() => {
                record.response = Some(response.to_string());
                record.status = FactCheckStatus::Completed;
                record.updated_at = Utc::now();
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(StoreError::RecordMissing(id)),
        }
    }

    async fn fail_record(&self, id: Uuid, response: Option<&str>) -> Result<bool, StoreError> {
        let mut records = self.records.write().expect("record lock poisoned");
        match records.get_mut(&id) {
            Some(record) if !record.status.is_terminal() => {
                if let Some(text) = response {
                    record.response = Some(text.to_string());
                }
                record.status = FactCheckStatus::Failed;
                record.updated_at = Utc::now();
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(StoreError::RecordMissing(id)),
        }
    }

    async fn find_record(&self, id: Uuid) -> Result<Option<FactCheckRecord>, StoreError> {
        let records = self.records.read().expect("record lock poisoned");
        Ok(records.get(&id).cloned())
    }

    async fn list_records(&self) -> Result<Vec<FactCheckRecord>, StoreError> {
        let records = self.records.read().expect("record lock poisoned");
        let mut all: Vec<FactCheckRecord> = records.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn count_by_status(&self) -> Result<StatusCounts, StoreError> {
        let records = self.records.read().expect("record lock poisoned");
        let mut counts = StatusCounts::default();
        for record in records.values() {
            counts.total += 1;
            match record.status {
                FactCheckStatus::Pending => counts.pending += 1,
                FactCheckStatus::Completed => counts.completed += 1,
                FactCheckStatus::Failed => counts.failed += 1,
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

        self.assets
            .write()
            .expect("asset lock poisoned")
            .insert(row.id, row.clone());

        Ok(row)
    }

    async fn set_media_description(&self, id: Uuid, description: &str) -> Result<(), StoreError> {
        let mut assets = self.assets.write().expect("asset lock poisoned");
        match assets.get_mut(&id) {
            Some(asset) => {
                asset.description = Some(description.to_string());
                Ok(())
            }
            None => Err(StoreError::RecordMissing(id)),
        }
    }
}
