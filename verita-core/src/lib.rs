pub mod blob;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod models;
pub mod store;
pub mod summarize;
pub mod vision;

pub use config::{ApiCredentials, VeritaConfig};
pub use error::VeritaError;
pub use gateway::{GatewayError, VeraGatewayClient, VerdictStream, VerificationGateway};
pub use models::{ClaimUnit, EvidenceHit, FactCheckRecord, FactCheckStatus, MediaAsset, MediaKind};
pub use store::{InMemoryRecordStore, NewMediaAsset, PgRecordStore, RecordStore, StoreError};
