use thiserror::Error;
use uuid::Uuid;

use crate::gateway::GatewayError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum VeritaError {
    #[error("fact-check {0} not found")]
    NotFound(Uuid),

    #[error("query cannot be empty")]
    EmptyQuery,

    #[error("media upload failed: {0}")]
    MediaUpload(String),

    #[error("stored media is not reachable at {0}")]
    MediaUnreachable(String),

    #[error("verification failed: {0}")]
    VerificationFailed(#[from] GatewayError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl VeritaError {
    /// Whether the caller can reasonably retry the request as-is.
    pub fn is_retryable(&self) -> bool {
        match self {
            VeritaError::VerificationFailed(g) => g.is_retryable(),
            VeritaError::MediaUpload(_) | VeritaError::MediaUnreachable(_) => true,
            _ => false,
        }
    }
}
