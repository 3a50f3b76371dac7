//! Durable blob storage for uploaded media.
//!
//! `BlobStore` is the minimal contract media analysis needs: upload a
//! payload and get back a public URL, plus a reachability probe used to
//! verify the stored asset is actually fetchable before analysis runs.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::config::BlobConfig;

#[derive(Error, Debug)]
pub enum BlobError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("storage API error ({code}): {message}")]
    Api { code: u16, message: String },
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload a payload under `name` and return its public URL.
    async fn upload(&self, name: &str, mime_type: &str, data: Bytes) -> Result<String, BlobError>;

    /// Whether the given public URL currently resolves.
    async fn exists(&self, url: &str) -> Result<bool, BlobError>;
}

/// Bucket-style HTTP object storage (Supabase-storage shaped API):
/// `POST {base}/object/{bucket}/{name}` uploads, objects are served from
/// `{base}/object/public/{bucket}/{name}`.
pub struct HttpBlobStore {
    client: reqwest::Client,
    base_url: String,
    bucket: String,
    api_key: String,
}

impl HttpBlobStore {
    pub fn new(config: &BlobConfig, api_key: String) -> Result<Self, BlobError> {
        Self::with_base_url(config, api_key, config.base_url.clone())
    }

    /// Create a store with a custom base URL (for testing / integration)
    pub fn with_base_url(
        config: &BlobConfig,
        api_key: String,
        base_url: String,
    ) -> Result<Self, BlobError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url,
            bucket: config.bucket.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn upload(&self, name: &str, mime_type: &str, data: Bytes) -> Result<String, BlobError> {
        let url = format!("{}/object/{}/{}", self.base_url, self.bucket, name);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("Content-Type", mime_type)
            .body(data)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::error!(code = status.as_u16(), message = %message, "blob upload failed");
            return Err(BlobError::Api {
                code: status.as_u16(),
                message,
            });
        }

        Ok(format!(
            "{}/object/public/{}/{}",
            self.base_url, self.bucket, name
        ))
    }

    async fn exists(&self, url: &str) -> Result<bool, BlobError> {
        let response = self.client.head(url).send().await?;
        Ok(response.status().is_success())
    }
}
