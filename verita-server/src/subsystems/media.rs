//! Media analysis — durable upload plus a short factual description.
//!
//! Flow: blob upload → public reachability check → asset row → external
//! description call → description update. The two-phase write means the
//! asset exists even when the description call fails; in that case a
//! degraded but non-empty description is substituted so verification can
//! proceed on partial information.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;
use verita_core::blob::BlobStore;
use verita_core::models::MediaKind;
use verita_core::store::{NewMediaAsset, RecordStore};
use verita_core::vision::{VisionClient, VisionError};
use verita_core::VeritaError;

/// Degraded description used when the external analysis call fails.
pub const ANALYSIS_FAILED_DESCRIPTION: &str =
    "analysis failed, content requires manual review";

/// An uploaded file as handed over by the transport layer.
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub bytes: Bytes,
    pub mime_type: String,
    pub original_name: String,
}

/// File-size based synthetic-media suspicion. A placeholder heuristic, not
/// a detector: tiny payloads for their media type are treated as suspect.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SyntheticSuspicion {
    pub score: f32,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaAnalysis {
    pub media_type: MediaKind,
    pub description: String,
    pub suspicion: SyntheticSuspicion,
    pub asset_id: Uuid,
}

#[async_trait]
pub trait MediaAnalyzer: Send + Sync {
    async fn analyze(&self, upload: &MediaUpload) -> Result<MediaAnalysis, VeritaError>;
}

pub struct BlobMediaAnalyzer {
    blob: Arc<dyn BlobStore>,
    store: Arc<dyn RecordStore>,
    vision: VisionClient,
}

impl BlobMediaAnalyzer {
    pub fn new(blob: Arc<dyn BlobStore>, store: Arc<dyn RecordStore>, vision: VisionClient) -> Self {
        Self { blob, store, vision }
    }
}

#[async_trait]
impl MediaAnalyzer for BlobMediaAnalyzer {
    async fn analyze(&self, upload: &MediaUpload) -> Result<MediaAnalysis, VeritaError> {
        let media_type = MediaKind::from_mime(&upload.mime_type);
        let object_name = format!("{}-{}", Uuid::new_v4(), sanitize_name(&upload.original_name));

        let storage_path = self
            .blob
            .upload(&object_name, &upload.mime_type, upload.bytes.clone())
            .await
            .map_err(|e| VeritaError::MediaUpload(e.to_string()))?;

        // Verify the stored asset is actually fetchable before analyzing it;
        // a broken upload must surface here, not as a bogus description.
        let reachable = self
            .blob
            .exists(&storage_path)
            .await
            .unwrap_or(false);
        if !reachable {
            return Err(VeritaError::MediaUnreachable(storage_path));
        }

        let asset = self
            .store
            .create_media_asset(NewMediaAsset {
                filename: upload.original_name.clone(),
                storage_path,
                mime_type: upload.mime_type.clone(),
                size_bytes: upload.bytes.len() as i64,
            })
            .await?;

        let description = match self.vision.describe(&upload.mime_type, &upload.bytes).await {
            Ok(text) => text,
            Err(VisionError::MissingApiKey) => {
                format!(
                    "{} file, {} bytes — no vision service configured, content requires manual review",
                    upload.mime_type,
                    upload.bytes.len()
                )
            }
            Err(e) => {
                tracing::warn!(asset_id = %asset.id, error = %e, "media description failed, using degraded description");
                ANALYSIS_FAILED_DESCRIPTION.to_string()
            }
        };

        if let Err(e) = self.store.set_media_description(asset.id, &description).await {
            tracing::warn!(asset_id = %asset.id, error = %e, "failed to persist media description");
        }

        Ok(MediaAnalysis {
            media_type,
            description,
            suspicion: suspicion_heuristic(media_type, upload.bytes.len() as i64),
            asset_id: asset.id,
        })
    }
}

/// The documented placeholder heuristic: a tiny file for its media type
/// raises the suspicion score.
pub fn suspicion_heuristic(media_type: MediaKind, size_bytes: i64) -> SyntheticSuspicion {
    let mut score: f32 = 0.05;
    let mut reasons = Vec::new();

    match media_type {
        MediaKind::Image if size_bytes < 10_000 => {
            score += 0.15;
            reasons.push("very small image file".to_string());
        }
        MediaKind::Video if size_bytes < 50_000 => {
            score += 0.2;
            reasons.push("very small video file".to_string());
        }
        _ => {}
    }

    reasons.push(
        "limited automated check — a dedicated detection service is required for a reliable verdict"
            .to_string(),
    );

    SyntheticSuspicion {
        score: score.min(1.0),
        reasons,
    }
}

fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use verita_core::blob::HttpBlobStore;
    use verita_core::config::{BlobConfig, VisionConfig};
    use verita_core::store::InMemoryRecordStore;
    use wiremock::matchers::{method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn upload(mime: &str, size: usize) -> MediaUpload {
        MediaUpload {
            bytes: Bytes::from(vec![0u8; size]),
            mime_type: mime.to_string(),
            original_name: "clip one.mp4".to_string(),
        }
    }

    fn vision_client(server: &MockServer, key: &str) -> VisionClient {
        let config = VisionConfig {
            base_url: String::new(),
            model: "gemini-1.5-flash".to_string(),
            timeout_seconds: 5,
        };
        VisionClient::with_base_url(&config, key.to_string(), server.uri()).unwrap()
    }

    fn blob_store(server: &MockServer) -> Arc<dyn BlobStore> {
        let config = BlobConfig {
            base_url: String::new(),
            bucket: "media".to_string(),
            timeout_seconds: 5,
        };
        Arc::new(HttpBlobStore::with_base_url(&config, "k".to_string(), server.uri()).unwrap())
    }

    async fn mount_blob_ok(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path_regex(r"^/object/media/.*"))
            .respond_with(ResponseTemplate::new(200))
            .mount(server)
            .await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_analyze_uploads_then_describes() {
        let server = MockServer::start().await;
        mount_blob_ok(&server).await;
        Mock::given(method("POST"))
            .and(path_regex(r":generateContent$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [ { "content": { "parts": [ { "text": "A dog rides a bicycle." } ] } } ]
            })))
            .mount(&server)
            .await;

        let store = Arc::new(InMemoryRecordStore::new());
        let analyzer =
            BlobMediaAnalyzer::new(blob_store(&server), store.clone(), vision_client(&server, "k"));

        let analysis = analyzer.analyze(&upload("video/mp4", 100_000)).await.unwrap();
        assert_eq!(analysis.media_type, MediaKind::Video);
        assert_eq!(analysis.description, "A dog rides a bicycle.");
        assert!(analysis.suspicion.score < 0.1);
    }

    #[tokio::test]
    async fn test_analyze_degrades_on_vision_failure() {
        let server = MockServer::start().await;
        mount_blob_ok(&server).await;
        Mock::given(method("POST"))
            .and(path_regex(r":generateContent$"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let store = Arc::new(InMemoryRecordStore::new());
        let analyzer =
            BlobMediaAnalyzer::new(blob_store(&server), store, vision_client(&server, "k"));

        let analysis = analyzer.analyze(&upload("image/png", 50_000)).await.unwrap();
        assert_eq!(analysis.description, ANALYSIS_FAILED_DESCRIPTION);
    }

    #[tokio::test]
    async fn test_analyze_fails_when_upload_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/object/media/.*"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let store = Arc::new(InMemoryRecordStore::new());
        let analyzer =
            BlobMediaAnalyzer::new(blob_store(&server), store, vision_client(&server, "k"));

        let err = analyzer.analyze(&upload("image/png", 100)).await.unwrap_err();
        assert!(matches!(err, VeritaError::MediaUpload(_)));
    }

    #[tokio::test]
    async fn test_analyze_fails_when_stored_asset_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/object/media/.*"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let store = Arc::new(InMemoryRecordStore::new());
        let analyzer =
            BlobMediaAnalyzer::new(blob_store(&server), store, vision_client(&server, "k"));

        let err = analyzer.analyze(&upload("image/png", 100)).await.unwrap_err();
        assert!(matches!(err, VeritaError::MediaUnreachable(_)));
    }

    #[test]
    fn test_suspicion_heuristic_flags_tiny_files() {
        let tiny_image = suspicion_heuristic(MediaKind::Image, 5_000);
        assert!((tiny_image.score - 0.2).abs() < f32::EPSILON);
        assert!(tiny_image.reasons.iter().any(|r| r.contains("small image")));

        let tiny_video = suspicion_heuristic(MediaKind::Video, 20_000);
        assert!((tiny_video.score - 0.25).abs() < f32::EPSILON);

        let normal = suspicion_heuristic(MediaKind::Audio, 5_000_000);
        assert!((normal.score - 0.05).abs() < f32::EPSILON);
        assert_eq!(normal.reasons.len(), 1);
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("clip one.mp4"), "clip_one.mp4");
        assert_eq!(sanitize_name("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_name(""), "upload");
    }
}
