use config::{Config, ConfigError, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct VeritaConfig {
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub vision: VisionConfig,
    #[serde(default)]
    pub summarizer: SummarizerConfig,
    #[serde(default)]
    pub blob: BlobConfig,
    #[serde(default)]
    pub evidence: EvidenceConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.vera.app".to_string(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct VisionConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_seconds: u64,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-1.5-flash".to_string(),
            timeout_seconds: 8,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SummarizerConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_seconds: u64,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.perplexity.ai".to_string(),
            model: "sonar-pro".to_string(),
            timeout_seconds: 8,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BlobConfig {
    pub base_url: String,
    pub bucket: String,
    pub timeout_seconds: u64,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000/storage/v1".to_string(),
            bucket: "fact-check-media".to_string(),
            timeout_seconds: 8,
        }
    }
}

/// A structured feed to query for corroborating material.
#[derive(Debug, Deserialize, Clone)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
}

/// A search page scanned when structured feeds come up short. The URL must
/// contain a `{query}` placeholder that is substituted (percent-encoded).
#[derive(Debug, Deserialize, Clone)]
pub struct PageSource {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EvidenceConfig {
    pub feeds: Vec<FeedSource>,
    pub fallback_pages: Vec<PageSource>,
    pub fetch_timeout_seconds: u64,
}

impl Default for EvidenceConfig {
    fn default() -> Self {
        Self {
            feeds: vec![
                FeedSource {
                    name: "Reuters".to_string(),
                    url: "https://www.reutersagency.com/feed/?taxonomy=best-regions&post_type=best"
                        .to_string(),
                },
                FeedSource {
                    name: "Snopes".to_string(),
                    url: "https://www.snopes.com/feed/".to_string(),
                },
            ],
            fallback_pages: vec![PageSource {
                name: "Reuters".to_string(),
                url: "https://www.reuters.com/site-search/?query={query}".to_string(),
            }],
            fetch_timeout_seconds: 5,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MediaConfig {
    pub max_upload_bytes: usize,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 25 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8790,
        }
    }
}

impl VeritaConfig {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path))
            .build()?;
        s.try_deserialize()
    }
}

/// API credentials, read from the process environment once at startup.
/// A missing credential is logged immediately so the gap is visible at
/// boot rather than on the first request that needs it.
#[derive(Debug, Clone, Default)]
pub struct ApiCredentials {
    pub vera_api_key: String,
    pub gemini_api_key: String,
    pub perplexity_api_key: String,
    pub blob_api_key: String,
}

impl ApiCredentials {
    pub fn from_env() -> Self {
        let creds = Self {
            vera_api_key: std::env::var("VERA_API_KEY").unwrap_or_default(),
            gemini_api_key: std::env::var("GEMINI_API_KEY").unwrap_or_default(),
            perplexity_api_key: std::env::var("PERPLEXITY_API_KEY").unwrap_or_default(),
            blob_api_key: std::env::var("BLOB_API_KEY").unwrap_or_default(),
        };

        if creds.vera_api_key.is_empty() {
            tracing::warn!("VERA_API_KEY is not set — verification requests will be rejected upstream");
        }
        if creds.gemini_api_key.is_empty() {
            tracing::warn!("GEMINI_API_KEY is not set — media analysis will fall back to file metadata");
        }
        if creds.perplexity_api_key.is_empty() {
            tracing::warn!("PERPLEXITY_API_KEY is not set — URL analysis will fall back to evidence search");
        }
        if creds.blob_api_key.is_empty() {
            tracing::warn!("BLOB_API_KEY is not set — media uploads will fail");
        }

        creds
    }
}
