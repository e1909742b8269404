//! Configuration for the ingestion trigger

use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Environment variable naming a TOML config file
pub const CONFIG_PATH_ENV: &str = "RAG_TRIGGER_CONFIG";

/// Environment variable overriding the listen port (Cloud Run convention)
pub const PORT_ENV: &str = "PORT";

/// Main trigger configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TriggerConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Storage relocation configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Managed corpus configuration
    #[serde(default)]
    pub corpus: CorpusConfig,
    /// Google Cloud configuration
    #[serde(default)]
    pub gcp: GcpConfig,
}

impl TriggerConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `RAG_TRIGGER_CONFIG` if set, otherwise defaults. `PORT` overrides the port.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.is_empty() => Self::from_file(path)?,
            _ => Self::default(),
        };

        if let Ok(port) = std::env::var(PORT_ENV) {
            config.server.port = port
                .parse()
                .map_err(|e| Error::Config(format!("Invalid {} '{}': {}", PORT_ENV, port, e)))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the managed service would refuse anyway
    pub fn validate(&self) -> Result<()> {
        if self.storage.processing_bucket.trim().is_empty() {
            return Err(Error::Config("storage.processing_bucket must not be empty".to_string()));
        }
        if self.corpus.display_name.trim().is_empty() {
            return Err(Error::Config("corpus.display_name must not be empty".to_string()));
        }
        if self.corpus.chunk_size == 0 {
            return Err(Error::Config("corpus.chunk_size must be positive".to_string()));
        }
        if self.corpus.chunk_overlap >= self.corpus.chunk_size {
            return Err(Error::Config(format!(
                "corpus.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.corpus.chunk_overlap, self.corpus.chunk_size
            )));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Where finalized objects are moved and how long to wait afterwards
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Destination bucket for relocated objects
    #[serde(default = "default_processing_bucket")]
    pub processing_bucket: String,
    /// Pause between the move and the import request, in milliseconds
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

impl StorageConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

fn default_processing_bucket() -> String {
    "pdlc-process-bucket".to_string()
}

fn default_settle_delay_ms() -> u64 {
    2000
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            processing_bucket: default_processing_bucket(),
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

/// Managed RAG corpus configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Display name used to find or create the corpus
    #[serde(default = "default_display_name")]
    pub display_name: String,
    /// Publisher model used for embeddings when the corpus is created
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    /// Chunk size in tokens
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,
    /// Overlap between chunks in tokens
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: u32,
    /// Embedding request rate cap for an import
    #[serde(default = "default_max_embedding_requests_per_min")]
    pub max_embedding_requests_per_min: u32,
    /// GCS object that receives per-file import results; an empty string disables it
    #[serde(
        default = "default_import_result_sink",
        deserialize_with = "empty_string_as_none"
    )]
    pub import_result_sink: Option<String>,
}

fn default_display_name() -> String {
    "pdlc-rag-corpus".to_string()
}

fn default_embedding_model() -> String {
    "publishers/google/models/text-embedding-005".to_string()
}

fn default_chunk_size() -> u32 {
    512
}

fn default_chunk_overlap() -> u32 {
    100
}

fn default_max_embedding_requests_per_min() -> u32 {
    1000
}

fn default_import_result_sink() -> Option<String> {
    Some("gs://pdlc-rag-results/rag_results.ndjson".to_string())
}

fn empty_string_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            display_name: default_display_name(),
            embedding_model: default_embedding_model(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            max_embedding_requests_per_min: default_max_embedding_requests_per_min(),
            import_result_sink: default_import_result_sink(),
        }
    }
}

/// Google Cloud Platform configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcpConfig {
    /// GCP project ID
    #[serde(default = "default_project_id")]
    pub project_id: String,
    /// GCP region (e.g., "us-central1")
    #[serde(default = "default_location")]
    pub location: String,
    /// Path to a service account JSON key; the metadata server is used when unset
    #[serde(default)]
    pub service_account_key_path: Option<PathBuf>,
    /// Interval between long-running operation polls
    #[serde(default = "default_poll_interval_ms")]
    pub operation_poll_interval_ms: u64,
    /// Maximum polls before an operation is reported as timed out
    #[serde(default = "default_poll_max_attempts")]
    pub operation_poll_max_attempts: u32,
}

impl GcpConfig {
    pub fn operation_poll_interval(&self) -> Duration {
        Duration::from_millis(self.operation_poll_interval_ms)
    }
}

fn default_project_id() -> String {
    "ramesh-ai-project-457712".to_string()
}

fn default_location() -> String {
    "us-central1".to_string()
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_poll_max_attempts() -> u32 {
    150
}

impl Default for GcpConfig {
    fn default() -> Self {
        Self {
            project_id: default_project_id(),
            location: default_location(),
            service_account_key_path: None,
            operation_poll_interval_ms: default_poll_interval_ms(),
            operation_poll_max_attempts: default_poll_max_attempts(),
        }
    }
}
