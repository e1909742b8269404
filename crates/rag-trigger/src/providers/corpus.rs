//! Managed RAG corpus provider trait
//!
//! Chunking, embedding and indexing all happen inside the managed service;
//! this trait only covers the three calls the trigger needs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A corpus as reported by the managed service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RagCorpus {
    /// Full resource name (`projects/.../ragCorpora/...`)
    pub name: String,
    pub display_name: String,
}

/// Parameters for importing files into a corpus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRequest {
    /// Resource name of the target corpus
    pub corpus_name: String,
    /// Source URIs, e.g. `gs://bucket/`
    pub paths: Vec<String>,
    pub chunk_size: u32,
    pub chunk_overlap: u32,
    pub max_embedding_requests_per_min: u32,
    /// Where the service writes per-file results
    pub import_result_sink: Option<String>,
}

/// Counts reported by a finished import
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: u64,
    pub skipped: u64,
    pub failed: u64,
}

/// Trait for a managed corpus service
///
/// Implementations:
/// - `VertexRagClient`: Vertex AI RAG Engine
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CorpusProvider: Send + Sync {
    /// List every corpus in the project/location
    async fn list_corpora(&self) -> Result<Vec<RagCorpus>>;

    /// Create a corpus backed by the given embedding model
    async fn create_corpus(&self, display_name: &str, embedding_model: &str) -> Result<RagCorpus>;

    /// Import files and wait for the import to finish
    async fn import_files(&self, request: &ImportRequest) -> Result<ImportSummary>;
}
