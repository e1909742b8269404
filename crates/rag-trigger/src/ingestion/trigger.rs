//! Corpus lookup-or-create followed by a bucket import
//!
//! Everything past the API call (parsing, chunking, embedding) belongs to the
//! managed service. Errors are logged here and returned to the caller.

use std::sync::Arc;

use crate::config::CorpusConfig;
use crate::error::Result;
use crate::providers::{CorpusProvider, ImportRequest, ImportSummary, RagCorpus};

/// Hands a bucket to the managed RAG service for indexing
pub struct IngestionTrigger {
    corpus: Arc<dyn CorpusProvider>,
    config: CorpusConfig,
}

impl IngestionTrigger {
    pub fn new(corpus: Arc<dyn CorpusProvider>, config: CorpusConfig) -> Self {
        Self { corpus, config }
    }

    /// `gs://` URI covering every object in a bucket
    pub fn source_uri(bucket: &str) -> String {
        format!("gs://{}/", bucket)
    }

    /// Find the configured corpus by display name, creating it if absent
    pub async fn ensure_corpus(&self) -> Result<RagCorpus> {
        let corpora = self.corpus.list_corpora().await?;

        if let Some(existing) = corpora
            .into_iter()
            .find(|c| c.display_name == self.config.display_name)
        {
            tracing::info!("Using existing corpus: {}", existing.name);
            return Ok(existing);
        }

        tracing::info!("Creating new corpus: {}", self.config.display_name);
        let created = self
            .corpus
            .create_corpus(&self.config.display_name, &self.config.embedding_model)
            .await?;
        tracing::info!("Created new corpus: {}", created.name);
        Ok(created)
    }

    /// Import all objects under `gs://{bucket}/` into the corpus
    pub async fn process(&self, bucket: &str) -> Result<ImportSummary> {
        let source = Self::source_uri(bucket);
        tracing::info!("Source bucket: {}", source);

        match self.import_from(source).await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                tracing::error!("Error processing RAG corpus: {}", e);
                Err(e)
            }
        }
    }

    async fn import_from(&self, source: String) -> Result<ImportSummary> {
        let corpus = self.ensure_corpus().await?;

        tracing::info!("Importing files from {}", source);
        let request = ImportRequest {
            corpus_name: corpus.name,
            paths: vec![source],
            chunk_size: self.config.chunk_size,
            chunk_overlap: self.config.chunk_overlap,
            max_embedding_requests_per_min: self.config.max_embedding_requests_per_min,
            import_result_sink: self.config.import_result_sink.clone(),
        };
        let summary = self.corpus.import_files(&request).await?;

        tracing::info!(
            "Import finished: {} imported, {} skipped, {} failed",
            summary.imported,
            summary.skipped,
            summary.failed
        );
        Ok(summary)
    }
}
