//! Application state for the event receiver

use parking_lot::RwLock;
use std::sync::Arc;

use crate::config::TriggerConfig;
#[cfg(not(feature = "gcp"))]
use crate::error::Error;
use crate::error::Result;
use crate::handler::EventHandler;
use crate::ingestion::IngestionTrigger;
use crate::providers::{CorpusProvider, ObjectStoreProvider};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: TriggerConfig,
    /// Event handler, holding the process-wide ledger
    handler: EventHandler,
    /// Ready state
    ready: RwLock<bool>,
}

impl AppState {
    /// Create state backed by Google Cloud Storage and Vertex AI RAG Engine
    #[cfg(feature = "gcp")]
    pub async fn new(config: TriggerConfig) -> Result<Self> {
        use crate::providers::gcp::{GcpAuth, GcsObjectStore, VertexRagClient};

        tracing::info!(
            "Initializing GCP providers (project: {}, location: {})",
            config.gcp.project_id,
            config.gcp.location
        );

        let auth = Arc::new(GcpAuth::from_config(&config.gcp)?);
        let store = Arc::new(GcsObjectStore::new().await?);
        let corpus = Arc::new(VertexRagClient::new(Arc::clone(&auth), &config.gcp));

        tracing::info!(
            "GCP providers initialized (processing bucket: {}, corpus: {})",
            config.storage.processing_bucket,
            config.corpus.display_name
        );

        Ok(Self::from_parts(config, store, corpus))
    }

    #[cfg(not(feature = "gcp"))]
    pub async fn new(_config: TriggerConfig) -> Result<Self> {
        Err(Error::Config(
            "GCP providers are not compiled in. Rebuild with --features gcp".to_string(),
        ))
    }

    /// Assemble state from explicit providers
    pub fn from_parts(
        config: TriggerConfig,
        store: Arc<dyn ObjectStoreProvider>,
        corpus: Arc<dyn CorpusProvider>,
    ) -> Self {
        let trigger = Arc::new(IngestionTrigger::new(corpus, config.corpus.clone()));
        let handler = EventHandler::new(store, trigger, &config.storage);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                handler,
                ready: RwLock::new(true),
            }),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &TriggerConfig {
        &self.inner.config
    }

    /// Get the event handler
    pub fn handler(&self) -> &EventHandler {
        &self.inner.handler
    }

    /// Check if the server is ready
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.read()
    }

    /// Set ready state
    pub fn set_ready(&self, ready: bool) {
        *self.inner.ready.write() = ready;
    }
}
