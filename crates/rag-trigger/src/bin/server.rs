//! Event receiver binary
//!
//! Run with: cargo run -p rag-trigger --bin rag-trigger-server

use rag_trigger::{config::TriggerConfig, server::TriggerServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rag_trigger=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = TriggerConfig::load()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Processing bucket: {}", config.storage.processing_bucket);
    tracing::info!("  - Settle delay: {}ms", config.storage.settle_delay_ms);
    tracing::info!("  - Corpus: {}", config.corpus.display_name);
    tracing::info!("  - Embedding model: {}", config.corpus.embedding_model);
    tracing::info!(
        "  - Chunking: {} tokens, {} overlap",
        config.corpus.chunk_size,
        config.corpus.chunk_overlap
    );

    let server = TriggerServer::new(config).await?;

    tracing::info!("Endpoints:");
    tracing::info!("  POST /       - Storage CloudEvents");
    tracing::info!("  GET  /health - Liveness");
    tracing::info!("  GET  /stats  - Handler counters");

    server.start().await?;

    Ok(())
}
