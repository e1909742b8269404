//! HTTP receiver for storage notifications

pub mod routes;
pub mod state;

use axum::{routing::get, Router};
use std::future::Future;
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;

use crate::config::TriggerConfig;
use crate::error::{Error, Result};
use state::AppState;

/// Event receiver HTTP server
pub struct TriggerServer {
    config: TriggerConfig,
    state: AppState,
}

impl TriggerServer {
    /// Create a server backed by the GCP providers
    pub async fn new(config: TriggerConfig) -> Result<Self> {
        let state = AppState::new(config.clone()).await?;
        Ok(Self { config, state })
    }

    /// Create a server around prepared state
    pub fn with_state(state: AppState) -> Self {
        Self {
            config: state.config().clone(),
            state,
        }
    }

    /// Build the router with all routes
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health_check))
            .route("/ready", get(readiness))
            .merge(routes::event_routes())
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
    }

    /// Start the server
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address: {}", e)))?;

        let router = self.router();

        tracing::info!("Listening for storage events on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Config(format!("Failed to bind: {}", e)))?;

        let state = self.state.clone();
        axum::serve(listener, router)
            .with_graceful_shutdown(drain(state, shutdown_signal()))
            .await
            .map_err(|e| Error::internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.server.host, self.config.server.port)
    }
}

/// Mark the state unready once `signal` fires, so `/ready` fails while
/// in-flight deliveries finish
async fn drain(state: AppState, signal: impl Future<Output = ()>) {
    signal.await;
    state.set_ready(false);
    tracing::info!("Shutdown requested, draining in-flight events");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C"),
        _ = terminate => tracing::info!("Received terminate signal"),
    }
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Readiness check endpoint
async fn readiness(state: axum::extract::State<AppState>) -> axum::http::StatusCode {
    if state.is_ready() {
        axum::http::StatusCode::OK
    } else {
        axum::http::StatusCode::SERVICE_UNAVAILABLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::corpus::MockCorpusProvider;
    use crate::providers::{ImportSummary, MemoryObjectStore, RagCorpus};
    use crate::types::OBJECT_FINALIZED;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn server(store: Arc<MemoryObjectStore>) -> TriggerServer {
        let mut corpus = MockCorpusProvider::new();
        corpus.expect_list_corpora().returning(|| {
            Ok(vec![RagCorpus {
                name: "projects/demo/locations/us-central1/ragCorpora/1".to_string(),
                display_name: "pdlc-rag-corpus".to_string(),
            }])
        });
        corpus
            .expect_import_files()
            .returning(|_| Ok(ImportSummary::default()));

        let mut config = TriggerConfig::default();
        config.storage.processing_bucket = "processing".to_string();
        config.storage.settle_delay_ms = 0;

        TriggerServer::with_state(AppState::from_parts(config, store, Arc::new(corpus)))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_binary_mode_delivery() {
        let store = Arc::new(MemoryObjectStore::new());
        store.put("raw", "doc.pdf", &b"%PDF-1.4"[..]);
        let router = server(Arc::clone(&store)).router();

        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .header("ce-id", "evt-1")
            .header("ce-type", OBJECT_FINALIZED)
            .header("ce-source", "//storage.googleapis.com/projects/_/buckets/raw")
            .body(Body::from(
                serde_json::json!({
                    "bucket": "raw",
                    "name": "doc.pdf",
                    "metageneration": "1",
                    "timeCreated": "2025-05-01T10:00:00.000Z",
                    "updated": "2025-05-01T10:00:00.000Z",
                })
                .to_string(),
            ))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["event_id"], "evt-1");
        assert_eq!(body["outcome"]["status"], "ingested");
        assert_eq!(store.list("processing"), vec!["doc.pdf".to_string()]);
    }

    #[tokio::test]
    async fn test_garbage_delivery_still_acknowledged() {
        let router = server(Arc::new(MemoryObjectStore::new())).router();

        let request = Request::builder()
            .method("POST")
            .uri("/")
            .body(Body::from("not an event"))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["event_id"], "unknown");
        assert_eq!(body["outcome"]["status"], "invalid_event");
    }

    #[tokio::test]
    async fn test_health_and_stats() {
        let server = server(Arc::new(MemoryObjectStore::new()));

        let response = server
            .router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = server
            .router()
            .oneshot(Request::get("/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["handled"], 0);
        assert_eq!(body["ledger_size"], 0);
    }

    #[tokio::test]
    async fn test_unparseable_body_keeps_event_identity() {
        let router = server(Arc::new(MemoryObjectStore::new())).router();

        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .header("ce-id", "evt-10")
            .header("ce-type", OBJECT_FINALIZED)
            .body(Body::from("{not json"))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["event_id"], "evt-10");
        assert_eq!(body["event_type"], OBJECT_FINALIZED);
        assert_eq!(body["bucket"], "unknown");
        assert_eq!(body["filename"], "unknown");
        assert_eq!(body["outcome"]["status"], "invalid_event");
    }

    #[tokio::test]
    async fn test_drain_marks_unready() {
        let server = server(Arc::new(MemoryObjectStore::new()));
        assert!(server.state.is_ready());

        drain(server.state.clone(), async {}).await;

        let response = server
            .router()
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_address() {
        let server = server(Arc::new(MemoryObjectStore::new()));
        assert_eq!(server.address(), "0.0.0.0:8080");
    }
}
