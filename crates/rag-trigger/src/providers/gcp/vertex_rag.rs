//! Vertex AI RAG Engine client
//!
//! Thin REST wrapper over the `ragCorpora` resource. Corpus creation and file
//! import are long-running operations; both are polled until done.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::auth::GcpAuth;
use crate::config::GcpConfig;
use crate::error::{Error, Result};
use crate::providers::corpus::{CorpusProvider, ImportRequest, ImportSummary, RagCorpus};

/// Vertex AI RAG Engine provider
pub struct VertexRagClient {
    auth: Arc<GcpAuth>,
    location: String,
    poll_interval: Duration,
    poll_max_attempts: u32,
}

impl VertexRagClient {
    /// Create a new RAG Engine client
    ///
    /// # Arguments
    /// * `auth` - GCP authentication
    /// * `config` - Project location and operation polling settings
    pub fn new(auth: Arc<GcpAuth>, config: &GcpConfig) -> Self {
        Self {
            auth,
            location: config.location.clone(),
            poll_interval: config.operation_poll_interval(),
            poll_max_attempts: config.operation_poll_max_attempts,
        }
    }

    fn api_base(&self) -> String {
        format!("https://{}-aiplatform.googleapis.com/v1", self.location)
    }

    fn parent(&self) -> String {
        format!(
            "projects/{}/locations/{}",
            self.auth.project_id(),
            self.location
        )
    }

    fn corpora_url(&self) -> String {
        format!("{}/{}/ragCorpora", self.api_base(), self.parent())
    }

    /// Expand a publisher model path into a full prediction endpoint
    fn embedding_endpoint(&self, model: &str) -> String {
        if model.starts_with("projects/") {
            model.to_string()
        } else {
            format!("{}/{}", self.parent(), model)
        }
    }

    /// Poll a long-running operation until it reports `done`
    async fn wait_for_operation(
        &self,
        client: &reqwest::Client,
        mut operation: Operation,
        to_error: fn(String) -> Error,
    ) -> Result<serde_json::Value> {
        let mut attempts = 0;

        while !operation.done {
            if attempts >= self.poll_max_attempts {
                return Err(to_error(format!(
                    "Operation {} not done after {} polls",
                    operation.name, attempts
                )));
            }
            attempts += 1;
            tokio::time::sleep(self.poll_interval).await;

            let url = format!("{}/{}", self.api_base(), operation.name);
            let response = client.get(&url).send().await?;
            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(to_error(format!(
                    "Polling {} failed ({}): {}",
                    operation.name, status, body
                )));
            }
            operation = response.json().await?;
            tracing::debug!("Operation {} poll {}: done={}", operation.name, attempts, operation.done);
        }

        if let Some(status) = operation.error {
            return Err(to_error(format!(
                "Operation {} failed ({}): {}",
                operation.name, status.code, status.message
            )));
        }

        Ok(operation.response.unwrap_or(serde_json::Value::Null))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListRagCorporaResponse {
    #[serde(default)]
    rag_corpora: Vec<RagCorpusResource>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RagCorpusResource {
    name: String,
    #[serde(default)]
    display_name: String,
}

impl From<RagCorpusResource> for RagCorpus {
    fn from(resource: RagCorpusResource) -> Self {
        Self {
            name: resource.name,
            display_name: resource.display_name,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateRagCorpusRequest {
    display_name: String,
    vector_db_config: VectorDbConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VectorDbConfig {
    rag_embedding_model_config: RagEmbeddingModelConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RagEmbeddingModelConfig {
    vertex_prediction_endpoint: VertexPredictionEndpoint,
}

#[derive(Serialize)]
struct VertexPredictionEndpoint {
    endpoint: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImportRagFilesRequest {
    import_rag_files_config: ImportRagFilesConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ImportRagFilesConfig {
    gcs_source: GcsSource,
    rag_file_transformation_config: RagFileTransformationConfig,
    max_embedding_requests_per_min: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    import_result_gcs_sink: Option<GcsDestination>,
}

#[derive(Serialize)]
struct GcsSource {
    uris: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RagFileTransformationConfig {
    rag_file_chunking_config: RagFileChunkingConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RagFileChunkingConfig {
    fixed_length_chunking: FixedLengthChunking,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FixedLengthChunking {
    chunk_size: u32,
    chunk_overlap: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GcsDestination {
    output_uri_prefix: String,
}

impl From<&ImportRequest> for ImportRagFilesRequest {
    fn from(request: &ImportRequest) -> Self {
        Self {
            import_rag_files_config: ImportRagFilesConfig {
                gcs_source: GcsSource {
                    uris: request.paths.clone(),
                },
                rag_file_transformation_config: RagFileTransformationConfig {
                    rag_file_chunking_config: RagFileChunkingConfig {
                        fixed_length_chunking: FixedLengthChunking {
                            chunk_size: request.chunk_size,
                            chunk_overlap: request.chunk_overlap,
                        },
                    },
                },
                max_embedding_requests_per_min: request.max_embedding_requests_per_min,
                import_result_gcs_sink: request.import_result_sink.clone().map(|prefix| {
                    GcsDestination {
                        output_uri_prefix: prefix,
                    }
                }),
            },
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Operation {
    name: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<OperationStatus>,
    #[serde(default)]
    response: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct OperationStatus {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ImportRagFilesResponse {
    #[serde(default, deserialize_with = "int64")]
    imported_rag_files_count: u64,
    #[serde(default, deserialize_with = "int64")]
    skipped_rag_files_count: u64,
    #[serde(default, deserialize_with = "int64")]
    failed_rag_files_count: u64,
}

/// Proto3 JSON encodes int64 as a string
fn int64<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u64),
        Str(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Num(n) => Ok(n),
        Raw::Str(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

fn parse_import_summary(response: serde_json::Value) -> Result<ImportSummary> {
    if response.is_null() {
        return Ok(ImportSummary::default());
    }
    let parsed: ImportRagFilesResponse = serde_json::from_value(response)
        .map_err(|e| Error::import(format!("Unexpected import response: {}", e)))?;
    Ok(ImportSummary {
        imported: parsed.imported_rag_files_count,
        skipped: parsed.skipped_rag_files_count,
        failed: parsed.failed_rag_files_count,
    })
}

#[async_trait]
impl CorpusProvider for VertexRagClient {
    async fn list_corpora(&self) -> Result<Vec<RagCorpus>> {
        let client = self.auth.authorized_client().await?;
        let mut corpora = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = client.get(self.corpora_url());
            if let Some(ref token) = page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| Error::corpus(format!("List corpora request failed: {}", e)))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(Error::corpus(format!(
                    "List corpora failed ({}): {}",
                    status, body
                )));
            }

            let page: ListRagCorporaResponse = response
                .json()
                .await
                .map_err(|e| Error::corpus(format!("Failed to parse corpora list: {}", e)))?;

            corpora.extend(page.rag_corpora.into_iter().map(RagCorpus::from));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(corpora)
    }

    async fn create_corpus(&self, display_name: &str, embedding_model: &str) -> Result<RagCorpus> {
        let client = self.auth.authorized_client().await?;

        let request = CreateRagCorpusRequest {
            display_name: display_name.to_string(),
            vector_db_config: VectorDbConfig {
                rag_embedding_model_config: RagEmbeddingModelConfig {
                    vertex_prediction_endpoint: VertexPredictionEndpoint {
                        endpoint: self.embedding_endpoint(embedding_model),
                    },
                },
            },
        };

        let response = client
            .post(self.corpora_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::corpus(format!("Create corpus request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::corpus(format!(
                "Create corpus failed ({}): {}",
                status, body
            )));
        }

        let operation: Operation = response
            .json()
            .await
            .map_err(|e| Error::corpus(format!("Failed to parse create operation: {}", e)))?;

        let created = self
            .wait_for_operation(&client, operation, Error::Corpus)
            .await?;
        let resource: RagCorpusResource = serde_json::from_value(created)
            .map_err(|e| Error::corpus(format!("Unexpected create response: {}", e)))?;

        Ok(resource.into())
    }

    async fn import_files(&self, request: &ImportRequest) -> Result<ImportSummary> {
        let client = self.auth.authorized_client().await?;
        let url = format!("{}/{}/ragFiles:import", self.api_base(), request.corpus_name);

        let response = client
            .post(&url)
            .json(&ImportRagFilesRequest::from(request))
            .send()
            .await
            .map_err(|e| Error::import(format!("Import request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::import(format!("Import failed ({}): {}", status, body)));
        }

        let operation: Operation = response
            .json()
            .await
            .map_err(|e| Error::import(format!("Failed to parse import operation: {}", e)))?;

        let result = self
            .wait_for_operation(&client, operation, Error::Import)
            .await?;
        parse_import_summary(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> VertexRagClient {
        let config = GcpConfig {
            project_id: "demo".to_string(),
            ..GcpConfig::default()
        };
        VertexRagClient::new(Arc::new(GcpAuth::from_metadata_server("demo".to_string())), &config)
    }

    #[test]
    fn test_corpora_url() {
        assert_eq!(
            client().corpora_url(),
            "https://us-central1-aiplatform.googleapis.com/v1/projects/demo/locations/us-central1/ragCorpora"
        );
    }

    #[test]
    fn test_embedding_endpoint_expansion() {
        let client = client();
        assert_eq!(
            client.embedding_endpoint("publishers/google/models/text-embedding-005"),
            "projects/demo/locations/us-central1/publishers/google/models/text-embedding-005"
        );
        let full = "projects/other/locations/europe-west4/publishers/google/models/x";
        assert_eq!(client.embedding_endpoint(full), full);
    }

    #[test]
    fn test_import_body_shape() {
        let request = ImportRequest {
            corpus_name: "projects/demo/locations/us-central1/ragCorpora/42".to_string(),
            paths: vec!["gs://processing/".to_string()],
            chunk_size: 512,
            chunk_overlap: 100,
            max_embedding_requests_per_min: 1000,
            import_result_sink: Some("gs://results/rag_results.ndjson".to_string()),
        };

        let body = serde_json::to_value(ImportRagFilesRequest::from(&request)).unwrap();
        assert_eq!(
            body,
            json!({
                "importRagFilesConfig": {
                    "gcsSource": {"uris": ["gs://processing/"]},
                    "ragFileTransformationConfig": {
                        "ragFileChunkingConfig": {
                            "fixedLengthChunking": {"chunkSize": 512, "chunkOverlap": 100}
                        }
                    },
                    "maxEmbeddingRequestsPerMin": 1000,
                    "importResultGcsSink": {"outputUriPrefix": "gs://results/rag_results.ndjson"}
                }
            })
        );
    }

    #[test]
    fn test_import_body_without_sink() {
        let request = ImportRequest {
            corpus_name: "c".to_string(),
            paths: vec![],
            chunk_size: 256,
            chunk_overlap: 0,
            max_embedding_requests_per_min: 10,
            import_result_sink: None,
        };
        let body = serde_json::to_value(ImportRagFilesRequest::from(&request)).unwrap();
        assert!(body["importRagFilesConfig"].get("importResultGcsSink").is_none());
    }

    #[test]
    fn test_parse_import_summary_string_counts() {
        let summary = parse_import_summary(json!({
            "@type": "type.googleapis.com/google.cloud.aiplatform.v1.ImportRagFilesResponse",
            "importedRagFilesCount": "3",
            "skippedRagFilesCount": "1"
        }))
        .unwrap();
        assert_eq!(
            summary,
            ImportSummary {
                imported: 3,
                skipped: 1,
                failed: 0
            }
        );
    }

    #[test]
    fn test_parse_import_summary_empty() {
        assert_eq!(
            parse_import_summary(serde_json::Value::Null).unwrap(),
            ImportSummary::default()
        );
    }

    #[test]
    fn test_list_page_parsing() {
        let page: ListRagCorporaResponse = serde_json::from_value(json!({
            "ragCorpora": [
                {"name": "projects/demo/locations/us-central1/ragCorpora/1", "displayName": "pdlc-rag-corpus"}
            ],
            "nextPageToken": ""
        }))
        .unwrap();
        assert_eq!(page.rag_corpora.len(), 1);
        assert_eq!(page.rag_corpora[0].display_name, "pdlc-rag-corpus");
        assert_eq!(page.next_page_token.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_failed_operation_maps_to_error() {
        let operation: Operation = serde_json::from_value(json!({
            "name": "projects/demo/locations/us-central1/operations/7",
            "done": true,
            "error": {"code": 9, "message": "corpus busy"}
        }))
        .unwrap();

        let http = reqwest::Client::new();
        let result = client()
            .wait_for_operation(&http, operation, Error::Import)
            .await;
        match result {
            Err(Error::Import(msg)) => assert!(msg.contains("corpus busy")),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
