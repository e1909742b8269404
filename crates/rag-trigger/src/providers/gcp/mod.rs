//! Google Cloud Platform provider implementations
//!
//! - Google Cloud Storage for object existence, copy and delete
//! - Vertex AI RAG Engine for corpus lookup, creation and file import

mod auth;
mod gcs_store;
mod vertex_rag;

pub use auth::GcpAuth;
pub use gcs_store::GcsObjectStore;
pub use vertex_rag::VertexRagClient;
