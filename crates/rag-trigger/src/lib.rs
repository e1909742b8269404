//! rag-trigger: storage-event relocation and managed RAG ingestion
//!
//! Reacts to object-finalized notifications from Cloud Storage, deduplicates
//! them against an in-process ledger, moves the object into a processing
//! bucket and asks Vertex AI RAG Engine to import that bucket into a corpus.
//! Chunking, embedding and search are left entirely to the managed service.

pub mod config;
pub mod error;
pub mod handler;
pub mod ingestion;
pub mod ledger;
pub mod providers;
pub mod server;
pub mod types;

pub use config::TriggerConfig;
pub use error::{Error, Result};
pub use handler::EventHandler;
pub use ingestion::IngestionTrigger;
pub use ledger::ProcessedFileLedger;
pub use types::{CloudEvent, EventSummary, Outcome};
