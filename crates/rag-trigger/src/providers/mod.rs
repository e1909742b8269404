//! Provider abstractions for object storage and the managed corpus service
//!
//! This module provides trait-based abstractions that allow switching between
//! in-memory and cloud (GCP) backends.

pub mod corpus;
pub mod memory;
pub mod object_store;

#[cfg(feature = "gcp")]
pub mod gcp;

pub use corpus::{CorpusProvider, ImportRequest, ImportSummary, RagCorpus};
pub use memory::MemoryObjectStore;
pub use object_store::ObjectStoreProvider;
