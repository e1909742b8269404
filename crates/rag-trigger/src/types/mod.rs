//! Core types for the ingestion trigger

pub mod event;
pub mod outcome;

pub use event::{CloudEvent, EventRecord, FileIdentifier, StorageObjectData, OBJECT_FINALIZED};
pub use outcome::{EventSummary, Outcome};
