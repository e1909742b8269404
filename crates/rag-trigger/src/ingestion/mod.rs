//! Managed-corpus ingestion

mod trigger;

pub use trigger::IngestionTrigger;
