//! Storage event handler
//!
//! Filters noise, moves the object into the processing bucket and triggers a
//! corpus import. Every failure is logged and absorbed: the caller always gets
//! an [`EventSummary`] back, never an error, so the event source has nothing
//! to retry.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::StorageConfig;
use crate::error::Result;
use crate::ingestion::IngestionTrigger;
use crate::ledger::ProcessedFileLedger;
use crate::providers::ObjectStoreProvider;
use crate::types::{CloudEvent, EventRecord, EventSummary, Outcome};

/// Outcome counters since process start
#[derive(Debug, Default)]
struct HandlerStats {
    handled: AtomicU64,
    ingested: AtomicU64,
    skipped: AtomicU64,
    duplicates: AtomicU64,
    failed: AtomicU64,
}

impl HandlerStats {
    fn observe(&self, outcome: &Outcome) {
        self.handled.fetch_add(1, Ordering::Relaxed);
        let counter = if outcome.is_skip() {
            &self.skipped
        } else if outcome.is_failure() {
            &self.failed
        } else if matches!(outcome, Outcome::DuplicateAtDestination) {
            &self.duplicates
        } else {
            &self.ingested
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Point-in-time view of the handler counters
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct HandlerStatsSnapshot {
    pub handled: u64,
    pub ingested: u64,
    pub skipped: u64,
    pub duplicates: u64,
    pub failed: u64,
    pub ledger_size: usize,
}

/// Reacts to object-finalized notifications
pub struct EventHandler {
    ledger: Arc<ProcessedFileLedger>,
    store: Arc<dyn ObjectStoreProvider>,
    trigger: Arc<IngestionTrigger>,
    processing_bucket: String,
    settle_delay: Duration,
    stats: HandlerStats,
}

impl EventHandler {
    /// Create a handler with an empty ledger
    pub fn new(
        store: Arc<dyn ObjectStoreProvider>,
        trigger: Arc<IngestionTrigger>,
        config: &StorageConfig,
    ) -> Self {
        tracing::info!(
            "Event handler using {} object store, processing bucket {}",
            store.name(),
            config.processing_bucket
        );
        Self {
            ledger: Arc::new(ProcessedFileLedger::new()),
            store,
            trigger,
            processing_bucket: config.processing_bucket.clone(),
            settle_delay: config.settle_delay(),
            stats: HandlerStats::default(),
        }
    }

    pub fn ledger(&self) -> &ProcessedFileLedger {
        &self.ledger
    }

    pub fn stats(&self) -> HandlerStatsSnapshot {
        HandlerStatsSnapshot {
            handled: self.stats.handled.load(Ordering::Relaxed),
            ingested: self.stats.ingested.load(Ordering::Relaxed),
            skipped: self.stats.skipped.load(Ordering::Relaxed),
            duplicates: self.stats.duplicates.load(Ordering::Relaxed),
            failed: self.stats.failed.load(Ordering::Relaxed),
            ledger_size: self.ledger.len(),
        }
    }

    /// Handle one event. Never fails.
    pub async fn handle(&self, event: &CloudEvent) -> EventSummary {
        let summary = match EventRecord::try_from(event) {
            Ok(record) => {
                let outcome = match self.process(&record).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        tracing::error!("Error handling event {}: {}", record.event_id, e);
                        tracing::error!("Event completed with error - not retrying to prevent loops");
                        Outcome::Failed {
                            error: e.to_string(),
                        }
                    }
                };
                EventSummary::from_record(&record, outcome)
            }
            Err(e) => {
                tracing::error!("Error handling event {}: {}", event.id, e);
                tracing::error!("Event completed with error - not retrying to prevent loops");
                EventSummary::from_partial(
                    event,
                    Outcome::InvalidEvent {
                        error: e.to_string(),
                    },
                )
            }
        };

        self.stats.observe(&summary.outcome);
        summary
    }

    async fn process(&self, record: &EventRecord) -> Result<Outcome> {
        tracing::info!("Event ID: {}", record.event_id);
        tracing::info!("Event Type: {}", record.event_type);
        tracing::info!("Bucket: {}", record.bucket);
        tracing::info!("File: {}", record.filename);
        tracing::info!("Metageneration: {}", record.metageneration);
        tracing::info!("Created: {}", record.time_created);
        tracing::info!("Updated: {}", record.updated);

        let identifier = record.identifier();

        if self.ledger.contains(&identifier) {
            tracing::warn!("File {} already processed, skipping...", record.filename);
            return Ok(Outcome::AlreadyProcessed);
        }

        if !record.is_finalized() {
            tracing::info!("Ignoring event type: {}", record.event_type);
            return Ok(Outcome::IgnoredEventType);
        }

        if record.is_hidden_or_temporary() {
            tracing::info!("Skipping temporary/system file: {}", record.filename);
            return Ok(Outcome::IgnoredFile);
        }

        // A finalize in the processing bucket itself would otherwise delete the object
        if record.bucket == self.processing_bucket {
            tracing::warn!(
                "Ignoring {}: event came from the processing bucket {}",
                record.filename,
                self.processing_bucket
            );
            return Ok(Outcome::IgnoredFile);
        }

        if !self.ledger.record(identifier) {
            tracing::warn!("File {} claimed by a concurrent delivery, skipping...", record.filename);
            return Ok(Outcome::AlreadyProcessed);
        }
        tracing::info!("Processing file: {}", record.filename);

        if !self.store.exists(&record.bucket, &record.filename).await? {
            tracing::error!("File {} does not exist in {}", record.filename, record.bucket);
            return Ok(Outcome::SourceMissing);
        }

        if self
            .store
            .exists(&self.processing_bucket, &record.filename)
            .await?
        {
            tracing::warn!("File {} already exists in processing bucket", record.filename);
            self.store.delete(&record.bucket, &record.filename).await?;
            tracing::info!("Deleted duplicate {} from {}", record.filename, record.bucket);
            return Ok(Outcome::DuplicateAtDestination);
        }

        self.store
            .move_object(&record.bucket, &record.filename, &self.processing_bucket)
            .await?;

        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }

        tracing::info!("Starting RAG processing for {}", record.filename);
        let summary = self.trigger.process(&self.processing_bucket).await?;
        tracing::info!("Completed RAG processing for {}", record.filename);

        Ok(Outcome::Ingested(summary))
    }
}
