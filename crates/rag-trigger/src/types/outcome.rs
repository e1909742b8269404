//! Result of handling one storage event

use serde::{Deserialize, Serialize};

use super::event::{CloudEvent, EventRecord, UNKNOWN};
use crate::providers::corpus::ImportSummary;

/// What the handler did with an event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Same bucket/name/metageneration already seen by this process
    AlreadyProcessed,
    /// Not an object-finalized event
    IgnoredEventType,
    /// Hidden or temporary object
    IgnoredFile,
    /// The object was gone before it could be moved
    SourceMissing,
    /// An object with the same name was already in the processing bucket
    DuplicateAtDestination,
    /// Moved and imported into the corpus
    Ingested(ImportSummary),
    /// Payload could not be decoded
    InvalidEvent { error: String },
    /// Move or import failed; logged and absorbed
    Failed { error: String },
}

impl Outcome {
    /// Skips are expected early exits, not failures
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            Outcome::AlreadyProcessed | Outcome::IgnoredEventType | Outcome::IgnoredFile
        )
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Outcome::SourceMissing | Outcome::InvalidEvent { .. } | Outcome::Failed { .. }
        )
    }
}

/// Handler return value: the event's identity plus what happened to it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventSummary {
    pub event_id: String,
    pub event_type: String,
    pub bucket: String,
    pub filename: String,
    pub outcome: Outcome,
}

impl EventSummary {
    pub fn from_record(record: &EventRecord, outcome: Outcome) -> Self {
        Self {
            event_id: record.event_id.clone(),
            event_type: record.event_type.clone(),
            bucket: record.bucket.clone(),
            filename: record.filename.clone(),
            outcome,
        }
    }

    /// Summary for an event whose payload could not be fully decoded
    pub fn from_partial(event: &CloudEvent, outcome: Outcome) -> Self {
        Self {
            event_id: event.id.clone(),
            event_type: event.event_type.clone(),
            bucket: event.data_field("bucket").unwrap_or(UNKNOWN).to_string(),
            filename: event.data_field("name").unwrap_or(UNKNOWN).to_string(),
            outcome,
        }
    }

    /// Summary for a request that did not carry a readable event at all
    pub fn unknown(error: impl Into<String>) -> Self {
        Self {
            event_id: UNKNOWN.to_string(),
            event_type: UNKNOWN.to_string(),
            bucket: UNKNOWN.to_string(),
            filename: UNKNOWN.to_string(),
            outcome: Outcome::InvalidEvent {
                error: error.into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::event::OBJECT_FINALIZED;
    use serde_json::json;

    #[test]
    fn test_partial_summary_fills_unknown() {
        let event = CloudEvent::new("evt-9", OBJECT_FINALIZED, json!({"bucket": "raw"}));
        let summary = EventSummary::from_partial(
            &event,
            Outcome::InvalidEvent {
                error: "missing name".to_string(),
            },
        );

        assert_eq!(summary.event_id, "evt-9");
        assert_eq!(summary.bucket, "raw");
        assert_eq!(summary.filename, UNKNOWN);
        assert!(summary.outcome.is_failure());
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let value = serde_json::to_value(Outcome::Ingested(ImportSummary {
            imported: 2,
            skipped: 1,
            failed: 0,
        }))
        .unwrap();
        assert_eq!(value["status"], "ingested");
        assert_eq!(value["imported"], 2);

        let value = serde_json::to_value(Outcome::IgnoredFile).unwrap();
        assert_eq!(value, json!({"status": "ignored_file"}));
    }
}
