//! Storage notifications as delivered by Eventarc
//!
//! Events arrive as CloudEvents over HTTP, either in binary content mode
//! (attributes in `ce-*` headers, object resource as the JSON body) or in
//! structured mode (`application/cloudevents+json`, everything in the body).

use axum::http::HeaderMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Event type emitted when an object write completes
pub const OBJECT_FINALIZED: &str = "google.cloud.storage.object.v1.finalized";

/// Placeholder reported for fields that could not be read from an event
pub const UNKNOWN: &str = "unknown";

const STRUCTURED_CONTENT_TYPE: &str = "application/cloudevents+json";

/// A CloudEvent envelope
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CloudEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl CloudEvent {
    /// Build an event carrying a storage object payload
    pub fn new(id: impl Into<String>, event_type: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            event_type: event_type.into(),
            source: None,
            subject: None,
            time: None,
            data,
        }
    }

    /// Decode an event from an HTTP request in either content mode.
    ///
    /// In binary mode a body that is not JSON leaves `data` null, so the
    /// attributes read from the headers are still reported.
    pub fn from_http(headers: &HeaderMap, body: &[u8]) -> Result<Self> {
        let content_type = header_str(headers, "content-type")
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with(STRUCTURED_CONTENT_TYPE) {
            return serde_json::from_slice(body)
                .map_err(|e| Error::invalid_event(format!("Malformed structured event: {}", e)));
        }

        let id = header_str(headers, "ce-id")
            .ok_or_else(|| Error::invalid_event("Missing ce-id header"))?;
        let event_type = header_str(headers, "ce-type")
            .ok_or_else(|| Error::invalid_event("Missing ce-type header"))?;

        let data = if body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(body).unwrap_or_else(|e| {
                tracing::error!("Malformed data in event {}: {}", id, e);
                serde_json::Value::Null
            })
        };

        Ok(Self {
            id,
            event_type,
            source: header_str(headers, "ce-source"),
            subject: header_str(headers, "ce-subject"),
            time: header_str(headers, "ce-time"),
            data,
        })
    }

    /// Read a string field of the payload without decoding the whole object
    pub fn data_field(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// Object resource carried in the event data
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StorageObjectData {
    pub bucket: String,
    pub name: String,
    #[serde(deserialize_with = "string_or_number")]
    pub metageneration: String,
    pub time_created: String,
    pub updated: String,
}

/// Storage encodes int64 fields as JSON strings, but test harnesses often send numbers
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Num(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s,
        Raw::Num(n) => n.to_string(),
    })
}

/// Transient view of one notification, consumed by a single handler call
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub event_id: String,
    pub event_type: String,
    pub bucket: String,
    pub filename: String,
    pub metageneration: String,
    pub time_created: String,
    pub updated: String,
}

impl EventRecord {
    pub fn identifier(&self) -> FileIdentifier {
        FileIdentifier {
            bucket: self.bucket.clone(),
            name: self.filename.clone(),
            metageneration: self.metageneration.clone(),
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.event_type == OBJECT_FINALIZED
    }

    /// Hidden (`.foo`) or temporary (`foo.tmp`) objects are never relocated
    pub fn is_hidden_or_temporary(&self) -> bool {
        self.filename.starts_with('.') || self.filename.ends_with(".tmp")
    }
}

impl TryFrom<&CloudEvent> for EventRecord {
    type Error = Error;

    fn try_from(event: &CloudEvent) -> Result<Self> {
        let data: StorageObjectData = serde_json::from_value(event.data.clone())
            .map_err(|e| Error::invalid_event(format!("Event {} data: {}", event.id, e)))?;

        Ok(Self {
            event_id: event.id.clone(),
            event_type: event.event_type.clone(),
            bucket: data.bucket,
            filename: data.name,
            metageneration: data.metageneration,
            time_created: data.time_created,
            updated: data.updated,
        })
    }
}

/// Ledger key: one object generation's metadata revision
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileIdentifier {
    pub bucket: String,
    pub name: String,
    pub metageneration: String,
}

impl fmt::Display for FileIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.bucket, self.name, self.metageneration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use serde_json::json;

    fn object(name: &str) -> serde_json::Value {
        json!({
            "bucket": "raw",
            "name": name,
            "metageneration": "1",
            "timeCreated": "2025-05-01T10:00:00.000Z",
            "updated": "2025-05-01T10:00:00.000Z",
        })
    }

    #[test]
    fn test_binary_mode() {
        let mut headers = HeaderMap::new();
        headers.insert("ce-id", HeaderValue::from_static("evt-1"));
        headers.insert("ce-type", HeaderValue::from_static(OBJECT_FINALIZED));
        headers.insert(
            "ce-source",
            HeaderValue::from_static("//storage.googleapis.com/projects/_/buckets/raw"),
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        let body = serde_json::to_vec(&object("doc.pdf")).unwrap();

        let event = CloudEvent::from_http(&headers, &body).unwrap();
        assert_eq!(event.id, "evt-1");
        assert_eq!(event.event_type, OBJECT_FINALIZED);
        assert_eq!(event.data_field("name"), Some("doc.pdf"));
        assert!(event.source.unwrap().ends_with("/raw"));
    }

    #[test]
    fn test_structured_mode() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "content-type",
            HeaderValue::from_static("application/cloudevents+json; charset=utf-8"),
        );
        let body = serde_json::to_vec(&json!({
            "specversion": "1.0",
            "id": "evt-2",
            "type": OBJECT_FINALIZED,
            "source": "//storage.googleapis.com/projects/_/buckets/raw",
            "data": object("doc.pdf"),
        }))
        .unwrap();

        let event = CloudEvent::from_http(&headers, &body).unwrap();
        assert_eq!(event.id, "evt-2");
        let record = EventRecord::try_from(&event).unwrap();
        assert_eq!(record.filename, "doc.pdf");
    }

    #[test]
    fn test_structured_content_type_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "content-type",
            HeaderValue::from_static("Application/CloudEvents+JSON"),
        );
        let body = serde_json::to_vec(&json!({
            "id": "evt-5",
            "type": OBJECT_FINALIZED,
            "data": object("doc.pdf"),
        }))
        .unwrap();

        let event = CloudEvent::from_http(&headers, &body).unwrap();
        assert_eq!(event.id, "evt-5");
        assert_eq!(event.data_field("bucket"), Some("raw"));
    }

    #[test]
    fn test_unparseable_body_keeps_header_attributes() {
        let mut headers = HeaderMap::new();
        headers.insert("ce-id", HeaderValue::from_static("evt-10"));
        headers.insert("ce-type", HeaderValue::from_static(OBJECT_FINALIZED));
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let event = CloudEvent::from_http(&headers, b"{not json").unwrap();
        assert_eq!(event.id, "evt-10");
        assert_eq!(event.event_type, OBJECT_FINALIZED);
        assert!(event.data.is_null());
        assert!(EventRecord::try_from(&event).is_err());
    }

    #[test]
    fn test_missing_id_header_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert("ce-type", HeaderValue::from_static(OBJECT_FINALIZED));
        let result = CloudEvent::from_http(&headers, b"{}");
        assert!(matches!(result, Err(Error::InvalidEvent(_))));
    }

    #[test]
    fn test_numeric_metageneration() {
        let mut data = object("doc.pdf");
        data["metageneration"] = json!(3);
        let event = CloudEvent::new("evt-3", OBJECT_FINALIZED, data);

        let record = EventRecord::try_from(&event).unwrap();
        assert_eq!(record.metageneration, "3");
        assert_eq!(record.identifier().to_string(), "raw/doc.pdf/3");
    }

    #[test]
    fn test_missing_timestamps_rejected() {
        let event = CloudEvent::new(
            "evt-4",
            OBJECT_FINALIZED,
            json!({"bucket": "raw", "name": "doc.pdf", "metageneration": "1"}),
        );
        assert!(EventRecord::try_from(&event).is_err());
    }

    #[test]
    fn test_hidden_and_temporary_names() {
        let record = |name: &str| {
            EventRecord::try_from(&CloudEvent::new("e", OBJECT_FINALIZED, object(name))).unwrap()
        };

        assert!(record(".keep").is_hidden_or_temporary());
        assert!(record("upload.tmp").is_hidden_or_temporary());
        assert!(!record("report.tmp.pdf").is_hidden_or_temporary());
        assert!(!record("folder/.tmpdir/doc.pdf").is_hidden_or_temporary());
    }
}
