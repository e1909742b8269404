//! Error types for the ingestion trigger

use thiserror::Error;

/// Result type alias for trigger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Trigger errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Credential or token exchange failure
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Object storage failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Object missing from its bucket
    #[error("Object not found: gs://{bucket}/{name}")]
    ObjectNotFound { bucket: String, name: String },

    /// Corpus lookup or creation failure
    #[error("Corpus error: {0}")]
    Corpus(String),

    /// File import failure
    #[error("Import error: {0}")]
    Import(String),

    /// Notification could not be decoded
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Create an object-not-found error
    pub fn object_not_found(bucket: impl Into<String>, name: impl Into<String>) -> Self {
        Self::ObjectNotFound {
            bucket: bucket.into(),
            name: name.into(),
        }
    }

    /// Create a corpus error
    pub fn corpus(message: impl Into<String>) -> Self {
        Self::Corpus(message.into())
    }

    /// Create an import error
    pub fn import(message: impl Into<String>) -> Self {
        Self::Import(message.into())
    }

    /// Create an invalid event error
    pub fn invalid_event(message: impl Into<String>) -> Self {
        Self::InvalidEvent(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
