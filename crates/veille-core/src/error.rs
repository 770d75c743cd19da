//! Error types for the veille engine.

use thiserror::Error;

/// Result type alias using veille's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for veille operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Document not found
    #[error("Document not found: {0}")]
    DocumentNotFound(uuid::Uuid),

    /// Anchor not found
    #[error("Anchor not found: {0}")]
    AnchorNotFound(uuid::Uuid),

    /// Embedding lookup failed
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Threshold statistics computation failed
    #[error("Stats error: {0}")]
    Stats(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl Error {
    /// Whether the error indicates a store/connectivity failure that should
    /// abort the current batch and be retried on the next run, as opposed to
    /// a per-item failure that is skipped and logged.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Database(_))
    }
}
