//! Error types for the rumi notes backend.

use thiserror::Error;

use crate::models::NoteId;

/// Result type alias using rumi's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for rumi operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Note not found
    #[error("Note not found: {0}")]
    NoteNotFound(NoteId),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Record collection store failure (schema violation, malformed document)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Schema reconciliation failed
    #[error("Schema error: {0}")]
    Schema(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for lookup misses (`NotFound` and `NoteNotFound`).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::NoteNotFound(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
