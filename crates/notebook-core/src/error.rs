//! Error types for notebook.

use thiserror::Error;

/// Result type alias using notebook's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for notebook operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Request input is missing or malformed
    #[error("Validation error: {0}")]
    Validation(String),

    /// Note not found
    #[error("Note not found: {0}")]
    NoteNotFound(i64),

    /// Bad password, or missing/invalid session
    #[error("Unauthorized: {0}")]
    Auth(String),

    /// Session cache operation failed
    #[error("Cache error: {0}")]
    Cache(String),

    /// Plain-text extraction failed
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Internal(e.to_string())
    }
}
