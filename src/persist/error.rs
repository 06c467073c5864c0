//! Persistence error types

use thiserror::Error;

/// Errors from the capture event store
#[derive(Error, Debug)]
pub enum PersistError {
    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Backend-specific failure
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<serde_json::Error> for PersistError {
    fn from(err: serde_json::Error) -> Self {
        PersistError::Serialization(err.to_string())
    }
}

/// Result type alias for persistence operations
pub type PersistResult<T> = Result<T, PersistError>;
