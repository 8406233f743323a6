//! Error types for the store module.

use codeweaver_core::{CoreError, WriteOperationKind};
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The access rules rejected the request.
    #[error("permission denied: {operation} '{path}': {reason}")]
    PermissionDenied {
        path: String,
        operation: WriteOperationKind,
        reason: String,
    },

    /// Document not found.
    #[error("document not found: {0}")]
    NotFound(String),

    /// The store cannot be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Invalid path.
    #[error("invalid path: {0}")]
    Path(#[from] CoreError),

    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Payload serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Data the store cannot hold faithfully.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),
}

impl StoreError {
    /// Whether this is an access-rule rejection.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, StoreError::PermissionDenied { .. })
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
