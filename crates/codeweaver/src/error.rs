//! Error types for the unified API.

use codeweaver_core::CoreError;
use codeweaver_store::StoreError;
use codeweaver_writes::WriteError;
use thiserror::Error;

/// Errors that can occur while setting up codeweaver or reading through it.
///
/// Writes never surface here; rejected writes are published on the error bus.
#[derive(Debug, Error)]
pub enum WeaverError {
    /// Invalid document or collection path.
    #[error("invalid path: {0}")]
    Path(#[from] CoreError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Write facade setup error.
    #[error("write facade error: {0}")]
    Write(#[from] WriteError),

    /// Configuration rejected by [`WeaverConfig::validate`](crate::WeaverConfig::validate).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A stored document does not have the expected shape.
    #[error("invalid record at {path}: {reason}")]
    InvalidRecord { path: String, reason: String },
}

/// Result type for codeweaver operations.
pub type Result<T> = std::result::Result<T, WeaverError>;
