//! Error types for codeweaver core.

use thiserror::Error;

/// Errors raised while building paths and error contexts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("path is empty")]
    EmptyPath,

    #[error("path {0:?} contains an empty segment")]
    EmptySegment(String),

    #[error("invalid path segment {0:?}")]
    InvalidSegment(String),

    #[error("path {0:?} does not name a collection")]
    NotACollection(String),

    #[error("path {0:?} does not name a document")]
    NotADocument(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
