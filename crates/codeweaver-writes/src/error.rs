//! Error types for the write facade.

use thiserror::Error;

/// Errors raised while setting up the write facade.
///
/// Individual writes never return errors; their failures go to the bus.
#[derive(Debug, Error)]
pub enum WriteError {
    /// No tokio runtime is available to host the dispatch loop.
    #[error("no tokio runtime available to run the write dispatcher")]
    NoRuntime,
}

/// Result type for write facade setup.
pub type Result<T> = std::result::Result<T, WriteError>;
