//! Error types for the bus.

use thiserror::Error;

/// Returned when parsing an unknown event kind name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown event kind: {0}")]
pub struct UnknownEventKind(pub String);
