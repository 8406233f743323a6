//! Events carried by the error bus.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use codeweaver_core::PermissionError;

use crate::error::UnknownEventKind;

/// Names an event stream on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    /// A write was rejected by the store.
    PermissionError,
}

impl EventKind {
    /// Wire name of the event kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::PermissionError => "permission-error",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "permission-error" => Ok(EventKind::PermissionError),
            other => Err(UnknownEventKind(other.to_string())),
        }
    }
}

/// An event published on the bus.
///
/// Payloads are reference-counted so every subscriber of one publication
/// observes the same instance.
#[derive(Debug, Clone)]
pub enum ErrorEvent {
    PermissionError(Arc<PermissionError>),
}

impl ErrorEvent {
    /// The stream this event is published on.
    pub fn kind(&self) -> EventKind {
        match self {
            ErrorEvent::PermissionError(_) => EventKind::PermissionError,
        }
    }

    /// The permission error carried by this event, if any.
    pub fn as_permission_error(&self) -> Option<&Arc<PermissionError>> {
        match self {
            ErrorEvent::PermissionError(err) => Some(err),
        }
    }
}

impl From<PermissionError> for ErrorEvent {
    fn from(err: PermissionError) -> Self {
        ErrorEvent::PermissionError(Arc::new(err))
    }
}

impl From<Arc<PermissionError>> for ErrorEvent {
    fn from(err: Arc<PermissionError>) -> Self {
        ErrorEvent::PermissionError(err)
    }
}
