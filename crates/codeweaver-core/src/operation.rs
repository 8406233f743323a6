//! Operation kinds and write options.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of store operation a request performed.
///
/// Determines how a failure is described to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteOperationKind {
    Create,
    /// Reserved: reads are never fire-and-forget.
    Read,
    Update,
    Delete,
}

impl WriteOperationKind {
    /// Lowercase label used in messages and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteOperationKind::Create => "create",
            WriteOperationKind::Read => "read",
            WriteOperationKind::Update => "update",
            WriteOperationKind::Delete => "delete",
        }
    }
}

impl fmt::Display for WriteOperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a `set` treats an existing document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetOptions {
    /// Replace the whole document (creating it if missing).
    #[default]
    Overwrite,
    /// Merge the given fields into the existing document (creating it if missing).
    Merge,
}

impl SetOptions {
    /// The operation kind reported when a `set` with these options is rejected.
    ///
    /// An overwrite establishes the full document content and is reported as
    /// `Create`; a merge only touches the given fields and is reported as `Update`.
    pub fn operation_kind(&self) -> WriteOperationKind {
        match self {
            SetOptions::Overwrite => WriteOperationKind::Create,
            SetOptions::Merge => WriteOperationKind::Update,
        }
    }
}
