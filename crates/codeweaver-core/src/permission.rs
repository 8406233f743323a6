//! The permission error: uniform representation of a rejected write.
//!
//! Every rejected write, whatever the store's reason, is described by the
//! location it targeted, the kind of operation, and the payload it tried to
//! write. Contexts are built from the caller's inputs, never from store
//! error details.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{CoreError, Result};
use crate::operation::{SetOptions, WriteOperationKind};
use crate::types::{CollectionRef, DocumentRef};
use crate::value::Payload;

/// Immutable description of a rejected request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionErrorContext {
    resource_path: String,
    operation: WriteOperationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    attempted_payload: Option<Payload>,
}

impl PermissionErrorContext {
    /// Build a context from raw parts.
    ///
    /// Fails if `resource_path` is empty.
    pub fn new(
        resource_path: impl Into<String>,
        operation: WriteOperationKind,
        attempted_payload: Option<Payload>,
    ) -> Result<Self> {
        let resource_path = resource_path.into();
        if resource_path.trim().is_empty() {
            return Err(CoreError::EmptyPath);
        }
        Ok(Self {
            resource_path,
            operation,
            attempted_payload,
        })
    }

    /// Context for a rejected create in `collection`.
    pub fn create(collection: &CollectionRef, data: Payload) -> Self {
        Self::for_path(collection.path().as_str(), WriteOperationKind::Create, Some(data))
    }

    /// Context for a rejected set on `doc`.
    pub fn set(doc: &DocumentRef, data: Payload, options: SetOptions) -> Self {
        Self::for_path(doc.path().as_str(), options.operation_kind(), Some(data))
    }

    /// Context for a rejected update on `doc`.
    pub fn update(doc: &DocumentRef, data: Payload) -> Self {
        Self::for_path(doc.path().as_str(), WriteOperationKind::Update, Some(data))
    }

    /// Context for a rejected delete of `doc`. Deletes carry no payload.
    pub fn delete(doc: &DocumentRef) -> Self {
        Self::for_path(doc.path().as_str(), WriteOperationKind::Delete, None)
    }

    // Validated refs are never empty.
    fn for_path(path: &str, operation: WriteOperationKind, data: Option<Payload>) -> Self {
        Self {
            resource_path: path.to_string(),
            operation,
            attempted_payload: data,
        }
    }

    pub fn resource_path(&self) -> &str {
        &self.resource_path
    }

    pub fn operation(&self) -> WriteOperationKind {
        self.operation
    }

    pub fn attempted_payload(&self) -> Option<&Payload> {
        self.attempted_payload.as_ref()
    }
}

/// A write rejected by the store.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct PermissionError {
    context: PermissionErrorContext,
    message: String,
}

impl PermissionError {
    /// Build the error and its fixed message from a context.
    pub fn new(context: PermissionErrorContext) -> Self {
        let message = format!(
            "Missing or insufficient permissions: the request to {} '{}' was denied",
            context.operation, context.resource_path
        );
        Self { context, message }
    }

    pub fn context(&self) -> &PermissionErrorContext {
        &self.context
    }

    pub fn resource_path(&self) -> &str {
        self.context.resource_path()
    }

    pub fn operation(&self) -> WriteOperationKind {
        self.context.operation()
    }

    pub fn attempted_payload(&self) -> Option<&Payload> {
        self.context.attempted_payload()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The context rendered as pretty JSON, for diagnostics.
    pub fn request_json(&self) -> String {
        serde_json::to_string_pretty(&self.context).unwrap_or_else(|e| e.to_string())
    }
}

impl From<PermissionErrorContext> for PermissionError {
    fn from(context: PermissionErrorContext) -> Self {
        Self::new(context)
    }
}
