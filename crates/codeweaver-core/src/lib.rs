//! # Codeweaver Core
//!
//! Pure primitives for codeweaver: store locations, typed payloads, and the
//! permission error that describes a rejected write.
//!
//! This crate contains no I/O, no storage, no async. It is plain data.
//!
//! ## Key Types
//!
//! - [`CollectionRef`] / [`DocumentRef`] - Validated store locations
//! - [`Payload`] / [`FieldValue`] - Ordered, tagged field mappings
//! - [`WriteOperationKind`] - What a request tried to do
//! - [`PermissionErrorContext`] / [`PermissionError`] - A rejected write

pub mod error;
pub mod operation;
pub mod permission;
pub mod types;
pub mod value;

pub use error::{CoreError, Result};
pub use operation::{SetOptions, WriteOperationKind};
pub use permission::{PermissionError, PermissionErrorContext};
pub use types::{CollectionRef, DocumentPath, DocumentRef, Uid};
pub use value::{FieldValue, Payload};
