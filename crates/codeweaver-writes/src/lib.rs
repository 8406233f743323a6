//! # Codeweaver Writes
//!
//! Non-blocking document writes. Callers initiate a write and move on; the
//! write runs in the background and, if the store rejects it, a structured
//! [`PermissionError`](codeweaver_core::PermissionError) describing the
//! attempt is published on the [`ErrorBus`](codeweaver_bus::ErrorBus).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use codeweaver_bus::ErrorBus;
//! use codeweaver_core::{CollectionRef, Payload};
//! use codeweaver_store::MemoryStore;
//! use codeweaver_writes::NonBlockingWriter;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let bus = ErrorBus::new();
//! bus.on_permission_error(|err| eprintln!("denied: {}", err.resource_path()));
//!
//! let writer = NonBlockingWriter::spawn(Arc::new(MemoryStore::new()), bus)?;
//! let images = CollectionRef::new("images")?;
//!
//! // Returns immediately.
//! let pending = writer.initiate_create(&images, Payload::new().with("fileName", "a.png"));
//!
//! // Optional: wait for the new reference.
//! if let Some(doc) = pending.await {
//!     println!("created {doc}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod pending;
pub mod writer;

pub use error::{Result, WriteError};
pub use pending::PendingWrite;
pub use writer::NonBlockingWriter;
