//! # Codeweaver
//!
//! The unified API for codeweaver - non-blocking document writes whose
//! failures are published on a decoupled error bus.
//!
//! ## Overview
//!
//! - **Writes**: `initiate_*` calls return at once; the store call runs in
//!   the background
//! - **Error bus**: rejected writes are published as structured
//!   [`PermissionError`]s to every subscribed listener
//! - **Images**: identity-checked image metadata creates and lookups
//!
//! ## Key Concepts
//!
//! - **Fire-and-forget**: a caller never waits on, or sees, a store failure.
//! - **Permission error**: path, operation, and payload of a rejected write,
//!   built from the caller's inputs.
//! - **Listener**: any component that subscribed to the bus.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use codeweaver::{ImageUpload, Weaver, WeaverConfig};
//! use codeweaver::core::Uid;
//! use codeweaver::store::MemoryStore;
//!
//! async fn example() {
//!     let weaver = Weaver::new(MemoryStore::new(), WeaverConfig::default()).unwrap();
//!
//!     // Any component can listen
//!     weaver.bus().on_permission_error(|err| {
//!         eprintln!("{}", err.request_json());
//!     });
//!
//!     // Returns immediately
//!     let uid = Uid::new("alice");
//!     let pending = weaver
//!         .images()
//!         .add_image_metadata(Some(&uid), ImageUpload::new("a.png", "https://cdn/a.png"));
//!
//!     // Optionally wait for the new document
//!     let _doc = pending.await;
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `codeweaver::core` - Paths, payloads, permission errors
//! - `codeweaver::store` - Storage abstraction, access rules, SQLite
//! - `codeweaver::bus` - The error bus
//! - `codeweaver::writes` - The non-blocking writer

pub mod config;
pub mod error;
pub mod images;
pub mod weaver;

// Re-export component crates
pub use codeweaver_bus as bus;
pub use codeweaver_core as core;
pub use codeweaver_store as store;
pub use codeweaver_writes as writes;

// Re-export main types for convenience
pub use config::WeaverConfig;
pub use error::{Result, WeaverError};
pub use images::{ImageCatalog, ImageRecord, ImageUpload};
pub use weaver::Weaver;

// Re-export commonly used types
pub use codeweaver_bus::{ErrorBus, ErrorEvent, EventKind, SubscriptionHandle};
pub use codeweaver_core::{
    CollectionRef, DocumentRef, FieldValue, Payload, PermissionError, PermissionErrorContext,
    SetOptions, Uid, WriteOperationKind,
};
pub use codeweaver_writes::{NonBlockingWriter, PendingWrite};
