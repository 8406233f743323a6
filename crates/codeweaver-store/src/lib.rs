//! # Codeweaver Store
//!
//! Storage abstraction for codeweaver. Provides a trait-based interface
//! for document persistence with SQLite and in-memory implementations,
//! guarded by pluggable access rules.
//!
//! ## Overview
//!
//! The store module abstracts document storage behind the [`DocumentStore`]
//! trait, so the write facade above it is storage-agnostic. [`MemoryStore`]
//! backs tests and the default wiring; [`SqliteStore`] persists to disk.
//!
//! ## Key Types
//!
//! - [`DocumentStore`] - The async trait for all storage operations
//! - [`MemoryStore`] - In-memory storage
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`AccessRules`] - Request authorization ([`AllowAll`], [`DenyAll`], [`OwnerRules`])
//! - [`StoredDocument`] - A document as held by the store
//!
//! ## Usage
//!
//! ```rust,no_run
//! use codeweaver_core::{CollectionRef, Payload};
//! use codeweaver_store::{DocumentStore, MemoryStore};
//!
//! async fn example() {
//!     let store = MemoryStore::new();
//!     let images = CollectionRef::new("images").unwrap();
//!     let doc = store
//!         .create(&images, &Payload::new().with("fileName", "a.png"))
//!         .await
//!         .unwrap();
//!     let stored = store.get(&doc).await.unwrap();
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Rules before writes**: every request is checked against [`AccessRules`] first
//! - **Server timestamps**: placeholders are resolved when the write is applied
//! - **Opaque failures**: callers above the store only learn that a write failed

pub mod error;
pub mod memory;
pub mod migration;
pub mod rules;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use rules::{AccessRequest, AccessRules, AllowAll, AuthState, Decision, DenyAll, OwnerRules};
pub use sqlite::SqliteStore;
pub use traits::{auto_id, DocumentStore, StoredDocument, AUTO_ID_LEN};
