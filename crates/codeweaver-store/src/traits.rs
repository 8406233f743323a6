//! DocumentStore trait: the abstract interface for document persistence.
//!
//! Everything above the store (the non-blocking writer, the image catalog)
//! is written against this trait. Implementations include an in-memory
//! store and SQLite.

use async_trait::async_trait;
use codeweaver_core::{CollectionRef, DocumentRef, Payload, SetOptions};
use rand::distributions::{Alphanumeric, DistString};

use crate::error::Result;

/// Length of store-assigned document ids.
pub const AUTO_ID_LEN: usize = 20;

/// A document as held by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    /// Where the document lives.
    pub reference: DocumentRef,
    /// Field data, with server timestamps already resolved.
    pub data: Payload,
    /// When the document was first written (Unix ms).
    pub create_time: i64,
    /// When the document was last written (Unix ms).
    pub update_time: i64,
}

/// The DocumentStore trait: async interface for document persistence.
///
/// Every mutation either succeeds or fails with a [`StoreError`](crate::StoreError).
/// Callers above the store treat all failures alike.
///
/// # Design Notes
///
/// - **Server timestamps**: `ServerTimestamp` placeholders are resolved to the
///   store clock when the write is applied.
/// - **Access rules**: each mutation is checked against the store's rules
///   before it is applied; rejections are `PermissionDenied`.
/// - **Idempotent delete**: deleting a missing document succeeds if the rules allow it.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Add a new document to `collection` under a store-assigned id.
    async fn create(&self, collection: &CollectionRef, data: &Payload) -> Result<DocumentRef>;

    /// Write `doc`, replacing or merging per `options`. Creates it if missing.
    async fn set(&self, doc: &DocumentRef, data: &Payload, options: SetOptions) -> Result<()>;

    /// Merge `data` into an existing document. Fails with `NotFound` if missing.
    async fn update(&self, doc: &DocumentRef, data: &Payload) -> Result<()>;

    /// Remove `doc`.
    async fn delete(&self, doc: &DocumentRef) -> Result<()>;

    /// Read `doc`.
    async fn get(&self, doc: &DocumentRef) -> Result<Option<StoredDocument>>;
}

/// Generate a store-assigned document id.
pub fn auto_id() -> String {
    Alphanumeric.sample_string(&mut rand::thread_rng(), AUTO_ID_LEN)
}

/// Get current time in milliseconds.
pub(crate) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
