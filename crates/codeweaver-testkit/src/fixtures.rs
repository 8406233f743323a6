//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::{Arc, Once};

use codeweaver_bus::ErrorBus;
use codeweaver_core::{CollectionRef, DocumentRef, FieldValue, Payload, Uid};
use codeweaver_store::{AccessRules, AllowAll, DenyAll, MemoryStore, OwnerRules};

/// Collection used by the image fixtures.
pub const IMAGES: &str = "images";

/// Owner field guarded by [`TestFixture::owner_rules`].
pub const OWNER_FIELD: &str = "ownerUid";

/// A bus and an in-memory store, ready to be wired together.
pub struct TestFixture {
    pub bus: ErrorBus,
    pub store: Arc<MemoryStore>,
}

impl TestFixture {
    /// A fixture whose store allows everything.
    pub fn new() -> Self {
        Self::with_rules(AllowAll)
    }

    /// A fixture whose store rejects every mutation.
    pub fn denying() -> Self {
        Self::with_rules(DenyAll)
    }

    /// A fixture whose store guards [`IMAGES`] by [`OWNER_FIELD`].
    pub fn owner_rules() -> Self {
        Self::with_rules(OwnerRules::new(IMAGES, OWNER_FIELD))
    }

    /// A fixture with custom rules.
    pub fn with_rules(rules: impl AccessRules + 'static) -> Self {
        Self {
            bus: ErrorBus::new(),
            store: Arc::new(MemoryStore::with_rules(rules)),
        }
    }

    /// Sign the store in as `uid` and return the identity.
    pub fn sign_in(&self, uid: &str) -> Uid {
        let uid = Uid::new(uid);
        self.store.sign_in(uid.clone());
        uid
    }

    /// The images collection.
    pub fn images(&self) -> CollectionRef {
        collection(IMAGES)
    }

    /// A document in the images collection.
    pub fn image_doc(&self, id: &str) -> DocumentRef {
        document(&format!("{IMAGES}/{id}"))
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a collection path, panicking on invalid input.
pub fn collection(path: &str) -> CollectionRef {
    CollectionRef::new(path).unwrap_or_else(|e| panic!("bad collection path {path:?}: {e}"))
}

/// Parse a document path, panicking on invalid input.
pub fn document(path: &str) -> DocumentRef {
    DocumentRef::new(path).unwrap_or_else(|e| panic!("bad document path {path:?}: {e}"))
}

/// Image metadata as an uploader writes it, with a server-side creation time.
pub fn image_payload(file_name: &str, download_url: &str, owner: Option<&Uid>) -> Payload {
    let payload = Payload::new()
        .with("fileName", file_name)
        .with("downloadURL", download_url)
        .with("createdAt", FieldValue::ServerTimestamp);
    match owner {
        Some(uid) => payload.with(OWNER_FIELD, uid.as_str()),
        None => payload,
    }
}

/// Install a test-friendly tracing subscriber once per process.
///
/// Honors `RUST_LOG`; defaults to `warn`.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
