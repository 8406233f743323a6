//! The Weaver: one store, one bus, one writer.
//!
//! Builds the write facade and the image catalog over a single store and
//! hands out the bus so any component can subscribe to rejected writes.

use std::sync::Arc;

use codeweaver_bus::{ErrorBus, LoggingListener};
use codeweaver_core::{CollectionRef, DocumentRef, Payload, SetOptions};
use codeweaver_store::DocumentStore;
use codeweaver_writes::{NonBlockingWriter, PendingWrite};

use crate::config::WeaverConfig;
use crate::error::Result;
use crate::images::ImageCatalog;

/// The main Weaver struct.
///
/// Provides a unified API for:
/// - Initiating writes without waiting on the store
/// - Subscribing to rejected writes
/// - Recording and looking up image metadata
pub struct Weaver<S: DocumentStore + 'static> {
    writer: NonBlockingWriter<S>,
    images: ImageCatalog<S>,
    config: WeaverConfig,
    /// Kept alive for its subscription.
    _logger: Option<LoggingListener>,
}

impl<S: DocumentStore + 'static> Weaver<S> {
    /// Create a weaver with a fresh bus.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(store: S, config: WeaverConfig) -> Result<Self> {
        Self::with_bus(Arc::new(store), ErrorBus::new(), config)
    }

    /// Create a weaver over a shared store, publishing on `bus`.
    pub fn with_bus(store: Arc<S>, bus: ErrorBus, config: WeaverConfig) -> Result<Self> {
        let images_collection = config.images_collection()?;
        let writer = NonBlockingWriter::spawn(store, bus)?;
        let images = ImageCatalog::new(writer.clone(), images_collection);
        let logger = config
            .log_permission_errors
            .then(|| LoggingListener::attach(writer.bus()));

        tracing::debug!(
            images = %images.collection(),
            logging = config.log_permission_errors,
            "weaver ready"
        );

        Ok(Self {
            writer,
            images,
            config,
            _logger: logger,
        })
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        self.writer.store()
    }

    /// The bus rejected writes are published on.
    pub fn bus(&self) -> &ErrorBus {
        self.writer.bus()
    }

    pub fn writer(&self) -> &NonBlockingWriter<S> {
        &self.writer
    }

    pub fn images(&self) -> &ImageCatalog<S> {
        &self.images
    }

    pub fn config(&self) -> &WeaverConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Write Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// See [`NonBlockingWriter::initiate_create`].
    pub fn initiate_create(
        &self,
        collection: &CollectionRef,
        data: Payload,
    ) -> PendingWrite<DocumentRef> {
        self.writer.initiate_create(collection, data)
    }

    /// See [`NonBlockingWriter::initiate_set`].
    pub fn initiate_set(
        &self,
        doc: &DocumentRef,
        data: Payload,
        options: SetOptions,
    ) -> PendingWrite<()> {
        self.writer.initiate_set(doc, data, options)
    }

    /// See [`NonBlockingWriter::initiate_update`].
    pub fn initiate_update(&self, doc: &DocumentRef, data: Payload) -> PendingWrite<()> {
        self.writer.initiate_update(doc, data)
    }

    /// See [`NonBlockingWriter::initiate_delete`].
    pub fn initiate_delete(&self, doc: &DocumentRef) -> PendingWrite<()> {
        self.writer.initiate_delete(doc)
    }

    /// Wait until every write initiated so far has settled.
    pub async fn flush(&self) {
        self.writer.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeweaver_bus::EventKind;
    use codeweaver_store::MemoryStore;
    use codeweaver_testkit::RecordingListener;

    use crate::error::WeaverError;

    #[tokio::test]
    async fn test_logging_listener_follows_config() {
        let weaver = Weaver::new(MemoryStore::new(), WeaverConfig::default()).unwrap();
        assert_eq!(weaver.bus().subscriber_count(EventKind::PermissionError), 1);

        let quiet = WeaverConfig {
            log_permission_errors: false,
            ..Default::default()
        };
        let weaver = Weaver::new(MemoryStore::new(), quiet).unwrap();
        assert_eq!(weaver.bus().subscriber_count(EventKind::PermissionError), 0);
    }

    #[tokio::test]
    async fn test_dropping_weaver_detaches_logger() {
        let bus = ErrorBus::new();
        let weaver =
            Weaver::with_bus(Arc::new(MemoryStore::new()), bus.clone(), WeaverConfig::default())
                .unwrap();
        assert_eq!(bus.subscriber_count(EventKind::PermissionError), 1);
        drop(weaver);
        assert_eq!(bus.subscriber_count(EventKind::PermissionError), 0);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let config = WeaverConfig {
            images_collection: "images/doc1".into(),
            ..Default::default()
        };
        assert!(matches!(
            Weaver::new(MemoryStore::new(), config),
            Err(WeaverError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_requires_runtime() {
        assert!(matches!(
            Weaver::new(MemoryStore::new(), WeaverConfig::default()),
            Err(WeaverError::Write(_))
        ));
    }

    #[tokio::test]
    async fn test_custom_images_collection() {
        let config = WeaverConfig {
            images_collection: "users/alice/images".into(),
            log_permission_errors: false,
        };
        let weaver = Weaver::new(MemoryStore::new(), config).unwrap();
        let mut listener = RecordingListener::attach(weaver.bus());

        weaver
            .images()
            .add_image_metadata(None, crate::ImageUpload::new("a.png", "https://cdn/a.png"));
        let err = listener.recv().await.unwrap();
        assert_eq!(err.resource_path(), "users/alice/images");
    }
}
