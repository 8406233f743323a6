//! Image metadata: identity-checked creates and lookups by id.
//!
//! Uploaders record where an image lives with
//! [`add_image_metadata`](ImageCatalog::add_image_metadata), which goes
//! through the non-blocking writer like any other write. Without a
//! signed-in identity the request is refused before it reaches the store,
//! and the refusal is published on the bus exactly as a store rejection
//! would be.

use codeweaver_core::{
    CollectionRef, DocumentRef, FieldValue, Payload, PermissionError, PermissionErrorContext, Uid,
};
use codeweaver_store::{DocumentStore, StoredDocument};
use codeweaver_writes::{NonBlockingWriter, PendingWrite};

use crate::error::{Result, WeaverError};

pub const FIELD_FILE_NAME: &str = "fileName";
pub const FIELD_DOWNLOAD_URL: &str = "downloadURL";
pub const FIELD_CREATED_AT: &str = "createdAt";
pub const FIELD_OWNER_UID: &str = "ownerUid";

/// What an uploader knows about a freshly uploaded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub download_url: String,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, download_url: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            download_url: download_url.into(),
        }
    }

    /// The fields the caller supplied, without anything the catalog adds.
    fn fields(&self) -> Payload {
        Payload::new()
            .with(FIELD_FILE_NAME, self.file_name.as_str())
            .with(FIELD_DOWNLOAD_URL, self.download_url.as_str())
    }
}

/// A stored image metadata document.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    pub reference: DocumentRef,
    pub file_name: String,
    pub download_url: String,
    /// Creation time in Unix ms, once the store has resolved it.
    pub created_at: Option<i64>,
    pub owner_uid: Option<Uid>,
}

impl ImageRecord {
    /// The document id.
    pub fn id(&self) -> &str {
        self.reference.id()
    }

    fn from_stored(doc: StoredDocument) -> Result<Self> {
        let required = |field: &str| {
            doc.data
                .get_str(field)
                .map(str::to_string)
                .ok_or_else(|| WeaverError::InvalidRecord {
                    path: doc.reference.to_string(),
                    reason: format!("missing string field {field:?}"),
                })
        };
        let file_name = required(FIELD_FILE_NAME)?;
        let download_url = required(FIELD_DOWNLOAD_URL)?;

        Ok(Self {
            file_name,
            download_url,
            created_at: doc.data.get(FIELD_CREATED_AT).and_then(FieldValue::as_timestamp),
            owner_uid: doc.data.get_str(FIELD_OWNER_UID).map(Uid::new),
            reference: doc.reference,
        })
    }
}

/// Image metadata on top of a [`NonBlockingWriter`].
pub struct ImageCatalog<S: DocumentStore + 'static> {
    writer: NonBlockingWriter<S>,
    collection: CollectionRef,
}

impl<S: DocumentStore + 'static> ImageCatalog<S> {
    pub fn new(writer: NonBlockingWriter<S>, collection: CollectionRef) -> Self {
        Self { writer, collection }
    }

    /// The collection image documents live in.
    pub fn collection(&self) -> &CollectionRef {
        &self.collection
    }

    /// Record an uploaded image, owned by `identity`.
    ///
    /// Returns immediately. With no identity nothing is sent to the store: a
    /// create rejection carrying the upload's fields is published at once
    /// and the handle resolves to `None`.
    pub fn add_image_metadata(
        &self,
        identity: Option<&Uid>,
        upload: ImageUpload,
    ) -> PendingWrite<DocumentRef> {
        let Some(uid) = identity else {
            let context = PermissionErrorContext::create(&self.collection, upload.fields());
            tracing::debug!(
                path = %self.collection,
                file_name = %upload.file_name,
                "image metadata refused: no signed-in identity"
            );
            self.writer.bus().publish(PermissionError::new(context));
            return PendingWrite::rejected();
        };

        let data = upload
            .fields()
            .with(FIELD_CREATED_AT, FieldValue::ServerTimestamp)
            .with(FIELD_OWNER_UID, uid.as_str());
        self.writer.initiate_create(&self.collection, data)
    }

    /// Look up an image by document id.
    pub async fn image(&self, id: &str) -> Result<Option<ImageRecord>> {
        let doc = self.collection.doc(id)?;
        match self.writer.store().get(&doc).await? {
            Some(stored) => ImageRecord::from_stored(stored).map(Some),
            None => Ok(None),
        }
    }

    /// Look up just the download URL of an image.
    pub async fn image_url(&self, id: &str) -> Result<Option<String>> {
        Ok(self.image(id).await?.map(|record| record.download_url))
    }
}

impl<S: DocumentStore + 'static> Clone for ImageCatalog<S> {
    fn clone(&self) -> Self {
        Self {
            writer: self.writer.clone(),
            collection: self.collection.clone(),
        }
    }
}
