//! In-memory implementation of the DocumentStore trait.
//!
//! This backs tests and the default wiring. It has the same semantics as
//! SQLite but keeps everything in memory with no persistence.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use codeweaver_core::{
    CollectionRef, DocumentPath, DocumentRef, Payload, SetOptions, Uid, WriteOperationKind,
};

use crate::error::Result;
use crate::rules::{authorize, AccessRequest, AccessRules, AllowAll, AuthState};
use crate::traits::{auto_id, now_millis, DocumentStore, StoredDocument};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
    rules: Box<dyn AccessRules>,
    auth: AuthState,
}

struct MemoryStoreInner {
    /// Documents indexed by full path.
    documents: BTreeMap<DocumentPath, StoredDocument>,
}

impl MemoryStore {
    /// Create a new empty store that allows every request.
    pub fn new() -> Self {
        Self::with_rules(AllowAll)
    }

    /// Create a new empty store guarded by `rules`.
    pub fn with_rules(rules: impl AccessRules + 'static) -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner {
                documents: BTreeMap::new(),
            }),
            rules: Box::new(rules),
            auth: AuthState::new(),
        }
    }

    /// Present `uid` to the access rules on subsequent requests.
    pub fn sign_in(&self, uid: Uid) {
        self.auth.set(Some(uid));
    }

    /// Drop the current identity.
    pub fn sign_out(&self) {
        self.auth.set(None);
    }

    /// The identity presented to the access rules.
    pub fn identity(&self) -> Option<Uid> {
        self.auth.current()
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All documents directly inside `collection`, ordered by id.
    pub fn list(&self, collection: &CollectionRef) -> Vec<StoredDocument> {
        let inner = self.inner.read().unwrap();
        inner
            .documents
            .values()
            .filter(|doc| &doc.reference.parent() == collection)
            .cloned()
            .collect()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create(&self, collection: &CollectionRef, data: &Payload) -> Result<DocumentRef> {
        let caller = self.auth.current();
        let mut inner = self.inner.write().unwrap();

        // Retry on the (unlikely) id collision
        let doc = loop {
            let candidate = collection.doc(&auto_id())?;
            if !inner.documents.contains_key(candidate.path()) {
                break candidate;
            }
        };

        authorize(
            &*self.rules,
            &AccessRequest {
                path: doc.path(),
                operation: WriteOperationKind::Create,
                incoming: Some(data),
                existing: None,
                caller: caller.as_ref(),
            },
        )?;

        let now = now_millis();
        inner.documents.insert(
            doc.path().clone(),
            StoredDocument {
                reference: doc.clone(),
                data: data.resolve_server_timestamps(now),
                create_time: now,
                update_time: now,
            },
        );

        Ok(doc)
    }

    async fn set(&self, doc: &DocumentRef, data: &Payload, options: SetOptions) -> Result<()> {
        let caller = self.auth.current();
        let mut inner = self.inner.write().unwrap();
        let existing = inner.documents.get(doc.path());

        let operation = if existing.is_some() {
            WriteOperationKind::Update
        } else {
            WriteOperationKind::Create
        };
        authorize(
            &*self.rules,
            &AccessRequest {
                path: doc.path(),
                operation,
                incoming: Some(data),
                existing: existing.map(|d| &d.data),
                caller: caller.as_ref(),
            },
        )?;

        let now = now_millis();
        let incoming = data.resolve_server_timestamps(now);
        let (create_time, data) = match (existing, options) {
            (Some(current), SetOptions::Merge) => {
                let mut merged = current.data.clone();
                merged.merge(&incoming);
                (current.create_time, merged)
            }
            (Some(current), SetOptions::Overwrite) => (current.create_time, incoming),
            (None, _) => (now, incoming),
        };

        inner.documents.insert(
            doc.path().clone(),
            StoredDocument {
                reference: doc.clone(),
                data,
                create_time,
                update_time: now,
            },
        );

        Ok(())
    }

    async fn update(&self, doc: &DocumentRef, data: &Payload) -> Result<()> {
        let caller = self.auth.current();
        let mut inner = self.inner.write().unwrap();

        authorize(
            &*self.rules,
            &AccessRequest {
                path: doc.path(),
                operation: WriteOperationKind::Update,
                incoming: Some(data),
                existing: inner.documents.get(doc.path()).map(|d| &d.data),
                caller: caller.as_ref(),
            },
        )?;

        let Some(current) = inner.documents.get_mut(doc.path()) else {
            return Err(crate::StoreError::NotFound(doc.to_string()));
        };

        let now = now_millis();
        current.data.merge(&data.resolve_server_timestamps(now));
        current.update_time = now;

        Ok(())
    }

    async fn delete(&self, doc: &DocumentRef) -> Result<()> {
        let caller = self.auth.current();
        let mut inner = self.inner.write().unwrap();

        authorize(
            &*self.rules,
            &AccessRequest {
                path: doc.path(),
                operation: WriteOperationKind::Delete,
                incoming: None,
                existing: inner.documents.get(doc.path()).map(|d| &d.data),
                caller: caller.as_ref(),
            },
        )?;

        inner.documents.remove(doc.path());
        Ok(())
    }

    async fn get(&self, doc: &DocumentRef) -> Result<Option<StoredDocument>> {
        let caller = self.auth.current();
        let inner = self.inner.read().unwrap();
        let existing = inner.documents.get(doc.path());

        authorize(
            &*self.rules,
            &AccessRequest {
                path: doc.path(),
                operation: WriteOperationKind::Read,
                incoming: None,
                existing: existing.map(|d| &d.data),
                caller: caller.as_ref(),
            },
        )?;

        Ok(existing.cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::rules::{DenyAll, OwnerRules};
    use codeweaver_core::FieldValue;

    fn images() -> CollectionRef {
        CollectionRef::new("images").unwrap()
    }

    #[tokio::test]
    async fn test_memory_store_create_and_get() {
        let store = MemoryStore::new();
        let data = Payload::new()
            .with("fileName", "a.png")
            .with("createdAt", FieldValue::ServerTimestamp);

        let doc = store.create(&images(), &data).await.unwrap();
        assert_eq!(doc.parent(), images());

        let stored = store.get(&doc).await.unwrap().unwrap();
        assert_eq!(stored.data.get_str("fileName"), Some("a.png"));
        // Server timestamps are resolved on write
        assert!(!stored.data.has_server_timestamp());
        assert_eq!(
            stored.data.get("createdAt").and_then(FieldValue::as_timestamp),
            Some(stored.create_time)
        );
    }

    #[tokio::test]
    async fn test_memory_store_set_merge_and_overwrite() {
        let store = MemoryStore::new();
        let doc = images().doc("doc1").unwrap();

        store
            .set(&doc, &Payload::new().with("a", 1).with("b", 2), SetOptions::Overwrite)
            .await
            .unwrap();
        store
            .set(&doc, &Payload::new().with("b", 3), SetOptions::Merge)
            .await
            .unwrap();
        let merged = store.get(&doc).await.unwrap().unwrap();
        assert_eq!(merged.data, Payload::new().with("a", 1).with("b", 3));

        store
            .set(&doc, &Payload::new().with("c", 4), SetOptions::Overwrite)
            .await
            .unwrap();
        let replaced = store.get(&doc).await.unwrap().unwrap();
        assert_eq!(replaced.data, Payload::new().with("c", 4));
        assert_eq!(replaced.create_time, merged.create_time);
    }

    #[tokio::test]
    async fn test_memory_store_update_missing_is_not_found() {
        let store = MemoryStore::new();
        let doc = images().doc("missing").unwrap();
        let err = store
            .update(&doc, &Payload::new().with("a", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_memory_store_delete_is_idempotent() {
        let store = MemoryStore::new();
        let doc = images().doc("doc1").unwrap();
        store
            .set(&doc, &Payload::new().with("a", 1), SetOptions::default())
            .await
            .unwrap();

        store.delete(&doc).await.unwrap();
        store.delete(&doc).await.unwrap();
        assert!(store.get(&doc).await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_deny_all() {
        let store = MemoryStore::with_rules(DenyAll);
        let err = store
            .create(&images(), &Payload::new().with("a", 1))
            .await
            .unwrap_err();
        assert!(err.is_permission_denied());
        assert!(store.is_empty());
        // Reads still go through
        assert!(store.get(&images().doc("x").unwrap()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_store_owner_rules() {
        let store = MemoryStore::with_rules(OwnerRules::new("images", "ownerUid"));
        let data = Payload::new().with("ownerUid", "alice");

        // Anonymous create is rejected
        assert!(store.create(&images(), &data).await.unwrap_err().is_permission_denied());

        store.sign_in(Uid::new("alice"));
        let doc = store.create(&images(), &data).await.unwrap();

        store.sign_in(Uid::new("bob"));
        assert!(store.delete(&doc).await.unwrap_err().is_permission_denied());

        store.sign_in(Uid::new("alice"));
        store.delete(&doc).await.unwrap();
    }

    #[tokio::test]
    async fn test_memory_store_list() {
        let store = MemoryStore::new();
        store.create(&images(), &Payload::new()).await.unwrap();
        store.create(&images(), &Payload::new()).await.unwrap();
        store
            .create(&CollectionRef::new("captions").unwrap(), &Payload::new())
            .await
            .unwrap();

        assert_eq!(store.list(&images()).len(), 2);
        assert_eq!(store.len(), 3);
    }
}
