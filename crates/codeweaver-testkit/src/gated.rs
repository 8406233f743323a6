//! A store wrapper that lets tests hold writes in flight.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::{watch, Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};

use codeweaver_core::{CollectionRef, DocumentRef, Payload, SetOptions};
use codeweaver_store::{DocumentStore, Result, StoreError, StoredDocument};

/// Wraps a [`DocumentStore`] so tests can control when mutations complete.
///
/// - [`close`](Self::close) parks every later mutation until [`open`](Self::open).
/// - [`fail_writes`](Self::fail_writes) makes mutations fail with
///   [`StoreError::Unavailable`] regardless of the inner store's rules.
/// - Every mutation is recorded on entry, before it waits on the gate.
/// - Mutations pass the gate one at a time, in the order they arrived, so a
///   released backlog is applied in arrival order.
///
/// Reads pass straight through.
pub struct GatedStore<S> {
    inner: S,
    gate: watch::Sender<bool>,
    fail: AtomicBool,
    calls: Mutex<Vec<(&'static str, String)>>,
    turnstile: AsyncMutex<()>,
}

impl<S: DocumentStore> GatedStore<S> {
    /// Wrap `inner` with the gate open.
    pub fn new(inner: S) -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            inner,
            gate,
            fail: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
            turnstile: AsyncMutex::new(()),
        }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Hold mutations until [`open`](Self::open).
    pub fn close(&self) {
        self.gate.send_replace(false);
    }

    /// Release held mutations and stop holding new ones.
    pub fn open(&self) {
        self.gate.send_replace(true);
    }

    /// Make every mutation fail (or stop failing).
    pub fn fail_writes(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Mutations seen so far as `(operation, path)`, in arrival order.
    pub fn calls(&self) -> Vec<(&'static str, String)> {
        self.calls.lock().unwrap().clone()
    }

    /// Record the call, then wait for its turn and an open gate.
    ///
    /// The returned guard is held while the inner store runs the mutation.
    async fn enter(
        &self,
        operation: &'static str,
        path: String,
    ) -> Result<AsyncMutexGuard<'_, ()>> {
        self.calls.lock().unwrap().push((operation, path));
        let turn = self.turnstile.lock().await;

        let mut gate = self.gate.subscribe();
        // The sender lives as long as self, so this only ends once open.
        let _ = gate.wait_for(|open| *open).await;

        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled by test".into()));
        }
        Ok(turn)
    }
}

#[async_trait]
impl<S: DocumentStore> DocumentStore for GatedStore<S> {
    async fn create(&self, collection: &CollectionRef, data: &Payload) -> Result<DocumentRef> {
        let _turn = self.enter("create", collection.to_string()).await?;
        self.inner.create(collection, data).await
    }

    async fn set(&self, doc: &DocumentRef, data: &Payload, options: SetOptions) -> Result<()> {
        let _turn = self.enter("set", doc.to_string()).await?;
        self.inner.set(doc, data, options).await
    }

    async fn update(&self, doc: &DocumentRef, data: &Payload) -> Result<()> {
        let _turn = self.enter("update", doc.to_string()).await?;
        self.inner.update(doc, data).await
    }

    async fn delete(&self, doc: &DocumentRef) -> Result<()> {
        let _turn = self.enter("delete", doc.to_string()).await?;
        self.inner.delete(doc).await
    }

    async fn get(&self, doc: &DocumentRef) -> Result<Option<StoredDocument>> {
        self.inner.get(doc).await
    }
}
