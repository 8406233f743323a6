//! NonBlockingWriter - fire-and-forget writes with published failures.
//!
//! Each `initiate_*` call hands a write request to a dispatch task and
//! returns a [`PendingWrite`] straight away. The caller never waits for the
//! store and never sees a store error. If the store rejects the write, the
//! dispatch task builds a [`PermissionError`] from the call's inputs and
//! publishes it on the [`ErrorBus`].
//!
//! ```text
//! caller ──initiate_*──► queue ──► dispatch task ──► DocumentStore
//!   ▲                                   │
//!   └── PendingWrite (optional await)   └── on rejection ──► ErrorBus ──► listeners
//! ```
//!
//! # Ordering
//!
//! Requests start in the order they were initiated, so two writes to the same
//! document reach the store in call order. They run concurrently once
//! started and settle in whatever order the store finishes them.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, Notify};

use codeweaver_bus::ErrorBus;
use codeweaver_core::{
    CollectionRef, DocumentRef, Payload, PermissionError, PermissionErrorContext, SetOptions,
};
use codeweaver_store::{DocumentStore, StoreError};

use crate::error::{Result, WriteError};
use crate::pending::PendingWrite;

/// A write intent queued for the dispatch task.
enum WriteRequest {
    Create {
        collection: CollectionRef,
        data: Payload,
        reply: oneshot::Sender<Option<DocumentRef>>,
    },
    Set {
        doc: DocumentRef,
        data: Payload,
        options: SetOptions,
        reply: oneshot::Sender<Option<()>>,
    },
    Update {
        doc: DocumentRef,
        data: Payload,
        reply: oneshot::Sender<Option<()>>,
    },
    Delete {
        doc: DocumentRef,
        reply: oneshot::Sender<Option<()>>,
    },
}

/// Counts writes between initiation and settlement.
#[derive(Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

impl InFlight {
    fn start(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    fn finish(&self) {
        if self.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// Write facade over a [`DocumentStore`].
///
/// Cloning is cheap; clones share the store, the bus, and the dispatch task.
/// The dispatch task finishes outstanding writes and exits once every clone
/// has been dropped.
pub struct NonBlockingWriter<S: DocumentStore + 'static> {
    store: Arc<S>,
    bus: ErrorBus,
    requests: mpsc::UnboundedSender<WriteRequest>,
    in_flight: Arc<InFlight>,
}

impl<S: DocumentStore + 'static> NonBlockingWriter<S> {
    /// Start a writer whose dispatch task runs on the current tokio runtime.
    pub fn spawn(store: Arc<S>, bus: ErrorBus) -> Result<Self> {
        let handle = Handle::try_current().map_err(|_| WriteError::NoRuntime)?;
        Ok(Self::spawn_on(store, bus, &handle))
    }

    /// Start a writer whose dispatch task runs on `handle`.
    pub fn spawn_on(store: Arc<S>, bus: ErrorBus, handle: &Handle) -> Self {
        let (requests, rx) = mpsc::unbounded_channel();
        let in_flight = Arc::new(InFlight::default());

        handle.spawn(dispatch(
            Arc::clone(&store),
            bus.clone(),
            rx,
            Arc::clone(&in_flight),
        ));

        Self {
            store,
            bus,
            requests,
            in_flight,
        }
    }

    /// The store writes are sent to.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The bus failures are published on.
    pub fn bus(&self) -> &ErrorBus {
        &self.bus
    }

    /// Add a document to `collection`.
    ///
    /// On rejection publishes `{path: collection, operation: Create, payload: data}`.
    pub fn initiate_create(
        &self,
        collection: &CollectionRef,
        data: Payload,
    ) -> PendingWrite<DocumentRef> {
        let (reply, pending) = PendingWrite::channel();
        tracing::debug!(path = %collection, operation = "create", "write initiated");
        self.enqueue(WriteRequest::Create {
            collection: collection.clone(),
            data,
            reply,
        });
        pending
    }

    /// Write `doc` per `options`.
    ///
    /// On rejection publishes `{path: doc, operation: options.operation_kind(), payload: data}`.
    pub fn initiate_set(
        &self,
        doc: &DocumentRef,
        data: Payload,
        options: SetOptions,
    ) -> PendingWrite<()> {
        let (reply, pending) = PendingWrite::channel();
        tracing::debug!(path = %doc, operation = "set", ?options, "write initiated");
        self.enqueue(WriteRequest::Set {
            doc: doc.clone(),
            data,
            options,
            reply,
        });
        pending
    }

    /// Merge `data` into `doc`.
    ///
    /// On rejection publishes `{path: doc, operation: Update, payload: data}`.
    pub fn initiate_update(&self, doc: &DocumentRef, data: Payload) -> PendingWrite<()> {
        let (reply, pending) = PendingWrite::channel();
        tracing::debug!(path = %doc, operation = "update", "write initiated");
        self.enqueue(WriteRequest::Update {
            doc: doc.clone(),
            data,
            reply,
        });
        pending
    }

    /// Remove `doc`.
    ///
    /// On rejection publishes `{path: doc, operation: Delete}` with no payload.
    pub fn initiate_delete(&self, doc: &DocumentRef) -> PendingWrite<()> {
        let (reply, pending) = PendingWrite::channel();
        tracing::debug!(path = %doc, operation = "delete", "write initiated");
        self.enqueue(WriteRequest::Delete {
            doc: doc.clone(),
            reply,
        });
        pending
    }

    /// Number of writes initiated but not yet settled.
    pub fn in_flight(&self) -> usize {
        self.in_flight.count.load(Ordering::SeqCst)
    }

    /// Wait until every initiated write has settled.
    pub async fn flush(&self) {
        loop {
            let idle = self.in_flight.idle.notified();
            if self.in_flight() == 0 {
                return;
            }
            idle.await;
        }
    }

    fn enqueue(&self, request: WriteRequest) {
        self.in_flight.start();
        if self.requests.send(request).is_err() {
            // The reply sender was dropped with the request, so the handle
            // resolves to None. Nothing is published: the store never saw it.
            self.in_flight.finish();
            tracing::warn!("write dispatcher has stopped; write dropped");
        }
    }
}

impl<S: DocumentStore + 'static> Clone for NonBlockingWriter<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            bus: self.bus.clone(),
            requests: self.requests.clone(),
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

/// The dispatch loop: start requests in arrival order, drive them together.
async fn dispatch<S: DocumentStore + 'static>(
    store: Arc<S>,
    bus: ErrorBus,
    mut requests: mpsc::UnboundedReceiver<WriteRequest>,
    in_flight: Arc<InFlight>,
) {
    let mut running: FuturesUnordered<BoxFuture<'static, ()>> = FuturesUnordered::new();

    loop {
        tokio::select! {
            biased;
            request = requests.recv() => match request {
                Some(request) => {
                    let work = execute(Arc::clone(&store), bus.clone(), request);
                    let in_flight = Arc::clone(&in_flight);
                    running.push(
                        async move {
                            work.await;
                            in_flight.finish();
                        }
                        .boxed(),
                    );
                }
                None => break,
            },
            Some(()) = running.next(), if !running.is_empty() => {}
        }
    }

    // Every writer is gone; finish what was started.
    while running.next().await.is_some() {}
    tracing::debug!("write dispatcher stopped");
}

/// Run one request against the store and settle it.
async fn execute<S: DocumentStore + 'static>(store: Arc<S>, bus: ErrorBus, request: WriteRequest) {
    match request {
        WriteRequest::Create {
            collection,
            data,
            reply,
        } => {
            let outcome = store.create(&collection, &data).await;
            let settled = settle(&bus, outcome, || {
                PermissionErrorContext::create(&collection, data)
            });
            let _ = reply.send(settled);
        }
        WriteRequest::Set {
            doc,
            data,
            options,
            reply,
        } => {
            let outcome = store.set(&doc, &data, options).await;
            let settled = settle(&bus, outcome, || {
                PermissionErrorContext::set(&doc, data, options)
            });
            let _ = reply.send(settled);
        }
        WriteRequest::Update { doc, data, reply } => {
            let outcome = store.update(&doc, &data).await;
            let settled = settle(&bus, outcome, || PermissionErrorContext::update(&doc, data));
            let _ = reply.send(settled);
        }
        WriteRequest::Delete { doc, reply } => {
            let outcome = store.delete(&doc).await;
            let settled = settle(&bus, outcome, || PermissionErrorContext::delete(&doc));
            let _ = reply.send(settled);
        }
    }
}

/// Publish on failure before the outcome is handed back, so anyone awaiting
/// the handle observes the publication already done.
fn settle<T>(
    bus: &ErrorBus,
    outcome: std::result::Result<T, StoreError>,
    context: impl FnOnce() -> PermissionErrorContext,
) -> Option<T> {
    match outcome {
        Ok(value) => Some(value),
        Err(e) => {
            let err = PermissionError::new(context());
            tracing::debug!(
                path = err.resource_path(),
                operation = %err.operation(),
                store_error = %e,
                "write rejected"
            );
            let delivered = bus.publish(err);
            tracing::trace!(delivered, "permission error published");
            None
        }
    }
}
