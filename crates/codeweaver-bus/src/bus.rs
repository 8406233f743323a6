//! ErrorBus - decoupled delivery of error events to listeners.
//!
//! Producers publish; any number of independently registered listeners
//! receive. Neither side knows about the other ahead of time.
//!
//! # Dispatch
//!
//! ```text
//! ┌─────────────┐  publish   ┌──────────┐  handler(&event)  ┌────────────┐
//! │ Write       │ ─────────► │ ErrorBus │ ────────────────► │ Listener 1 │
//! │ dispatcher  │            │          │ ────────────────► │ Listener 2 │
//! └─────────────┘            └──────────┘                   └────────────┘
//! ```
//!
//! - `publish` is synchronous: it returns once every handler ran.
//! - Handlers run over a snapshot taken when `publish` starts, so a handler
//!   may subscribe or unsubscribe (itself or others) without disturbing the
//!   dispatch in progress.
//! - A panicking handler is isolated: the panic is caught and logged and
//!   the remaining handlers still run.
//! - Publishing with no subscribers is a no-op.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use codeweaver_core::PermissionError;

use crate::event::{ErrorEvent, EventKind};

/// A registered event handler.
pub type Handler = Arc<dyn Fn(&ErrorEvent) + Send + Sync>;

/// Identifies one registration, for unsubscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    kind: EventKind,
    id: u64,
}

impl SubscriptionHandle {
    /// The event kind this registration listens to.
    pub fn kind(&self) -> EventKind {
        self.kind
    }
}

struct Subscriber {
    id: u64,
    handler: Handler,
}

#[derive(Default)]
struct BusInner {
    /// Subscribers per event kind, in registration order.
    subscribers: Mutex<HashMap<EventKind, Vec<Subscriber>>>,
    next_id: AtomicU64,
}

/// Typed publish/subscribe channel for error events.
///
/// Cloning is cheap and every clone shares the same registrations. Build one
/// at startup and pass it to every component that reports or observes
/// write failures.
#[derive(Clone, Default)]
pub struct ErrorBus {
    inner: Arc<BusInner>,
}

impl ErrorBus {
    /// Create a bus with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for every event of `kind`.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionHandle
    where
        F: Fn(&ErrorEvent) + Send + Sync + 'static,
    {
        self.subscribe_handler(kind, Arc::new(handler))
    }

    /// Register an already shared handler.
    pub fn subscribe_handler(&self, kind: EventKind, handler: Handler) -> SubscriptionHandle {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock()
            .entry(kind)
            .or_default()
            .push(Subscriber { id, handler });

        tracing::trace!(%kind, id, "subscribed");
        SubscriptionHandle { kind, id }
    }

    /// Register a handler that receives only permission errors.
    pub fn on_permission_error<F>(&self, handler: F) -> SubscriptionHandle
    where
        F: Fn(&Arc<PermissionError>) + Send + Sync + 'static,
    {
        self.subscribe(EventKind::PermissionError, move |event| {
            if let Some(err) = event.as_permission_error() {
                handler(err);
            }
        })
    }

    /// Remove a registration.
    ///
    /// Returns `false` if it was already removed; calling this twice is harmless.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        let mut subscribers = self.lock();
        let Some(list) = subscribers.get_mut(&handle.kind) else {
            return false;
        };

        let before = list.len();
        list.retain(|s| s.id != handle.id);
        let removed = list.len() != before;
        if list.is_empty() {
            subscribers.remove(&handle.kind);
        }

        if removed {
            tracing::trace!(kind = %handle.kind, id = handle.id, "unsubscribed");
        }
        removed
    }

    /// Deliver `event` to every current subscriber of its kind, in
    /// registration order.
    ///
    /// Returns the number of handlers invoked. Never fails.
    pub fn publish(&self, event: impl Into<ErrorEvent>) -> usize {
        let event = event.into();
        let kind = event.kind();

        // Snapshot, then release the lock before running any handler.
        let handlers: Vec<(u64, Handler)> = match self.lock().get(&kind) {
            Some(list) => list
                .iter()
                .map(|s| (s.id, Arc::clone(&s.handler)))
                .collect(),
            None => return 0,
        };

        for (id, handler) in &handlers {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| handler(&event))) {
                tracing::warn!(
                    %kind,
                    subscriber = id,
                    panic = panic_message(panic.as_ref()),
                    "error bus handler panicked; continuing dispatch"
                );
            }
        }

        handlers.len()
    }

    /// Number of handlers currently registered for `kind`.
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.lock().get(&kind).map_or(0, Vec::len)
    }

    // Handlers never run under the lock, so poisoning can only come from a
    // panic inside the bus itself; the map is still consistent then.
    fn lock(&self) -> MutexGuard<'_, HashMap<EventKind, Vec<Subscriber>>> {
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ErrorBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorBus")
            .field(
                "permission_error_subscribers",
                &self.subscriber_count(EventKind::PermissionError),
            )
            .finish()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeweaver_core::{DocumentRef, Payload, PermissionErrorContext};
    use std::sync::Mutex;

    fn sample_error() -> PermissionError {
        let doc = DocumentRef::new("images/doc1").unwrap();
        PermissionErrorContext::update(&doc, Payload::new().with("caption", "hi")).into()
    }

    /// Records (label, event pointer) for every delivery.
    fn recorder() -> Arc<Mutex<Vec<(&'static str, usize)>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn record(
        log: &Arc<Mutex<Vec<(&'static str, usize)>>>,
        label: &'static str,
    ) -> impl Fn(&ErrorEvent) + Send + Sync + 'static {
        let log = Arc::clone(log);
        move |event| {
            let ptr = event
                .as_permission_error()
                .map_or(0, |e| Arc::as_ptr(e) as usize);
            log.lock().unwrap().push((label, ptr));
        }
    }

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let bus = ErrorBus::new();
        assert_eq!(bus.publish(sample_error()), 0);
    }

    #[test]
    fn test_fan_out_in_registration_order_with_same_instance() {
        let bus = ErrorBus::new();
        let log = recorder();
        bus.subscribe(EventKind::PermissionError, record(&log, "first"));
        bus.subscribe(EventKind::PermissionError, record(&log, "second"));
        bus.subscribe(EventKind::PermissionError, record(&log, "third"));

        let event = ErrorEvent::from(sample_error());
        let expected_ptr = Arc::as_ptr(event.as_permission_error().unwrap()) as usize;
        assert_eq!(bus.publish(event), 3);

        let log = log.lock().unwrap();
        let labels: Vec<_> = log.iter().map(|(label, _)| *label).collect();
        assert_eq!(labels, vec!["first", "second", "third"]);
        assert!(log.iter().all(|(_, ptr)| *ptr == expected_ptr));
    }

    #[test]
    fn test_panicking_handler_is_isolated() {
        let bus = ErrorBus::new();
        let log = recorder();
        bus.subscribe(EventKind::PermissionError, record(&log, "before"));
        bus.subscribe(EventKind::PermissionError, |_| panic!("listener bug"));
        bus.subscribe(EventKind::PermissionError, record(&log, "after"));

        assert_eq!(bus.publish(sample_error()), 3);
        let labels: Vec<_> = log.lock().unwrap().iter().map(|(l, _)| *l).collect();
        assert_eq!(labels, vec!["before", "after"]);

        // The bus keeps working afterwards.
        assert_eq!(bus.publish(sample_error()), 3);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let bus = ErrorBus::new();
        let log = recorder();
        let handle = bus.subscribe(EventKind::PermissionError, record(&log, "gone"));
        bus.subscribe(EventKind::PermissionError, record(&log, "kept"));

        assert!(bus.unsubscribe(handle));
        assert!(!bus.unsubscribe(handle));
        assert_eq!(bus.subscriber_count(EventKind::PermissionError), 1);

        bus.publish(sample_error());
        let labels: Vec<_> = log.lock().unwrap().iter().map(|(l, _)| *l).collect();
        assert_eq!(labels, vec!["kept"]);
    }

    #[test]
    fn test_handler_unsubscribing_during_dispatch() {
        let bus = ErrorBus::new();
        let log = recorder();

        // The first handler removes the second mid-dispatch; the snapshot
        // still delivers to it this time, never again after.
        let victim: Arc<Mutex<Option<SubscriptionHandle>>> = Arc::new(Mutex::new(None));
        let bus_for_handler = bus.clone();
        let victim_for_handler = Arc::clone(&victim);
        bus.subscribe(EventKind::PermissionError, move |_| {
            if let Some(handle) = victim_for_handler.lock().unwrap().take() {
                bus_for_handler.unsubscribe(handle);
            }
        });
        let handle = bus.subscribe(EventKind::PermissionError, record(&log, "victim"));
        *victim.lock().unwrap() = Some(handle);

        assert_eq!(bus.publish(sample_error()), 2);
        assert_eq!(bus.publish(sample_error()), 1);
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_handler_subscribing_during_dispatch() {
        let bus = ErrorBus::new();
        let bus_for_handler = bus.clone();
        bus.subscribe(EventKind::PermissionError, move |_| {
            bus_for_handler.subscribe(EventKind::PermissionError, |_| {});
        });

        // New registrations only see later publications.
        assert_eq!(bus.publish(sample_error()), 1);
        assert_eq!(bus.publish(sample_error()), 2);
    }

    #[test]
    fn test_on_permission_error() {
        let bus = ErrorBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_for_handler = Arc::clone(&seen);
        bus.on_permission_error(move |err| {
            seen_for_handler
                .lock()
                .unwrap()
                .push(err.resource_path().to_string());
        });

        bus.publish(sample_error());
        assert_eq!(*seen.lock().unwrap(), vec!["images/doc1".to_string()]);
    }

    #[test]
    fn test_clones_share_registrations() {
        let bus = ErrorBus::new();
        let other = bus.clone();
        other.subscribe(EventKind::PermissionError, |_| {});
        assert_eq!(bus.subscriber_count(EventKind::PermissionError), 1);
        assert_eq!(bus.publish(sample_error()), 1);
    }
}
