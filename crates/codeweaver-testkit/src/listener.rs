//! A bus listener that records what it hears.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use codeweaver_bus::{ErrorBus, SubscriptionHandle};
use codeweaver_core::PermissionError;

/// How long [`RecordingListener::recv`] waits before giving up.
pub const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// Collects every permission error published on a bus.
///
/// Unsubscribes when dropped.
pub struct RecordingListener {
    bus: ErrorBus,
    handle: SubscriptionHandle,
    rx: mpsc::UnboundedReceiver<Arc<PermissionError>>,
}

impl RecordingListener {
    /// Subscribe to permission errors on `bus`.
    pub fn attach(bus: &ErrorBus) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = bus.on_permission_error(move |err| {
            let _ = tx.send(Arc::clone(err));
        });
        Self {
            bus: bus.clone(),
            handle,
            rx,
        }
    }

    /// Wait for the next error, up to [`DEFAULT_RECV_TIMEOUT`].
    pub async fn recv(&mut self) -> Option<Arc<PermissionError>> {
        self.recv_timeout(DEFAULT_RECV_TIMEOUT).await
    }

    /// Wait for the next error, up to `timeout`.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> Option<Arc<PermissionError>> {
        tokio::time::timeout(timeout, self.rx.recv())
            .await
            .ok()
            .flatten()
    }

    /// Everything received so far, without waiting.
    pub fn drain(&mut self) -> Vec<Arc<PermissionError>> {
        let mut events = Vec::new();
        while let Ok(err) = self.rx.try_recv() {
            events.push(err);
        }
        events
    }
}

impl Drop for RecordingListener {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeweaver_bus::EventKind;
    use codeweaver_core::{DocumentRef, PermissionErrorContext};

    #[tokio::test]
    async fn test_records_and_detaches() {
        let bus = ErrorBus::new();
        let mut listener = RecordingListener::attach(&bus);

        let doc = DocumentRef::new("images/a").unwrap();
        bus.publish(PermissionError::new(PermissionErrorContext::delete(&doc)));

        let err = listener.recv().await.unwrap();
        assert_eq!(err.resource_path(), "images/a");
        assert!(listener.drain().is_empty());

        drop(listener);
        assert_eq!(bus.subscriber_count(EventKind::PermissionError), 0);
    }
}
