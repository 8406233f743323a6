//! Diagnostic listener that logs every rejected write.

use codeweaver_core::PermissionError;

use crate::bus::{ErrorBus, SubscriptionHandle};

/// Logs each published permission error through `tracing`.
///
/// Subscribes on [`attach`](LoggingListener::attach) and unsubscribes when
/// dropped.
#[derive(Debug)]
pub struct LoggingListener {
    bus: ErrorBus,
    handle: SubscriptionHandle,
}

impl LoggingListener {
    /// Start logging permission errors published on `bus`.
    pub fn attach(bus: &ErrorBus) -> Self {
        let handle = bus.on_permission_error(|err| log_permission_error(err));
        Self {
            bus: bus.clone(),
            handle,
        }
    }

    /// The underlying registration.
    pub fn handle(&self) -> SubscriptionHandle {
        self.handle
    }
}

impl Drop for LoggingListener {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.handle);
    }
}

fn log_permission_error(err: &PermissionError) {
    let fields = err
        .attempted_payload()
        .map(|p| p.field_names().join(","))
        .unwrap_or_default();
    tracing::error!(
        path = err.resource_path(),
        operation = %err.operation(),
        fields = %fields,
        request = %err.request_json(),
        "{}",
        err.message()
    );
}
