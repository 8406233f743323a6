//! # Codeweaver Bus
//!
//! A typed publish/subscribe channel that carries rejected writes from
//! wherever they are detected to whoever wants to present them.
//!
//! ## Overview
//!
//! The bus is an explicit value, not a global: build one [`ErrorBus`] at
//! startup and hand clones to every component that publishes or listens.
//! Tests build a fresh bus per case.
//!
//! ## Usage
//!
//! ```rust
//! use codeweaver_bus::{ErrorBus, EventKind};
//!
//! let bus = ErrorBus::new();
//! let handle = bus.on_permission_error(|err| {
//!     eprintln!("write rejected: {}", err);
//! });
//! assert_eq!(bus.subscriber_count(EventKind::PermissionError), 1);
//! bus.unsubscribe(handle);
//! ```

pub mod bus;
pub mod error;
pub mod event;
pub mod listener;

pub use bus::{ErrorBus, Handler, SubscriptionHandle};
pub use error::UnknownEventKind;
pub use event::{ErrorEvent, EventKind};
pub use listener::LoggingListener;
