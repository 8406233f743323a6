//! # Codeweaver Testkit
//!
//! Testing utilities for codeweaver.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Gated stores**: hold writes in flight, force failures, record call order
//! - **Recording listeners**: collect everything published on an error bus
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Helper structs for setting up test scenarios
//!
//! ## Holding Writes In Flight
//!
//! ```rust,ignore
//! use codeweaver_testkit::GatedStore;
//!
//! let store = Arc::new(GatedStore::new(MemoryStore::new()));
//! store.close();
//! // ... initiate writes, observe they have not settled ...
//! store.open();
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use codeweaver_testkit::generators::{context_from_params, WriteParams};
//!
//! proptest! {
//!     #[test]
//!     fn rejection_names_the_target(params: WriteParams) {
//!         let ctx = context_from_params(&params);
//!         prop_assert_eq!(ctx.resource_path(), params.expected_path());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use codeweaver_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::owner_rules();
//! let uid = fixture.sign_in("alice");
//! ```

pub mod fixtures;
pub mod gated;
pub mod generators;
pub mod listener;

pub use fixtures::{image_payload, init_tracing, TestFixture};
pub use gated::GatedStore;
pub use generators::{context_from_params, WriteParams};
pub use listener::RecordingListener;
