//! Configuration for a [`Weaver`](crate::Weaver).

use codeweaver_core::CollectionRef;

use crate::error::{Result, WeaverError};

/// Collection image metadata is written to unless configured otherwise.
pub const DEFAULT_IMAGES_COLLECTION: &str = "images";

/// Configuration for the Weaver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeaverConfig {
    /// Collection holding image metadata documents.
    pub images_collection: String,
    /// Whether to attach a listener that logs every rejected write.
    pub log_permission_errors: bool,
}

impl Default for WeaverConfig {
    fn default() -> Self {
        Self {
            images_collection: DEFAULT_IMAGES_COLLECTION.to_string(),
            log_permission_errors: true,
        }
    }
}

impl WeaverConfig {
    /// Check the configuration before anything is wired up.
    pub fn validate(&self) -> Result<()> {
        self.images_collection().map(|_| ())
    }

    /// The images collection as a validated reference.
    pub fn images_collection(&self) -> Result<CollectionRef> {
        CollectionRef::new(&self.images_collection).map_err(|e| {
            WeaverError::InvalidConfig(format!(
                "images_collection {:?}: {e}",
                self.images_collection
            ))
        })
    }
}
