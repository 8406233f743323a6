//! Access rules evaluated by the store before every request.
//!
//! Rules see the target path, the operation the store is about to perform,
//! the incoming payload, the existing document (if any), and the caller's
//! identity. A denial surfaces as [`StoreError::PermissionDenied`].

use std::sync::RwLock;

use codeweaver_core::{DocumentPath, Payload, Uid, WriteOperationKind};

use crate::error::{Result, StoreError};

/// Everything a rule may inspect about a request.
#[derive(Debug, Clone, Copy)]
pub struct AccessRequest<'a> {
    /// Target document (or collection, for creates before an id is assigned).
    pub path: &'a DocumentPath,
    /// What the store is about to do.
    pub operation: WriteOperationKind,
    /// Data being written, if any.
    pub incoming: Option<&'a Payload>,
    /// Data currently stored at `path`, if any.
    pub existing: Option<&'a Payload>,
    /// The signed-in identity, if any.
    pub caller: Option<&'a Uid>,
}

/// Outcome of a rule check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(String),
}

/// A set of access rules.
pub trait AccessRules: Send + Sync {
    /// Decide whether `request` may proceed.
    fn check(&self, request: &AccessRequest<'_>) -> Decision;
}

impl<F> AccessRules for F
where
    F: Fn(&AccessRequest<'_>) -> Decision + Send + Sync,
{
    fn check(&self, request: &AccessRequest<'_>) -> Decision {
        self(request)
    }
}

/// Allow every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AccessRules for AllowAll {
    fn check(&self, _request: &AccessRequest<'_>) -> Decision {
        Decision::Allow
    }
}

/// Allow reads, deny every mutation.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

impl AccessRules for DenyAll {
    fn check(&self, request: &AccessRequest<'_>) -> Decision {
        match request.operation {
            WriteOperationKind::Read => Decision::Allow,
            _ => Decision::Deny("writes are disabled".into()),
        }
    }
}

/// Owner-based rules for one top-level collection.
///
/// - Reads are allowed.
/// - A create must carry `owner_field` equal to the caller's uid.
/// - Updates and deletes require the stored `owner_field` to equal the
///   caller's uid, and an update may not hand the document to someone else.
/// - Requests outside the guarded collection are denied.
#[derive(Debug, Clone)]
pub struct OwnerRules {
    collection: String,
    owner_field: String,
}

impl OwnerRules {
    pub fn new(collection: impl Into<String>, owner_field: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            owner_field: owner_field.into(),
        }
    }

    fn guards(&self, path: &DocumentPath) -> bool {
        path.segments().next() == Some(self.collection.as_str()) && path.depth() <= 2
    }

    fn owner<'a>(&self, data: Option<&'a Payload>) -> Option<&'a str> {
        data.and_then(|d| d.get_str(&self.owner_field))
    }
}

impl AccessRules for OwnerRules {
    fn check(&self, request: &AccessRequest<'_>) -> Decision {
        if request.operation == WriteOperationKind::Read {
            return Decision::Allow;
        }
        if !self.guards(request.path) {
            return Decision::Deny(format!("no rule matches '{}'", request.path));
        }
        let Some(caller) = request.caller else {
            return Decision::Deny("request is not authenticated".into());
        };

        match request.operation {
            WriteOperationKind::Create => {
                if self.owner(request.incoming) == Some(caller.as_str()) {
                    Decision::Allow
                } else {
                    Decision::Deny(format!("{} must equal the caller's uid", self.owner_field))
                }
            }
            WriteOperationKind::Update | WriteOperationKind::Delete => {
                if self.owner(request.existing) != Some(caller.as_str()) {
                    return Decision::Deny("caller does not own the document".into());
                }
                match self.owner(request.incoming) {
                    Some(owner) if owner != caller.as_str() => {
                        Decision::Deny(format!("{} cannot be reassigned", self.owner_field))
                    }
                    _ => Decision::Allow,
                }
            }
            WriteOperationKind::Read => Decision::Allow,
        }
    }
}

/// The identity a store presents to its rules.
#[derive(Debug, Default)]
pub struct AuthState(RwLock<Option<Uid>>);

impl AuthState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current identity.
    pub fn current(&self) -> Option<Uid> {
        self.0.read().ok().and_then(|uid| uid.clone())
    }

    /// Replace the current identity.
    pub fn set(&self, uid: Option<Uid>) {
        if let Ok(mut current) = self.0.write() {
            *current = uid;
        }
    }
}

/// Run `rules` against a request, mapping a denial to `PermissionDenied`.
pub fn authorize(rules: &dyn AccessRules, request: &AccessRequest<'_>) -> Result<()> {
    match rules.check(request) {
        Decision::Allow => Ok(()),
        Decision::Deny(reason) => {
            tracing::debug!(
                path = %request.path,
                operation = %request.operation,
                %reason,
                "request denied by access rules"
            );
            Err(StoreError::PermissionDenied {
                path: request.path.to_string(),
                operation: request.operation,
                reason,
            })
        }
    }
}
