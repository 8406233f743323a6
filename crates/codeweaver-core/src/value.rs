//! Typed document payloads.
//!
//! A [`Payload`] is an ordered mapping of field name to [`FieldValue`].
//! Payloads stay inspectable and comparable all the way from the caller to
//! the store and into any [`PermissionError`](crate::PermissionError) built
//! from a rejected write.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(String),
    /// A concrete timestamp in Unix milliseconds.
    Timestamp(i64),
    /// Placeholder resolved by the store to its own clock at write time.
    ///
    /// Opaque to everything above the store: it is passed through verbatim.
    ServerTimestamp,
    Array(Vec<FieldValue>),
    Map(Payload),
}

impl FieldValue {
    /// The string value, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// The timestamp value, if this is a resolved timestamp.
    pub fn as_timestamp(&self) -> Option<i64> {
        match self {
            FieldValue::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Whether this value (or anything nested in it) is a server timestamp placeholder.
    pub fn has_server_timestamp(&self) -> bool {
        match self {
            FieldValue::ServerTimestamp => true,
            FieldValue::Array(items) => items.iter().any(FieldValue::has_server_timestamp),
            FieldValue::Map(map) => map.has_server_timestamp(),
            _ => false,
        }
    }

    /// Whether every number in this value (or nested in it) is finite.
    pub fn is_finite(&self) -> bool {
        match self {
            FieldValue::Double(n) => n.is_finite(),
            FieldValue::Array(items) => items.iter().all(FieldValue::is_finite),
            FieldValue::Map(map) => map.non_finite_field().is_none(),
            _ => true,
        }
    }

    fn resolve_server_timestamps(&self, now: i64) -> FieldValue {
        match self {
            FieldValue::ServerTimestamp => FieldValue::Timestamp(now),
            FieldValue::Array(items) => FieldValue::Array(
                items
                    .iter()
                    .map(|v| v.resolve_server_timestamps(now))
                    .collect(),
            ),
            FieldValue::Map(map) => FieldValue::Map(map.resolve_server_timestamps(now)),
            other => other.clone(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Integer(n)
    }
}

impl From<i32> for FieldValue {
    fn from(n: i32) -> Self {
        FieldValue::Integer(n.into())
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Double(n)
    }
}

impl From<Payload> for FieldValue {
    fn from(map: Payload) -> Self {
        FieldValue::Map(map)
    }
}

impl From<Vec<FieldValue>> for FieldValue {
    fn from(items: Vec<FieldValue>) -> Self {
        FieldValue::Array(items)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

/// Ordered mapping of field name to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(BTreeMap<String, FieldValue>);

impl Payload {
    /// Create an empty payload.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Insert a field, returning the previous value.
    pub fn insert(
        &mut self,
        field: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Option<FieldValue> {
        self.0.insert(field.into(), value.into())
    }

    /// Look up a field.
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }

    /// Look up a string field.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_str)
    }

    /// Remove a field.
    pub fn remove(&mut self, field: &str) -> Option<FieldValue> {
        self.0.remove(field)
    }

    /// Iterate fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Field names in order.
    pub fn field_names(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Shallow merge: every field in `other` replaces the field of the same name.
    pub fn merge(&mut self, other: &Payload) {
        for (field, value) in &other.0 {
            self.0.insert(field.clone(), value.clone());
        }
    }

    /// Whether any field holds a server timestamp placeholder.
    pub fn has_server_timestamp(&self) -> bool {
        self.0.values().any(FieldValue::has_server_timestamp)
    }

    /// The first top-level field holding NaN or an infinity, at any depth.
    pub fn non_finite_field(&self) -> Option<&str> {
        self.iter()
            .find(|(_, value)| !value.is_finite())
            .map(|(field, _)| field)
    }

    /// Replace every server timestamp placeholder with `now` (Unix ms).
    ///
    /// Only stores call this; callers and the write facade never resolve placeholders.
    pub fn resolve_server_timestamps(&self, now: i64) -> Payload {
        Payload(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), v.resolve_server_timestamps(now)))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for Payload {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Payload(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl IntoIterator for Payload {
    type Item = (String, FieldValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
