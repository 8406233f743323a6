//! Strong type definitions for store locations and identities.
//!
//! Paths are validated on construction so that anything holding a
//! [`CollectionRef`] or [`DocumentRef`] can rely on a non-empty,
//! well-formed location.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// A slash-separated location in the document store.
///
/// Segments alternate collection / document: an odd number of segments
/// names a collection, an even number names a document.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentPath(String);

impl DocumentPath {
    /// Parse and validate a path.
    pub fn parse(path: &str) -> Result<Self> {
        let trimmed = path.trim_matches('/');
        if trimmed.is_empty() {
            return Err(CoreError::EmptyPath);
        }
        for segment in trimmed.split('/') {
            validate_segment(segment).map_err(|e| match e {
                CoreError::EmptySegment(_) => CoreError::EmptySegment(path.to_string()),
                other => other,
            })?;
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate the path segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Number of segments.
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// Whether this path names a collection.
    pub fn is_collection(&self) -> bool {
        self.depth() % 2 == 1
    }

    /// The last segment.
    pub fn last_segment(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Everything before the last segment, if any.
    pub fn parent(&self) -> Option<DocumentPath> {
        self.0
            .rsplit_once('/')
            .map(|(parent, _)| DocumentPath(parent.to_string()))
    }

    /// Append a single segment.
    pub fn child(&self, segment: &str) -> Result<DocumentPath> {
        validate_segment(segment)?;
        Ok(DocumentPath(format!("{}/{}", self.0, segment)))
    }
}

fn validate_segment(segment: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(CoreError::EmptySegment(segment.to_string()));
    }
    if segment.contains('/') || segment == "." || segment == ".." {
        return Err(CoreError::InvalidSegment(segment.to_string()));
    }
    Ok(())
}

impl fmt::Debug for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentPath({})", self.0)
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DocumentPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for DocumentPath {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DocumentPath {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<DocumentPath> for String {
    fn from(path: DocumentPath) -> Self {
        path.0
    }
}

/// Reference to a collection (odd number of segments).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "DocumentPath", into = "DocumentPath")]
pub struct CollectionRef(DocumentPath);

impl CollectionRef {
    /// Parse a collection path such as `images` or `users/u1/images`.
    pub fn new(path: &str) -> Result<Self> {
        Self::from_path(DocumentPath::parse(path)?)
    }

    /// Wrap an already-parsed path.
    pub fn from_path(path: DocumentPath) -> Result<Self> {
        if !path.is_collection() {
            return Err(CoreError::NotACollection(path.0));
        }
        Ok(Self(path))
    }

    /// The underlying path.
    pub fn path(&self) -> &DocumentPath {
        &self.0
    }

    /// The collection id (last segment).
    pub fn id(&self) -> &str {
        self.0.last_segment()
    }

    /// The document this collection is nested under, if any.
    pub fn parent(&self) -> Option<DocumentRef> {
        self.0.parent().map(DocumentRef)
    }

    /// Reference a document inside this collection.
    pub fn doc(&self, id: &str) -> Result<DocumentRef> {
        Ok(DocumentRef(self.0.child(id)?))
    }
}

impl fmt::Debug for CollectionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CollectionRef({})", self.0)
    }
}

impl fmt::Display for CollectionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for CollectionRef {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<DocumentPath> for CollectionRef {
    type Error = CoreError;

    fn try_from(path: DocumentPath) -> Result<Self> {
        Self::from_path(path)
    }
}

impl From<CollectionRef> for DocumentPath {
    fn from(r: CollectionRef) -> Self {
        r.0
    }
}

/// Reference to a single document (even number of segments).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "DocumentPath", into = "DocumentPath")]
pub struct DocumentRef(DocumentPath);

impl DocumentRef {
    /// Parse a document path such as `images/doc1`.
    pub fn new(path: &str) -> Result<Self> {
        Self::from_path(DocumentPath::parse(path)?)
    }

    /// Wrap an already-parsed path.
    pub fn from_path(path: DocumentPath) -> Result<Self> {
        if path.is_collection() {
            return Err(CoreError::NotADocument(path.0));
        }
        Ok(Self(path))
    }

    /// The underlying path.
    pub fn path(&self) -> &DocumentPath {
        &self.0
    }

    /// The document id (last segment).
    pub fn id(&self) -> &str {
        self.0.last_segment()
    }

    /// The collection holding this document.
    pub fn parent(&self) -> CollectionRef {
        // A document path always has at least two segments.
        CollectionRef(self.0.parent().unwrap_or_else(|| self.0.clone()))
    }

    /// Reference a subcollection of this document.
    pub fn collection(&self, id: &str) -> Result<CollectionRef> {
        Ok(CollectionRef(self.0.child(id)?))
    }
}

impl fmt::Debug for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentRef({})", self.0)
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for DocumentRef {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<DocumentPath> for DocumentRef {
    type Error = CoreError;

    fn try_from(path: DocumentPath) -> Result<Self> {
        Self::from_path(path)
    }
}

impl From<DocumentRef> for DocumentPath {
    fn from(r: DocumentRef) -> Self {
        r.0
    }
}

/// Identity of the signed-in user, as seen by the store's access rules.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Uid(String);

impl Uid {
    /// Create a uid from any string.
    pub fn new(uid: impl Into<String>) -> Self {
        Self(uid.into())
    }

    /// The uid as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uid({})", self.0)
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_and_document_parity() {
        assert!(CollectionRef::new("images").is_ok());
        assert!(CollectionRef::new("users/u1/images").is_ok());
        assert_eq!(
            CollectionRef::new("images/doc1"),
            Err(CoreError::NotACollection("images/doc1".into()))
        );

        assert!(DocumentRef::new("images/doc1").is_ok());
        assert_eq!(
            DocumentRef::new("images"),
            Err(CoreError::NotADocument("images".into()))
        );
    }

    #[test]
    fn test_path_rejects_bad_segments() {
        assert_eq!(DocumentPath::parse(""), Err(CoreError::EmptyPath));
        assert_eq!(DocumentPath::parse("///"), Err(CoreError::EmptyPath));
        assert_eq!(
            DocumentPath::parse("images//doc1"),
            Err(CoreError::EmptySegment("images//doc1".into()))
        );
        assert_eq!(
            DocumentPath::parse("images/.."),
            Err(CoreError::InvalidSegment("..".into()))
        );
    }

    #[test]
    fn test_leading_and_trailing_slashes_are_trimmed() {
        let path = DocumentPath::parse("/images/doc1/").unwrap();
        assert_eq!(path.as_str(), "images/doc1");
        assert_eq!(path.depth(), 2);
    }

    #[test]
    fn test_navigation() {
        let images = CollectionRef::new("images").unwrap();
        let doc = images.doc("doc1").unwrap();
        assert_eq!(doc.path().as_str(), "images/doc1");
        assert_eq!(doc.id(), "doc1");
        assert_eq!(doc.parent(), images);
        assert!(images.parent().is_none());

        let comments = doc.collection("comments").unwrap();
        assert_eq!(comments.to_string(), "images/doc1/comments");
        assert_eq!(comments.parent(), Some(doc));
        assert_eq!(comments.id(), "comments");
    }

    #[test]
    fn test_doc_rejects_nested_id() {
        let images = CollectionRef::new("images").unwrap();
        assert_eq!(
            images.doc("a/b"),
            Err(CoreError::InvalidSegment("a/b".into()))
        );
    }

    #[test]
    fn test_path_serde_validates() {
        let ok: DocumentPath = serde_json::from_str("\"images/doc1\"").unwrap();
        assert_eq!(ok.as_str(), "images/doc1");
        assert!(serde_json::from_str::<DocumentPath>("\"\"").is_err());
    }

    #[test]
    fn test_ref_serde_checks_segment_parity() {
        let collection: CollectionRef = serde_json::from_str("\"users/u1/images\"").unwrap();
        assert_eq!(collection.id(), "images");
        assert!(serde_json::from_str::<CollectionRef>("\"images/doc1\"").is_err());

        let doc: DocumentRef = serde_json::from_str("\"images/doc1\"").unwrap();
        assert_eq!(serde_json::to_string(&doc).unwrap(), "\"images/doc1\"");
        assert!(serde_json::from_str::<DocumentRef>("\"images\"").is_err());
    }
}
