// ── Remote document store boundary ──
//
// The sync layer consumes an eventually-consistent document database with
// live collection subscriptions. It never assumes a wire protocol; the
// client is injected as `Arc<dyn RemoteStore>`.

mod memory;
mod subscription;

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::RemoteError;
use crate::model::{CollectionKind, Document, EntityId, Fields};

pub use memory::MemoryRemoteStore;
pub use subscription::{SnapshotEvent, Subscription, SubscriptionSink, channel};

// ── Addressing ──────────────────────────────────────────────────────

/// Equality filter on one document field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub value: Value,
}

/// A collection, or an equality query over one.
///
/// `path` may name a nested collection, e.g. `users/u1/likedTeachers`.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSelector {
    pub path: String,
    pub filters: Vec<FieldFilter>,
}

impl CollectionSelector {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            filters: Vec::new(),
        }
    }

    pub fn collection(kind: CollectionKind) -> Self {
        Self::new(kind.path())
    }

    /// Add an equality filter.
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(FieldFilter {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Path of one document in this collection.
    pub fn doc(&self, id: impl Into<EntityId>) -> DocumentPath {
        DocumentPath::new(self.path.clone(), id)
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.filters
            .iter()
            .all(|f| doc.get(&f.field) == Some(&f.value))
    }

    /// Stable key identifying this selector in the local cache.
    pub fn cache_key(&self) -> String {
        if self.filters.is_empty() {
            return self.path.clone();
        }
        let query: Vec<String> = self
            .filters
            .iter()
            .map(|f| match &f.value {
                Value::String(s) => format!("{}={s}", f.field),
                other => format!("{}={other}", f.field),
            })
            .collect();
        format!("{}?{}", self.path, query.join("&"))
    }
}

impl fmt::Display for CollectionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cache_key())
    }
}

impl From<CollectionKind> for CollectionSelector {
    fn from(kind: CollectionKind) -> Self {
        Self::collection(kind)
    }
}

/// Address of a single document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentPath {
    pub collection: String,
    pub id: EntityId,
}

impl DocumentPath {
    pub fn new(collection: impl Into<String>, id: impl Into<EntityId>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// Options for [`RemoteStore::set`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Merge the given fields into an existing document instead of
    /// replacing it.
    pub merge: bool,
}

impl SetOptions {
    pub const MERGE: Self = Self { merge: true };
    pub const REPLACE: Self = Self { merge: false };
}

// ── Client trait ────────────────────────────────────────────────────

/// The remote document database.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Open a live subscription. The first event is the current contents;
    /// every later event is the full collection after a change. A failure
    /// is delivered as an `Err` event, after which the feed ends.
    fn subscribe(&self, selector: &CollectionSelector) -> Subscription;

    /// Read the matching documents once.
    async fn get_once(&self, selector: &CollectionSelector) -> Result<Vec<Document>, RemoteError>;

    /// Create or overwrite (or with [`SetOptions::MERGE`], patch) a document.
    async fn set(
        &self,
        path: &DocumentPath,
        data: Fields,
        options: SetOptions,
    ) -> Result<(), RemoteError>;

    /// Delete a document. Deleting a missing document succeeds.
    async fn delete(&self, path: &DocumentPath) -> Result<(), RemoteError>;
}
