// ── Per-entity reactive store ──
//
// One EntityStore per record kind: the collection plus the flags the UI
// renders around it. Mutations are pure in-memory state changes;
// persistence is the listener's job.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use super::collection::{EntityCollection, Snapshot};
use crate::model::{DataSource, EntityId, Identified};
use crate::stream::EntityStream;

/// Reactive store for a single entity kind.
pub struct EntityStore<T: Identified> {
    collection: EntityCollection<T>,
    loading: watch::Sender<bool>,
    source: watch::Sender<DataSource>,
    last_updated: watch::Sender<Option<DateTime<Utc>>>,
}

impl<T: Identified> EntityStore<T> {
    pub fn new() -> Self {
        let (loading, _) = watch::channel(false);
        let (source, _) = watch::channel(DataSource::Empty);
        let (last_updated, _) = watch::channel(None);

        Self {
            collection: EntityCollection::new(),
            loading,
            source,
            last_updated,
        }
    }

    // ── Reducers ─────────────────────────────────────────────────────

    /// Total replace with a live snapshot. Idempotent.
    pub fn replace_all(&self, records: Vec<T>) {
        self.publish(records, DataSource::Live);
    }

    /// Total replace, recording where the records came from.
    ///
    /// The source is recorded before the snapshot is swapped, so anyone
    /// woken by the snapshot change already sees where it came from.
    pub fn publish(&self, records: Vec<T>, source: DataSource) {
        self.source.send_replace(source);
        self.last_updated.send_replace(Some(Utc::now()));
        self.collection.replace_all(records);
    }

    pub fn set_loading(&self, loading: bool) {
        self.loading.send_if_modified(|current| {
            let changed = *current != loading;
            *current = loading;
            changed
        });
    }

    /// Insert or replace one record in place. Returns `true` if it was new.
    pub fn upsert(&self, record: T) -> bool {
        self.collection.upsert(record)
    }

    /// Modify one record. Returns the value before the change, or `None`
    /// (and changes nothing) when `id` is unknown.
    pub fn update(&self, id: &EntityId, f: impl FnOnce(&mut T)) -> Option<T> {
        self.collection.update(id, f)
    }

    /// Remove one record, returning its former position and value.
    pub fn remove(&self, id: &EntityId) -> Option<(usize, Arc<T>)> {
        self.collection.remove(id)
    }

    /// Reinsert a record previously returned by [`remove`](Self::remove).
    pub fn restore(&self, index: usize, record: Arc<T>) {
        self.collection.restore(index, record);
    }

    /// Empty the store and forget where its data came from.
    pub fn clear(&self) {
        self.collection.clear();
        self.source.send_replace(DataSource::Empty);
        self.last_updated.send_replace(None);
        self.set_loading(false);
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> Snapshot<T> {
        self.collection.snapshot()
    }

    pub fn get(&self, id: &EntityId) -> Option<Arc<T>> {
        self.collection.get(id)
    }

    pub fn len(&self) -> usize {
        self.collection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_loading(&self) -> bool {
        *self.loading.borrow()
    }

    pub fn source(&self) -> DataSource {
        *self.source.borrow()
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        *self.last_updated.borrow()
    }

    /// Number of mutations applied since creation.
    pub fn version(&self) -> u64 {
        self.collection.version()
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe(&self) -> EntityStream<T> {
        EntityStream::new(self.collection.subscribe())
    }

    pub fn watch_loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    pub fn watch_source(&self) -> watch::Receiver<DataSource> {
        self.source.subscribe()
    }
}

impl<T: Identified> Default for EntityStore<T> {
    fn default() -> Self {
        Self::new()
    }
}
