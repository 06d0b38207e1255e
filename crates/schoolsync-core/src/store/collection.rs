// ── Generic reactive entity collection ──
//
// Ordered storage with O(1) id lookups and push-based change
// notification via `watch` channels.

use std::sync::Arc;

use dashmap::DashMap;
use indexmap::IndexMap;
use tokio::sync::watch;

use crate::model::{EntityId, Identified};

/// Shared, immutable view of a collection at one point in time.
pub type Snapshot<T> = Arc<Vec<Arc<T>>>;

/// A reactive, ordered collection for a single entity type.
///
/// The ordered snapshot lives inside a `watch` channel; `send_modify`
/// holds the channel's write lock, so every mutation below is applied
/// atomically with respect to the others and to the id index.
pub(crate) struct EntityCollection<T: Identified> {
    /// Secondary index: id -> entity.
    by_id: DashMap<EntityId, Arc<T>>,

    /// Version counter, bumped on every mutation.
    version: watch::Sender<u64>,

    /// Full ordered snapshot that subscribers receive.
    snapshot: watch::Sender<Snapshot<T>>,
}

impl<T: Identified> EntityCollection<T> {
    pub(crate) fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));

        Self {
            by_id: DashMap::new(),
            version,
            snapshot,
        }
    }

    /// Replace the entire contents with `items`, preserving their order.
    ///
    /// Duplicate ids collapse to the last occurrence, kept at the position
    /// of the first.
    pub(crate) fn replace_all(&self, items: Vec<T>) {
        let mut deduped: IndexMap<EntityId, Arc<T>> = IndexMap::with_capacity(items.len());
        for item in items {
            deduped.insert(item.id().clone(), Arc::new(item));
        }

        self.snapshot.send_modify(|snap| {
            self.by_id.clear();
            for (id, item) in &deduped {
                self.by_id.insert(id.clone(), Arc::clone(item));
            }
            *snap = Arc::new(deduped.into_values().collect());
        });
        self.bump_version();
    }

    /// Insert or replace one entity in place. Returns `true` if it was new.
    pub(crate) fn upsert(&self, entity: T) -> bool {
        let id = entity.id().clone();
        let entity = Arc::new(entity);
        let mut is_new = false;

        self.snapshot.send_modify(|snap| {
            let mut values: Vec<Arc<T>> = snap.as_ref().clone();
            match values.iter().position(|e| e.id() == &id) {
                Some(idx) => {
                    if let Some(slot) = values.get_mut(idx) {
                        *slot = Arc::clone(&entity);
                    }
                }
                None => {
                    is_new = true;
                    values.push(Arc::clone(&entity));
                }
            }
            self.by_id.insert(id.clone(), Arc::clone(&entity));
            *snap = Arc::new(values);
        });
        self.bump_version();

        is_new
    }

    /// Apply `f` to a copy of the entity with `id` and store the result.
    /// Returns the value before the change, or `None` if `id` is unknown.
    pub(crate) fn update(&self, id: &EntityId, f: impl FnOnce(&mut T)) -> Option<T> {
        let mut previous = None;

        self.snapshot.send_modify(|snap| {
            let Some(idx) = snap.iter().position(|e| e.id() == id) else {
                return;
            };
            let mut values: Vec<Arc<T>> = snap.as_ref().clone();
            if let Some(slot) = values.get_mut(idx) {
                let before = slot.as_ref().clone();
                let mut after = before.clone();
                f(&mut after);
                let after = Arc::new(after);
                *slot = Arc::clone(&after);
                self.by_id.insert(id.clone(), after);
                previous = Some(before);
            }
            *snap = Arc::new(values);
        });

        if previous.is_some() {
            self.bump_version();
        }
        previous
    }

    /// Remove an entity. Returns its former position and value.
    pub(crate) fn remove(&self, id: &EntityId) -> Option<(usize, Arc<T>)> {
        let mut removed = None;

        self.snapshot.send_modify(|snap| {
            let Some(idx) = snap.iter().position(|e| e.id() == id) else {
                return;
            };
            let mut values: Vec<Arc<T>> = snap.as_ref().clone();
            let entity = values.remove(idx);
            self.by_id.remove(id);
            removed = Some((idx, entity));
            *snap = Arc::new(values);
        });

        if removed.is_some() {
            self.bump_version();
        }
        removed
    }

    /// Put a previously removed entity back at `index` (clamped to the
    /// current length). Replaces any entity that has since reappeared
    /// under the same id.
    pub(crate) fn restore(&self, index: usize, entity: Arc<T>) {
        let id = entity.id().clone();

        self.snapshot.send_modify(|snap| {
            let mut values: Vec<Arc<T>> = snap
                .iter()
                .filter(|e| e.id() != &id)
                .cloned()
                .collect();
            let at = index.min(values.len());
            values.insert(at, Arc::clone(&entity));
            self.by_id.insert(id.clone(), entity);
            *snap = Arc::new(values);
        });
        self.bump_version();
    }

    /// Look up an entity by id.
    pub(crate) fn get(&self, id: &EntityId) -> Option<Arc<T>> {
        self.by_id.get(id).map(|r| Arc::clone(r.value()))
    }

    /// Get the current snapshot (cheap `Arc` clone).
    pub(crate) fn snapshot(&self) -> Snapshot<T> {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes via a `watch::Receiver`.
    pub(crate) fn subscribe(&self) -> watch::Receiver<Snapshot<T>> {
        self.snapshot.subscribe()
    }

    /// Remove all entities.
    pub(crate) fn clear(&self) {
        self.snapshot.send_modify(|snap| {
            self.by_id.clear();
            *snap = Arc::new(Vec::new());
        });
        self.bump_version();
    }

    pub(crate) fn len(&self) -> usize {
        self.snapshot.borrow().len()
    }

    pub(crate) fn version(&self) -> u64 {
        *self.version.borrow()
    }

    // ── Private helpers ──────────────────────────────────────────────

    /// Increment the version counter.
    fn bump_version(&self) {
        self.version.send_modify(|v| *v += 1);
    }
}
