// ── Liked-ID sets ──
//
// A user's favourites (teachers, videos) as a set of ids. Toggled
// optimistically by the mutation gateway and replaced wholesale by the
// listener mirroring `users/{uid}/liked*`.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::watch;

use crate::model::EntityId;

/// Shared, immutable view of a liked set.
pub type LikedIds = Arc<BTreeSet<EntityId>>;

pub struct LikedIdSet {
    ids: watch::Sender<LikedIds>,
}

impl LikedIdSet {
    pub fn new() -> Self {
        let (ids, _) = watch::channel(Arc::new(BTreeSet::new()));
        Self { ids }
    }

    /// Remove `id` if present, otherwise add it. Returns `true` when `id`
    /// is in the set afterwards.
    pub fn toggle(&self, id: &EntityId) -> bool {
        let mut present = false;
        self.ids.send_modify(|set| {
            let mut next = set.as_ref().clone();
            present = if next.remove(id) {
                false
            } else {
                next.insert(id.clone());
                true
            };
            *set = Arc::new(next);
        });
        present
    }

    /// Force `id` in or out of the set. No-op when it already matches.
    pub fn set_membership(&self, id: &EntityId, present: bool) {
        self.ids.send_if_modified(|set| {
            if set.contains(id) == present {
                return false;
            }
            let mut next = set.as_ref().clone();
            if present {
                next.insert(id.clone());
            } else {
                next.remove(id);
            }
            *set = Arc::new(next);
            true
        });
    }

    /// Replace the whole set. Duplicates collapse.
    pub fn replace_all(&self, ids: impl IntoIterator<Item = EntityId>) {
        let next: BTreeSet<EntityId> = ids.into_iter().collect();
        self.ids.send_replace(Arc::new(next));
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.ids.borrow().contains(id)
    }

    pub fn snapshot(&self) -> LikedIds {
        self.ids.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.ids.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.replace_all(std::iter::empty());
    }

    pub fn subscribe(&self) -> watch::Receiver<LikedIds> {
        self.ids.subscribe()
    }
}

impl Default for LikedIdSet {
    fn default() -> Self {
        Self::new()
    }
}
