// ── Reactive data store ──
//
// Per-entity collections with push-based change notification.

mod collection;
mod data_store;
mod entity_store;
mod liked;

pub use collection::Snapshot;
pub use data_store::DataStore;
pub use entity_store::EntityStore;
pub use liked::{LikedIdSet, LikedIds};
