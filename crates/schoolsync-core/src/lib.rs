//! Real-time sync and derived-state layer for the school-management client.
//!
//! This crate owns everything between the remote document database and the
//! screens that render it:
//!
//! - **[`SyncSession`]**: Facade for one signed-in user.
//!   [`start()`](SyncSession::start) subscribes every collection, spawns the
//!   fee engine, and enables writes; [`stop()`](SyncSession::stop) disposes
//!   it all and clears the user's data.
//!
//! - **[`DataStore`]**: Reactive storage built on `EntityStore<T>`
//!   (`DashMap` + `tokio::sync::watch`). Each store carries its collection,
//!   a `loading` flag, and where its data came from ([`DataSource`]).
//!
//! - **[`ListenerManager`]**: Binds remote subscriptions to entity stores,
//!   with cold-start cache placeholders, bundled fallbacks for empty
//!   collections, and idempotent [`ListenerHandle`] disposers.
//!
//! - **[`fees`]**: Joins students and fee documents into per-student
//!   [`FeeRecord`]s once both have arrived.
//!
//! - **[`MutationGateway`]**: Optimistic writes. The local store changes
//!   immediately, then commits or rolls back with the remote write.
//!
//! - **Boundaries**: [`RemoteStore`] and [`LocalCache`] are injected traits,
//!   with in-process implementations ([`MemoryRemoteStore`],
//!   [`MemoryCache`], [`FileCache`]) for tests and offline tools.

pub mod cache;
pub mod config;
pub mod convert;
pub mod error;
pub mod fees;
pub mod gateway;
pub mod listener;
pub mod model;
pub mod remote;
pub mod session;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use cache::{FileCache, LocalCache, MemoryCache};
pub use config::SyncConfig;
pub use error::{CacheError, CoreError, RemoteError};
pub use fees::{FeeReconciler, compute_fee_records};
pub use gateway::{Mutation, MutationEvent, MutationGateway, MutationOutcome, MutationPhase};
pub use listener::{ListenerHandle, ListenerManager};
pub use remote::{CollectionSelector, DocumentPath, MemoryRemoteStore, RemoteStore, SetOptions};
pub use session::{SessionState, SyncSession};
pub use store::{DataStore, EntityStore, LikedIdSet};
pub use stream::EntityStream;

// Re-export model types at the crate root for ergonomics.
pub use model::{
    ClassSession, CollectionKind, Complaint, ComplaintStatus, Course, DataSource, Document,
    EntityId, ExamEntry, Fee, FeeRecord, FeeStatus, FeeSummary, Fields, Identified, Message,
    Notice, Record, Student, Teacher, Video, Weekday,
};
