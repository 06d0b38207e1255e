// ── Optimistic mutation gateway ──
//
// Every user write flows through `MutationGateway::execute`. The local
// store changes first (Pending), then the remote write runs; success
// leaves the change in place (Committed), failure applies the inverse
// (RolledBack) and hands the error back. Writes to one entity are
// serialized so a double-tap cannot interleave.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, warn};

use crate::error::{CoreError, RemoteError};
use crate::model::{
    CollectionKind, Complaint, ComplaintStatus, EntityId, Fields, Identified, Message,
};
use crate::remote::{DocumentPath, RemoteStore, SetOptions};
use crate::store::{DataStore, LikedIdSet};

const EVENT_CHANNEL_SIZE: usize = 64;

/// Sub-collection under `users/{uid}` holding liked teacher ids.
pub const LIKED_TEACHERS: &str = "likedTeachers";
/// Sub-collection under `users/{uid}` holding liked video ids.
pub const LIKED_VIDEOS: &str = "likedVideos";

/// Path of a user's liked-ids sub-collection.
pub fn liked_collection(user_id: &EntityId, sub_collection: &str) -> String {
    format!("users/{user_id}/{sub_collection}")
}

// ── Mutation ────────────────────────────────────────────────────────

/// All optimistic writes the sync layer supports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    // ── Likes ────────────────────────────────────────────────────────
    ToggleTeacherLike {
        user_id: EntityId,
        teacher_id: EntityId,
    },
    ToggleVideoLike {
        user_id: EntityId,
        video_id: EntityId,
    },

    // ── Complaints ───────────────────────────────────────────────────
    ResolveComplaint { id: EntityId },
    DeleteComplaint { id: EntityId },

    // ── Messages ─────────────────────────────────────────────────────
    MarkMessageRead { id: EntityId },
}

impl Mutation {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ToggleTeacherLike { .. } => "toggle_teacher_like",
            Self::ToggleVideoLike { .. } => "toggle_video_like",
            Self::ResolveComplaint { .. } => "resolve_complaint",
            Self::DeleteComplaint { .. } => "delete_complaint",
            Self::MarkMessageRead { .. } => "mark_message_read",
        }
    }

    /// Remote document this mutation writes.
    pub fn path(&self) -> DocumentPath {
        match self {
            Self::ToggleTeacherLike {
                user_id,
                teacher_id,
            } => DocumentPath::new(liked_collection(user_id, LIKED_TEACHERS), teacher_id.clone()),
            Self::ToggleVideoLike { user_id, video_id } => {
                DocumentPath::new(liked_collection(user_id, LIKED_VIDEOS), video_id.clone())
            }
            Self::ResolveComplaint { id } | Self::DeleteComplaint { id } => {
                DocumentPath::new(CollectionKind::Complaints.path(), id.clone())
            }
            Self::MarkMessageRead { id } => {
                DocumentPath::new(CollectionKind::Messages.path(), id.clone())
            }
        }
    }
}

/// What a settled mutation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// A like toggle committed; `liked` is the new membership.
    Toggled { liked: bool },
    /// The change committed.
    Applied,
    /// The entity was already in the requested state; nothing was written.
    Unchanged,
}

/// Lifecycle of one mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum MutationPhase {
    Pending,
    Committed,
    RolledBack,
}

/// Broadcast on every phase transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationEvent {
    pub mutation: Mutation,
    pub phase: MutationPhase,
}

// ── MutationGateway ─────────────────────────────────────────────────

pub struct MutationGateway {
    remote: Arc<dyn RemoteStore>,
    store: Arc<DataStore>,
    /// One async lock per written document path.
    locks: DashMap<String, Arc<Mutex<()>>>,
    events: broadcast::Sender<MutationEvent>,
}

impl MutationGateway {
    pub fn new(remote: Arc<dyn RemoteStore>, store: Arc<DataStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self {
            remote,
            store,
            locks: DashMap::new(),
            events,
        }
    }

    /// Phase transitions of every mutation run through this gateway.
    pub fn events(&self) -> broadcast::Receiver<MutationEvent> {
        self.events.subscribe()
    }

    /// Apply `mutation` locally, write it remotely, and resolve once the
    /// write has committed or been rolled back.
    pub async fn execute(&self, mutation: Mutation) -> Result<MutationOutcome, CoreError> {
        let key = mutation.path().to_string();
        let lock = Arc::clone(&self.locks.entry(key.clone()).or_default());

        let result = {
            let _guard = lock.lock().await;
            self.apply(&mutation).await
        };

        drop(lock);
        self.locks.remove_if(&key, |_, l| Arc::strong_count(l) == 1);
        result
    }

    async fn apply(&self, mutation: &Mutation) -> Result<MutationOutcome, CoreError> {
        match mutation {
            Mutation::ToggleTeacherLike { teacher_id, .. } => {
                self.toggle_like(mutation, &self.store.liked_teachers, teacher_id)
                    .await
            }
            Mutation::ToggleVideoLike { video_id, .. } => {
                self.toggle_like(mutation, &self.store.liked_videos, video_id)
                    .await
            }
            Mutation::ResolveComplaint { id } => self.resolve_complaint(mutation, id).await,
            Mutation::DeleteComplaint { id } => self.delete_complaint(mutation, id).await,
            Mutation::MarkMessageRead { id } => self.mark_message_read(mutation, id).await,
        }
    }

    // ── Handlers ─────────────────────────────────────────────────────

    async fn toggle_like(
        &self,
        mutation: &Mutation,
        set: &LikedIdSet,
        id: &EntityId,
    ) -> Result<MutationOutcome, CoreError> {
        let liked = set.toggle(id);
        self.emit(mutation, MutationPhase::Pending);

        let path = mutation.path();
        let write = if liked {
            let mut data = Fields::new();
            data.insert("likedAt".into(), Value::from(Utc::now().to_rfc3339()));
            self.remote.set(&path, data, SetOptions::REPLACE).await
        } else {
            self.remote.delete(&path).await
        };

        // A listener snapshot may have replaced the set mid-write.
        self.settle(mutation, write, || set.set_membership(id, !liked))?;
        Ok(MutationOutcome::Toggled { liked })
    }

    async fn resolve_complaint(
        &self,
        mutation: &Mutation,
        id: &EntityId,
    ) -> Result<MutationOutcome, CoreError> {
        let complaints = &self.store.complaints;
        let current = complaints.get(id).ok_or_else(|| not_found::<Complaint>(id))?;
        if current.is_resolved() {
            return Ok(MutationOutcome::Unchanged);
        }

        let Some(previous) = complaints.update(id, |c| c.status = ComplaintStatus::Resolved)
        else {
            return Err(not_found::<Complaint>(id));
        };
        self.emit(mutation, MutationPhase::Pending);

        let mut data = Fields::new();
        data.insert(
            "status".into(),
            Value::from(ComplaintStatus::Resolved.to_string()),
        );
        let write = self
            .remote
            .set(&mutation.path(), data, SetOptions::MERGE)
            .await;

        self.settle(mutation, write, || {
            complaints.update(id, |c| *c = previous);
        })?;
        Ok(MutationOutcome::Applied)
    }

    async fn delete_complaint(
        &self,
        mutation: &Mutation,
        id: &EntityId,
    ) -> Result<MutationOutcome, CoreError> {
        let complaints = &self.store.complaints;
        let (index, removed) = complaints
            .remove(id)
            .ok_or_else(|| not_found::<Complaint>(id))?;
        self.emit(mutation, MutationPhase::Pending);

        let write = self.remote.delete(&mutation.path()).await;

        self.settle(mutation, write, || complaints.restore(index, removed))?;
        Ok(MutationOutcome::Applied)
    }

    async fn mark_message_read(
        &self,
        mutation: &Mutation,
        id: &EntityId,
    ) -> Result<MutationOutcome, CoreError> {
        let messages = &self.store.messages;
        let current = messages.get(id).ok_or_else(|| not_found::<Message>(id))?;
        if current.read {
            return Ok(MutationOutcome::Unchanged);
        }

        let Some(previous) = messages.update(id, |m| m.read = true) else {
            return Err(not_found::<Message>(id));
        };
        self.emit(mutation, MutationPhase::Pending);

        let mut data = Fields::new();
        data.insert("read".into(), Value::Bool(true));
        let write = self
            .remote
            .set(&mutation.path(), data, SetOptions::MERGE)
            .await;

        self.settle(mutation, write, || {
            messages.update(id, |m| *m = previous);
        })?;
        Ok(MutationOutcome::Applied)
    }

    // ── Helpers ──────────────────────────────────────────────────────

    /// Commit or roll back depending on the remote write's result.
    fn settle(
        &self,
        mutation: &Mutation,
        write: Result<(), RemoteError>,
        rollback: impl FnOnce(),
    ) -> Result<(), CoreError> {
        match write {
            Ok(()) => {
                debug!(mutation = mutation.name(), path = %mutation.path(), "committed");
                self.emit(mutation, MutationPhase::Committed);
                Ok(())
            }
            Err(e) => {
                rollback();
                warn!(
                    mutation = mutation.name(),
                    path = %mutation.path(),
                    error = %e,
                    "remote write failed, local change rolled back"
                );
                self.emit(mutation, MutationPhase::RolledBack);
                Err(CoreError::WriteRejected { source: e })
            }
        }
    }

    fn emit(&self, mutation: &Mutation, phase: MutationPhase) {
        // No receivers is fine.
        let _ = self.events.send(MutationEvent {
            mutation: mutation.clone(),
            phase,
        });
    }
}

fn not_found<T: Identified>(id: &EntityId) -> CoreError {
    CoreError::NotFound {
        entity_type: T::ENTITY_TYPE.into(),
        identifier: id.to_string(),
    }
}
