// ── Sync session ──
//
// The facade an app holds for one signed-in user: starts every listener,
// runs the fee engine, and routes writes through the mutation gateway.
// Cheaply cloneable; all clones share one session.

use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::LocalCache;
use crate::config::SyncConfig;
use crate::error::CoreError;
use crate::fees;
use crate::gateway::{
    LIKED_TEACHERS, LIKED_VIDEOS, Mutation, MutationGateway, MutationOutcome, liked_collection,
};
use crate::listener::{ListenerHandle, ListenerManager};
use crate::model::{CollectionKind, EntityId};
use crate::remote::{CollectionSelector, RemoteStore};
use crate::store::DataStore;

// ── SessionState ────────────────────────────────────────────────────

/// Session lifecycle observable by consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Created, never started.
    Idle,
    Running { user_id: EntityId },
    /// Stopped after running; user-scoped data has been cleared.
    Stopped,
}

// ── SyncSession ─────────────────────────────────────────────────────

#[derive(Clone)]
pub struct SyncSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: Arc<SyncConfig>,
    store: Arc<DataStore>,
    listeners: ListenerManager,
    gateway: MutationGateway,
    state: watch::Sender<SessionState>,
    cancel: CancellationToken,
    active: Mutex<Option<ActiveSession>>,
}

/// Everything started by one `start()` call.
struct ActiveSession {
    user_id: EntityId,
    handles: Vec<ListenerHandle>,
    cancel: CancellationToken,
    fee_task: JoinHandle<()>,
}

impl SyncSession {
    /// Create a session. Does NOT subscribe to anything until
    /// [`start()`](Self::start).
    pub fn new(
        config: SyncConfig,
        remote: Arc<dyn RemoteStore>,
        cache: Arc<dyn LocalCache>,
    ) -> Self {
        let store = Arc::new(DataStore::new());
        let listeners = ListenerManager::new(Arc::clone(&remote), cache, config.clone());
        let gateway = MutationGateway::new(remote, Arc::clone(&store));
        let (state, _) = watch::channel(SessionState::Idle);

        Self {
            inner: Arc::new(SessionInner {
                config: Arc::new(config),
                store,
                listeners,
                gateway,
                state,
                cancel: CancellationToken::new(),
                active: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<DataStore> {
        &self.inner.store
    }

    /// The listener manager, for ad-hoc listeners and one-shot reads.
    pub fn listeners(&self) -> &ListenerManager {
        &self.inner.listeners
    }

    pub fn gateway(&self) -> &MutationGateway {
        &self.inner.gateway
    }

    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// User the session is running for, if any.
    pub fn user_id(&self) -> Option<EntityId> {
        match &*self.inner.state.borrow() {
            SessionState::Running { user_id } => Some(user_id.clone()),
            _ => None,
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Start listening for `user_id`. A session already running for
    /// another user is stopped first.
    pub async fn start(&self, user_id: impl Into<EntityId>) -> Result<(), CoreError> {
        let user_id = user_id.into();
        if user_id.is_empty() {
            return Err(CoreError::Internal("cannot start a session without a user id".into()));
        }

        let mut active = self.inner.active.lock().await;
        if let Some(previous) = active.take() {
            if previous.user_id == user_id {
                *active = Some(previous);
                debug!(user = %user_id, "session already running");
                return Ok(());
            }
            self.shutdown(previous).await;
        }

        let cancel = self.inner.cancel.child_token();
        let handles = self.spawn_listeners(&user_id);
        let fee_task = tokio::spawn(fees::reconcile_task(
            Arc::clone(&self.inner.store),
            Arc::clone(&self.inner.config),
            cancel.clone(),
        ));

        info!(user = %user_id, listeners = handles.len(), "sync session started");
        self.inner.state.send_replace(SessionState::Running {
            user_id: user_id.clone(),
        });
        *active = Some(ActiveSession {
            user_id,
            handles,
            cancel,
            fee_task,
        });
        Ok(())
    }

    /// Dispose every listener, stop the fee engine, and clear the signed-in
    /// user's data. Shared collections stay as last seen. Safe to call
    /// when not running.
    pub async fn stop(&self) {
        let Some(active) = self.inner.active.lock().await.take() else {
            return;
        };
        self.shutdown(active).await;
        self.inner.state.send_replace(SessionState::Stopped);
    }

    /// Run a mutation through the gateway.
    pub async fn execute(&self, mutation: Mutation) -> Result<MutationOutcome, CoreError> {
        if !matches!(*self.inner.state.borrow(), SessionState::Running { .. }) {
            return Err(CoreError::SessionNotStarted);
        }
        self.inner.gateway.execute(mutation).await
    }

    /// Like or unlike a teacher as the signed-in user.
    pub async fn toggle_teacher_like(
        &self,
        teacher_id: impl Into<EntityId>,
    ) -> Result<MutationOutcome, CoreError> {
        let user_id = self.user_id().ok_or(CoreError::SessionNotStarted)?;
        self.execute(Mutation::ToggleTeacherLike {
            user_id,
            teacher_id: teacher_id.into(),
        })
        .await
    }

    /// Like or unlike a video as the signed-in user.
    pub async fn toggle_video_like(
        &self,
        video_id: impl Into<EntityId>,
    ) -> Result<MutationOutcome, CoreError> {
        let user_id = self.user_id().ok_or(CoreError::SessionNotStarted)?;
        self.execute(Mutation::ToggleVideoLike {
            user_id,
            video_id: video_id.into(),
        })
        .await
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn spawn_listeners(&self, user_id: &EntityId) -> Vec<ListenerHandle> {
        let store = &self.inner.store;
        let lm = &self.inner.listeners;
        let messages = CollectionSelector::collection(CollectionKind::Messages)
            .where_eq("recipientId", user_id.as_str());

        vec![
            lm.bind(Arc::clone(&store.courses), &CollectionKind::Courses.into()),
            lm.bind(Arc::clone(&store.teachers), &CollectionKind::Teachers.into()),
            lm.bind(Arc::clone(&store.notices), &CollectionKind::Notices.into()),
            lm.bind(Arc::clone(&store.videos), &CollectionKind::Videos.into()),
            lm.bind(Arc::clone(&store.students), &CollectionKind::Students.into()),
            lm.bind(Arc::clone(&store.timetable), &CollectionKind::Timetable.into()),
            lm.bind(Arc::clone(&store.fees), &CollectionKind::Fees.into()),
            lm.bind(Arc::clone(&store.exams), &CollectionKind::Exams.into()),
            lm.bind(Arc::clone(&store.complaints), &CollectionKind::Complaints.into()),
            lm.bind(Arc::clone(&store.messages), &messages),
            lm.bind_liked(
                Arc::clone(&store.liked_teachers),
                &CollectionSelector::new(liked_collection(user_id, LIKED_TEACHERS)),
            ),
            lm.bind_liked(
                Arc::clone(&store.liked_videos),
                &CollectionSelector::new(liked_collection(user_id, LIKED_VIDEOS)),
            ),
        ]
    }

    async fn shutdown(&self, active: ActiveSession) {
        for handle in &active.handles {
            handle.dispose();
        }
        active.cancel.cancel();
        // Listener tasks can still publish until they exit.
        for handle in active.handles {
            handle.join().await;
        }
        if let Err(e) = active.fee_task.await {
            warn!(error = %e, "fee reconciliation task ended abnormally");
        }
        self.inner.store.clear_user_scoped();
        info!(user = %active.user_id, "sync session stopped");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::cache::{MemoryCache, SlowCache};
    use crate::model::{DataSource, Document, FeeStatus, Message, Record};
    use crate::remote::MemoryRemoteStore;

    async fn settle(mut pred: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !pred() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }

    fn seeded_remote() -> MemoryRemoteStore {
        let remote = MemoryRemoteStore::new();
        remote.seed(
            "students",
            [
                Document::from_value("s1", json!({ "name": "Asha", "rollNumber": "1" })),
                Document::from_value("s2", json!({ "name": "Ravi", "rollNumber": "2" })),
            ],
        );
        remote.seed(
            "fees",
            [Document::from_value("s1", json!({ "totalFee": 50000, "paidAmount": 20000 }))],
        );
        remote.seed(
            "messages",
            [
                Document::from_value("m1", json!({ "recipientId": "u1", "text": "hi" })),
                Document::from_value("m2", json!({ "recipientId": "u2", "text": "hey" })),
            ],
        );
        remote.seed(
            "complaints",
            [Document::from_value("c1", json!({ "subject": "Bus", "status": "open" }))],
        );
        remote
    }

    fn session(remote: &MemoryRemoteStore) -> SyncSession {
        SyncSession::new(
            SyncConfig::default(),
            Arc::new(remote.clone()),
            Arc::new(MemoryCache::new()),
        )
    }

    #[tokio::test]
    async fn start_populates_stores_and_fee_view() {
        let remote = seeded_remote();
        let session = session(&remote);
        assert_eq!(session.state(), SessionState::Idle);

        session.start("u1").await.unwrap();
        assert_eq!(session.user_id(), Some("u1".into()));
        let store = Arc::clone(session.store());

        settle(|| store.fee_records.len() == 2).await;
        let s1 = store.fee_record_for(&"s1".into()).unwrap();
        assert_eq!((s1.pending, s1.status), (30_000, FeeStatus::Partial));
        let s2 = store.fee_record_for(&"s2".into()).unwrap();
        assert_eq!(s2.status, FeeStatus::Pending);

        settle(|| store.messages.source() == DataSource::Live).await;
        assert_eq!(store.messages.len(), 1);
        settle(|| store.courses.source() == DataSource::Fallback).await;

        session.stop().await;
    }

    #[tokio::test]
    async fn execute_requires_running_session() {
        let remote = seeded_remote();
        let session = session(&remote);
        let err = session
            .execute(Mutation::ResolveComplaint { id: "c1".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::SessionNotStarted));
        assert!(session.toggle_teacher_like("t1").await.is_err());
    }

    #[tokio::test]
    async fn writes_flow_back_through_listeners() {
        let remote = seeded_remote();
        let session = session(&remote);
        session.start("u1").await.unwrap();
        let store = Arc::clone(session.store());
        settle(|| store.complaints.len() == 1).await;

        session
            .execute(Mutation::ResolveComplaint { id: "c1".into() })
            .await
            .unwrap();
        assert!(store.complaint_by_id(&"c1".into()).unwrap().is_resolved());

        session.toggle_teacher_like("t9").await.unwrap();
        assert!(store.liked_teachers.contains(&"t9".into()));
        assert_eq!(remote.documents("users/u1/likedTeachers").len(), 1);

        session.stop().await;
    }

    #[tokio::test]
    async fn stop_disposes_listeners_and_clears_user_data() {
        let remote = seeded_remote();
        let session = session(&remote);
        let mut state = session.watch_state();
        session.start("u1").await.unwrap();
        let store = Arc::clone(session.store());
        settle(|| store.complaints.len() == 1 && store.students.len() == 2).await;
        assert!(remote.active_subscriptions() > 0);

        session.stop().await;
        settle(|| remote.active_subscriptions() == 0).await;
        assert_eq!(session.state(), SessionState::Stopped);
        assert!(state.has_changed().unwrap());
        assert_eq!(*state.borrow_and_update(), SessionState::Stopped);
        assert!(store.complaints.is_empty());
        assert!(store.fee_records.is_empty());
        assert_eq!(store.students.len(), 2);

        session.stop().await;
        assert_eq!(session.state(), SessionState::Stopped);
    }

    #[tokio::test]
    async fn stop_during_cache_read_keeps_user_data_cleared() {
        let remote = seeded_remote();
        let cache = Arc::new(SlowCache::new(Duration::from_millis(50)));
        let cached = vec![Message::from_document(&Document::from_value(
            "m1",
            json!({ "recipientId": "u1", "text": "hi" }),
        ))];
        crate::cache::store_json(cache.as_ref(), "cache:messages?recipientId=u1", &cached)
            .await
            .unwrap();
        let session = SyncSession::new(
            SyncConfig::default(),
            Arc::new(remote.clone()),
            Arc::clone(&cache) as Arc<dyn LocalCache>,
        );

        session.start("u1").await.unwrap();
        session.stop().await;
        let store = Arc::clone(session.store());
        assert!(store.messages.is_empty());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(store.messages.is_empty());
        assert_eq!(store.messages.source(), DataSource::Empty);
        assert_eq!(session.state(), SessionState::Stopped);
    }

    #[tokio::test]
    async fn starting_for_another_user_switches_scope() {
        let remote = seeded_remote();
        let session = session(&remote);
        session.start("u1").await.unwrap();
        let store = Arc::clone(session.store());
        settle(|| store.messages.len() == 1).await;
        assert_eq!(store.messages.snapshot()[0].id.as_str(), "m1");

        session.start("u2").await.unwrap();
        settle(|| {
            store
                .messages
                .snapshot()
                .first()
                .is_some_and(|m| m.id.as_str() == "m2")
        })
        .await;
        assert_eq!(session.user_id(), Some("u2".into()));

        session.stop().await;
    }

    #[tokio::test]
    async fn empty_user_id_is_rejected() {
        let session = session(&MemoryRemoteStore::new());
        assert!(session.start("").await.is_err());
        assert_eq!(session.state(), SessionState::Idle);
    }
}
