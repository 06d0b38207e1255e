// ── Central reactive data store ──
//
// Every entity store and liked set for one client, grouped so the
// session, fee engine and mutation gateway share a single `Arc<DataStore>`.
// Each store is individually `Arc`ed so a listener task can own the one
// it feeds.

use std::sync::Arc;

use strum::IntoEnumIterator;

use super::collection::Snapshot;
use super::entity_store::EntityStore;
use super::liked::LikedIdSet;
use crate::model::{
    ClassSession, CollectionKind, Complaint, Course, EntityId, ExamEntry, Fee, FeeRecord,
    FeeSummary, Message, Notice, Student, Teacher, Video,
};

/// Central reactive store for all domain entities.
pub struct DataStore {
    pub courses: Arc<EntityStore<Course>>,
    pub teachers: Arc<EntityStore<Teacher>>,
    pub notices: Arc<EntityStore<Notice>>,
    pub videos: Arc<EntityStore<Video>>,
    pub messages: Arc<EntityStore<Message>>,
    pub students: Arc<EntityStore<Student>>,
    pub fees: Arc<EntityStore<Fee>>,
    pub exams: Arc<EntityStore<ExamEntry>>,
    pub complaints: Arc<EntityStore<Complaint>>,
    pub timetable: Arc<EntityStore<ClassSession>>,
    /// Derived by the fee engine; never fed by a listener directly.
    pub fee_records: Arc<EntityStore<FeeRecord>>,
    pub liked_teachers: Arc<LikedIdSet>,
    pub liked_videos: Arc<LikedIdSet>,
}

impl DataStore {
    pub fn new() -> Self {
        Self {
            courses: Arc::new(EntityStore::new()),
            teachers: Arc::new(EntityStore::new()),
            notices: Arc::new(EntityStore::new()),
            videos: Arc::new(EntityStore::new()),
            messages: Arc::new(EntityStore::new()),
            students: Arc::new(EntityStore::new()),
            fees: Arc::new(EntityStore::new()),
            exams: Arc::new(EntityStore::new()),
            complaints: Arc::new(EntityStore::new()),
            timetable: Arc::new(EntityStore::new()),
            fee_records: Arc::new(EntityStore::new()),
            liked_teachers: Arc::new(LikedIdSet::new()),
            liked_videos: Arc::new(LikedIdSet::new()),
        }
    }

    // ── Single-entity lookups ────────────────────────────────────────

    pub fn student_by_id(&self, id: &EntityId) -> Option<Arc<Student>> {
        self.students.get(id)
    }

    pub fn teacher_by_id(&self, id: &EntityId) -> Option<Arc<Teacher>> {
        self.teachers.get(id)
    }

    pub fn complaint_by_id(&self, id: &EntityId) -> Option<Arc<Complaint>> {
        self.complaints.get(id)
    }

    pub fn fee_record_for(&self, student_id: &EntityId) -> Option<Arc<FeeRecord>> {
        self.fee_records.get(student_id)
    }

    // ── Derived reads ────────────────────────────────────────────────

    pub fn fee_summary(&self) -> FeeSummary {
        let records = self.fee_records.snapshot();
        FeeSummary::from_records(records.iter().map(Arc::as_ref))
    }

    /// Exam entries for one student, in snapshot order.
    pub fn exams_for(&self, student_id: &EntityId) -> Vec<Arc<ExamEntry>> {
        self.exams
            .snapshot()
            .iter()
            .filter(|e| &e.student_id == student_id)
            .cloned()
            .collect()
    }

    pub fn unread_messages(&self) -> usize {
        self.messages.snapshot().iter().filter(|m| !m.read).count()
    }

    pub fn open_complaints(&self) -> Snapshot<Complaint> {
        Arc::new(
            self.complaints
                .snapshot()
                .iter()
                .filter(|c| !c.is_resolved())
                .cloned()
                .collect(),
        )
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Number of records currently held for `kind`.
    pub fn len_of(&self, kind: CollectionKind) -> usize {
        match kind {
            CollectionKind::Courses => self.courses.len(),
            CollectionKind::Teachers => self.teachers.len(),
            CollectionKind::Notices => self.notices.len(),
            CollectionKind::Videos => self.videos.len(),
            CollectionKind::Messages => self.messages.len(),
            CollectionKind::Students => self.students.len(),
            CollectionKind::Fees => self.fees.len(),
            CollectionKind::Exams => self.exams.len(),
            CollectionKind::Complaints => self.complaints.len(),
            CollectionKind::Timetable => self.timetable.len(),
        }
    }

    /// Clear one remote-backed collection.
    pub fn clear_collection(&self, kind: CollectionKind) {
        match kind {
            CollectionKind::Courses => self.courses.clear(),
            CollectionKind::Teachers => self.teachers.clear(),
            CollectionKind::Notices => self.notices.clear(),
            CollectionKind::Videos => self.videos.clear(),
            CollectionKind::Messages => self.messages.clear(),
            CollectionKind::Students => self.students.clear(),
            CollectionKind::Fees => self.fees.clear(),
            CollectionKind::Exams => self.exams.clear(),
            CollectionKind::Complaints => self.complaints.clear(),
            CollectionKind::Timetable => self.timetable.clear(),
        }
    }

    /// Drop everything tied to the signed-in user: user-scoped
    /// collections, the derived fee view, and both liked sets.
    pub fn clear_user_scoped(&self) {
        for kind in CollectionKind::iter() {
            if kind.is_user_scoped() {
                self.clear_collection(kind);
            }
        }
        self.fee_records.clear();
        self.liked_teachers.clear();
        self.liked_videos.clear();
    }

    /// Drop everything.
    pub fn clear_all(&self) {
        for kind in CollectionKind::iter() {
            self.clear_collection(kind);
        }
        self.fee_records.clear();
        self.liked_teachers.clear();
        self.liked_videos.clear();
    }
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new()
    }
}
