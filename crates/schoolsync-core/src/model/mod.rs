// ── Unified domain model ──
//
// Every type in this module is the canonical, closed representation of a
// record kind. Raw remote documents are mapped into these types by the
// per-kind functions in `crate::convert`; nothing downstream sees an open
// field map.

pub mod common;
pub mod document;
pub mod entity_id;

pub mod academics;
pub mod communication;
pub mod fee;
pub mod people;

use serde::Serialize;
use serde::de::DeserializeOwned;

// ── Re-exports ──────────────────────────────────────────────────────

pub use common::{CollectionKind, DataSource};
pub use document::{Document, Fields};
pub use entity_id::EntityId;

pub use academics::{ClassSession, Course, ExamEntry, Video, Weekday};
pub use communication::{Complaint, ComplaintStatus, Message, Notice};
pub use fee::{Fee, FeeRecord, FeeStatus, FeeSummary};
pub use people::{Student, Teacher};

// ── Record traits ───────────────────────────────────────────────────

/// Anything an [`EntityStore`](crate::store::EntityStore) can hold.
pub trait Identified: Clone + Send + Sync + 'static {
    /// Entity type name used in logs and errors.
    const ENTITY_TYPE: &'static str;

    fn id(&self) -> &EntityId;
}

/// A record kind mirrored from a remote collection.
pub trait Record: Identified + Serialize + DeserializeOwned {
    /// Map a raw document into a record. Missing or mistyped fields are
    /// defaulted; this never fails.
    fn from_document(doc: &Document) -> Self;

    /// Bundled dataset published in place of an empty live snapshot.
    /// Most kinds have none.
    fn fallback() -> Vec<Self> {
        Vec::new()
    }
}

impl Identified for FeeRecord {
    const ENTITY_TYPE: &'static str = "fee record";

    fn id(&self) -> &EntityId {
        &self.id
    }
}
