// ── Communication domain types ──
//
// Notices, direct messages, and complaints raised by students/parents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::entity_id::EntityId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub id: EntityId,
    pub title: String,
    pub body: String,
    pub author: String,
    pub category: String,
    pub posted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: EntityId,
    pub sender_id: EntityId,
    pub recipient_id: EntityId,
    pub text: String,
    pub sent_at: Option<DateTime<Utc>>,
    pub read: bool,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ComplaintStatus {
    #[default]
    Open,
    Resolved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Complaint {
    pub id: EntityId,
    pub student_id: Option<EntityId>,
    pub subject: String,
    pub description: String,
    pub status: ComplaintStatus,
    pub created_at: Option<DateTime<Utc>>,
}

impl Complaint {
    pub fn is_resolved(&self) -> bool {
        self.status == ComplaintStatus::Resolved
    }
}
