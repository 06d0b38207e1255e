// ── People: students and teachers ──

use serde::{Deserialize, Serialize};

use super::entity_id::EntityId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: EntityId,
    pub name: String,
    pub roll_number: String,
    /// Class the student is enrolled in (e.g. "7").
    pub class_name: String,
    pub section: String,
    pub parent_name: String,
    pub phone: String,
    pub email: String,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teacher {
    pub id: EntityId,
    pub name: String,
    pub subject: String,
    pub qualification: String,
    pub experience_years: u32,
    pub email: String,
    pub photo_url: Option<String>,
    /// Aggregate like count maintained remotely.
    pub likes: u32,
}
