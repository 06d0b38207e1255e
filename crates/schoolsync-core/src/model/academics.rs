// ── Academic domain types ──
//
// Courses, lecture videos, exam results, and timetable sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::entity_id::EntityId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: EntityId,
    pub title: String,
    pub description: String,
    pub teacher_id: Option<EntityId>,
    /// Human-readable duration, e.g. "12 weeks".
    pub duration: String,
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    pub id: EntityId,
    pub title: String,
    pub url: String,
    pub course_id: Option<EntityId>,
    pub duration_secs: u32,
    pub likes: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamEntry {
    pub id: EntityId,
    pub student_id: EntityId,
    pub exam_name: String,
    pub subject: String,
    pub marks_obtained: f64,
    pub max_marks: f64,
    pub date: Option<DateTime<Utc>>,
}

impl ExamEntry {
    /// Score as a percentage of `max_marks`; `None` when the exam has no
    /// maximum recorded.
    pub fn percentage(&self) -> Option<f64> {
        (self.max_marks > 0.0).then(|| self.marks_obtained / self.max_marks * 100.0)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

/// One slot in the class timetable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSession {
    pub id: EntityId,
    pub class_name: String,
    /// `None` when the remote document carries an unrecognised day.
    pub day: Option<Weekday>,
    /// Start and end times as "HH:MM" strings, as entered by staff.
    pub start_time: String,
    pub end_time: String,
    pub subject: String,
    pub teacher_id: Option<EntityId>,
    pub room: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exam(marks: f64, max: f64) -> ExamEntry {
        ExamEntry {
            id: "e1".into(),
            student_id: "s1".into(),
            exam_name: "Midterm".into(),
            subject: "Maths".into(),
            marks_obtained: marks,
            max_marks: max,
            date: None,
        }
    }

    #[test]
    fn percentage_of_max_marks() {
        let pct = exam(45.0, 60.0).percentage().unwrap_or_default();
        assert!((pct - 75.0).abs() < 1e-9);
    }

    #[test]
    fn percentage_is_none_without_max() {
        assert!(exam(10.0, 0.0).percentage().is_none());
    }

    #[test]
    fn weekday_parses_case_insensitively() {
        assert_eq!("Tuesday".parse::<Weekday>().ok(), Some(Weekday::Tuesday));
        assert_eq!("FRIDAY".parse::<Weekday>().ok(), Some(Weekday::Friday));
        assert!("funday".parse::<Weekday>().is_err());
    }
}
