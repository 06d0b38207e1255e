// ── Document-to-domain conversions ──
//
// Bridges raw remote `Document`s into canonical `crate::model` types. Each
// `Record` impl reads the remote (camelCase) field names, parses strings
// into strong types, and fills defaults for anything missing. A mapping
// never fails: a malformed document still yields a record.

use crate::model::{
    ClassSession, Complaint, ComplaintStatus, Course, Document, EntityId, ExamEntry, Fee,
    Identified, Message, Notice, Record, Student, Teacher, Video, Weekday,
};

// ── Helpers ────────────────────────────────────────────────────────

/// Optional reference to another entity; empty strings read as `None`.
fn opt_ref(doc: &Document, field: &str) -> Option<EntityId> {
    doc.opt_string(field)
        .filter(|s| !s.trim().is_empty())
        .map(EntityId::from)
}

/// Optional free-text field; empty strings read as `None`.
fn opt_text(doc: &Document, field: &str) -> Option<String> {
    doc.opt_string(field).filter(|s| !s.trim().is_empty())
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

macro_rules! identified {
    ($ty:ty, $name:literal) => {
        impl Identified for $ty {
            const ENTITY_TYPE: &'static str = $name;

            fn id(&self) -> &EntityId {
                &self.id
            }
        }
    };
}

identified!(Student, "student");
identified!(Teacher, "teacher");
identified!(Course, "course");
identified!(Video, "video");
identified!(ExamEntry, "exam entry");
identified!(ClassSession, "class session");
identified!(Notice, "notice");
identified!(Message, "message");
identified!(Complaint, "complaint");
identified!(Fee, "fee");

// ── People ─────────────────────────────────────────────────────────

impl Record for Student {
    fn from_document(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            name: doc.string("name"),
            roll_number: doc.string("rollNumber"),
            class_name: doc.string("class"),
            section: doc.string("section"),
            parent_name: doc.string("parentName"),
            phone: doc.string("phone"),
            email: doc.string("email"),
            photo_url: opt_text(doc, "photoUrl"),
        }
    }
}

impl Record for Teacher {
    fn from_document(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            name: doc.string("name"),
            subject: doc.string("subject"),
            qualification: doc.string("qualification"),
            experience_years: doc.count("experience"),
            email: doc.string("email"),
            photo_url: opt_text(doc, "photoUrl"),
            likes: doc.count("likes"),
        }
    }
}

// ── Academics ──────────────────────────────────────────────────────

impl Record for Course {
    fn from_document(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            title: doc.string("title"),
            description: doc.string("description"),
            teacher_id: opt_ref(doc, "teacherId"),
            duration: doc.string("duration"),
            thumbnail_url: opt_text(doc, "thumbnail"),
        }
    }

    /// Shown when the school has not configured any courses yet.
    fn fallback() -> Vec<Self> {
        [
            ("default-mathematics", "Mathematics", "Numbers, algebra and geometry"),
            ("default-science", "Science", "Physics, chemistry and biology"),
            ("default-english", "English", "Reading, writing and grammar"),
            ("default-social-studies", "Social Studies", "History, geography and civics"),
            ("default-computer-science", "Computer Science", "Programming fundamentals"),
        ]
        .into_iter()
        .map(|(id, title, description)| Self {
            id: EntityId::from(id),
            title: title.to_owned(),
            description: description.to_owned(),
            teacher_id: None,
            duration: "1 year".to_owned(),
            thumbnail_url: None,
        })
        .collect()
    }
}

impl Record for Video {
    fn from_document(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            title: doc.string("title"),
            url: doc.string("url"),
            course_id: opt_ref(doc, "courseId"),
            duration_secs: doc.count("duration"),
            likes: doc.count("likes"),
        }
    }
}

impl Record for ExamEntry {
    fn from_document(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            student_id: EntityId::from(doc.string("studentId")),
            exam_name: doc.string("examName"),
            subject: doc.string("subject"),
            marks_obtained: non_negative(doc.float("marks")),
            max_marks: non_negative(doc.float("maxMarks")),
            date: doc.timestamp("date"),
        }
    }
}

impl Record for ClassSession {
    fn from_document(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            class_name: doc.string("class"),
            day: doc.opt_string("day").and_then(|d| d.trim().parse::<Weekday>().ok()),
            start_time: doc.string("startTime"),
            end_time: doc.string("endTime"),
            subject: doc.string("subject"),
            teacher_id: opt_ref(doc, "teacherId"),
            room: doc.string("room"),
        }
    }
}

// ── Communication ──────────────────────────────────────────────────

impl Record for Notice {
    fn from_document(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            title: doc.string("title"),
            body: doc.string("description"),
            author: doc.string("postedBy"),
            category: doc.string("category"),
            posted_at: doc.timestamp("date"),
        }
    }
}

impl Record for Message {
    fn from_document(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            sender_id: EntityId::from(doc.string("senderId")),
            recipient_id: EntityId::from(doc.string("recipientId")),
            text: doc.string("text"),
            sent_at: doc.timestamp("timestamp"),
            read: doc.boolean("read"),
        }
    }
}

impl Record for Complaint {
    fn from_document(doc: &Document) -> Self {
        let status = doc
            .opt_string("status")
            .and_then(|s| s.trim().parse::<ComplaintStatus>().ok())
            .unwrap_or_default();
        Self {
            id: doc.id.clone(),
            student_id: opt_ref(doc, "studentId"),
            subject: doc.string("subject"),
            description: doc.string("description"),
            status,
            created_at: doc.timestamp("createdAt"),
        }
    }
}

// ── Fees ───────────────────────────────────────────────────────────

impl Record for Fee {
    fn from_document(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            // Negative amounts read as zero; overpayment is kept.
            total_fee: doc.int("totalFee").max(0),
            paid_amount: doc.int("paidAmount").max(0),
            due_date: opt_text(doc, "dueDate"),
        }
    }
}
