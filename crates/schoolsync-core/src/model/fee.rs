// ── Fee domain types ──
//
// `Fee` mirrors a document in the remote `fees` collection (keyed by the
// student id). `FeeRecord` is the derived per-student view; it is never
// written back to the remote store.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::entity_id::EntityId;

/// Raw fee document. All amounts are whole currency units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fee {
    /// Shared identity with the student this fee belongs to.
    pub id: EntityId,
    pub total_fee: i64,
    pub paid_amount: i64,
    pub due_date: Option<String>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FeeStatus {
    Paid,
    Partial,
    Pending,
}

/// Per-student fee view joined from `students` and `fees`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeRecord {
    /// The student's id (also the fee document's id).
    pub id: EntityId,
    pub student_name: String,
    pub class_name: String,
    pub roll_number: String,
    pub total_fee: i64,
    pub paid_amount: i64,
    pub pending: i64,
    pub status: FeeStatus,
    /// `false` when no fee document existed and defaults were synthesized.
    pub has_fee_document: bool,
}

/// Totals over a set of fee records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSummary {
    pub students: usize,
    pub paid: usize,
    pub partial: usize,
    pub pending: usize,
    pub total_fee: i64,
    pub collected: i64,
    pub outstanding: i64,
}

impl FeeSummary {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a FeeRecord>) -> Self {
        records.into_iter().fold(Self::default(), |mut acc, r| {
            acc.students += 1;
            match r.status {
                FeeStatus::Paid => acc.paid += 1,
                FeeStatus::Partial => acc.partial += 1,
                FeeStatus::Pending => acc.pending += 1,
            }
            acc.total_fee = acc.total_fee.saturating_add(r.total_fee);
            acc.collected = acc.collected.saturating_add(r.paid_amount);
            acc.outstanding = acc.outstanding.saturating_add(r.pending.max(0));
            acc
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(total: i64, paid: i64, status: FeeStatus) -> FeeRecord {
        FeeRecord {
            id: "s".into(),
            student_name: String::new(),
            class_name: String::new(),
            roll_number: String::new(),
            total_fee: total,
            paid_amount: paid,
            pending: total - paid,
            status,
            has_fee_document: true,
        }
    }

    #[test]
    fn summary_counts_each_status_and_sums_amounts() {
        let records = [
            record(50_000, 50_000, FeeStatus::Paid),
            record(50_000, 20_000, FeeStatus::Partial),
            record(40_000, 0, FeeStatus::Pending),
        ];
        let summary = FeeSummary::from_records(&records);
        assert_eq!(summary.students, 3);
        assert_eq!((summary.paid, summary.partial, summary.pending), (1, 1, 1));
        assert_eq!(summary.total_fee, 140_000);
        assert_eq!(summary.collected, 70_000);
        assert_eq!(summary.outstanding, 70_000);
    }

    #[test]
    fn status_renders_lowercase() {
        assert_eq!(FeeStatus::Partial.to_string(), "partial");
        assert_eq!(
            serde_json::to_string(&FeeStatus::Paid).unwrap_or_default(),
            "\"paid\""
        );
    }
}
