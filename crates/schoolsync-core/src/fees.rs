// ── Fee reconciliation engine ──
//
// Joins the `students` and `fees` stores into one FeeRecord per student.
// Nothing is emitted until both inputs have delivered a snapshot; after
// that every change to either input triggers a full rebuild.

use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::SyncConfig;
use crate::model::{DataSource, EntityId, Fee, FeeRecord, FeeStatus, Identified, Student};
use crate::store::{DataStore, EntityStore, Snapshot};

/// Classify a fee by what is still owed.
///
/// Overpayment (negative pending) counts as paid.
pub fn fee_status(total_fee: i64, pending: i64) -> FeeStatus {
    if pending <= 0 {
        FeeStatus::Paid
    } else if pending == total_fee {
        FeeStatus::Pending
    } else {
        FeeStatus::Partial
    }
}

/// Build one record per student, in student order.
///
/// A student without a fee document gets `default_total_fee` with nothing
/// paid.
pub fn compute_fee_records(
    students: &[Arc<Student>],
    fees: &[Arc<Fee>],
    default_total_fee: i64,
) -> Vec<FeeRecord> {
    let by_student: HashMap<&EntityId, &Fee> =
        fees.iter().map(|f| (&f.id, f.as_ref())).collect();

    students
        .iter()
        .map(|student| {
            let (total_fee, paid_amount, has_fee_document) = match by_student.get(&student.id) {
                Some(fee) => (fee.total_fee, fee.paid_amount, true),
                None => (default_total_fee, 0, false),
            };
            let pending = total_fee.saturating_sub(paid_amount);
            FeeRecord {
                id: student.id.clone(),
                student_name: student.name.clone(),
                class_name: student.class_name.clone(),
                roll_number: student.roll_number.clone(),
                total_fee,
                paid_amount,
                pending,
                status: fee_status(total_fee, pending),
                has_fee_document,
            }
        })
        .collect()
}

// ── FeeReconciler ───────────────────────────────────────────────────

/// Both-ready gate plus the latest input of each side.
///
/// Feed it snapshots as they arrive; it answers with a rebuilt view once
/// both sides have been seen, and `None` before that.
#[derive(Debug)]
pub struct FeeReconciler {
    default_total_fee: i64,
    students: Option<Snapshot<Student>>,
    fees: Option<Snapshot<Fee>>,
}

impl FeeReconciler {
    pub fn new(default_total_fee: i64) -> Self {
        Self {
            default_total_fee,
            students: None,
            fees: None,
        }
    }

    pub fn on_students(&mut self, students: Snapshot<Student>) -> Option<Vec<FeeRecord>> {
        self.students = Some(students);
        self.rebuild()
    }

    pub fn on_fees(&mut self, fees: Snapshot<Fee>) -> Option<Vec<FeeRecord>> {
        self.fees = Some(fees);
        self.rebuild()
    }

    pub fn students_ready(&self) -> bool {
        self.students.is_some()
    }

    pub fn fees_ready(&self) -> bool {
        self.fees.is_some()
    }

    pub fn is_ready(&self) -> bool {
        self.students_ready() && self.fees_ready()
    }

    fn rebuild(&self) -> Option<Vec<FeeRecord>> {
        let (students, fees) = (self.students.as_ref()?, self.fees.as_ref()?);
        Some(compute_fee_records(students, fees, self.default_total_fee))
    }
}

// ── Background task ─────────────────────────────────────────────────

/// `true` once a listener (live, fallback or cache) has published into
/// the store.
fn has_delivered<T: Identified>(store: &EntityStore<T>) -> bool {
    store.source() != DataSource::Empty
}

fn publish(store: &DataStore, records: Option<Vec<FeeRecord>>) {
    if let Some(records) = records {
        debug!(count = records.len(), "fee view rebuilt");
        store.fee_records.replace_all(records);
    }
}

/// Keep `store.fee_records` in sync with `store.students` and
/// `store.fees` until `cancel` fires.
pub async fn reconcile_task(store: Arc<DataStore>, config: Arc<SyncConfig>, cancel: CancellationToken) {
    let mut reconciler = FeeReconciler::new(config.default_total_fee);
    let mut students = store.students.subscribe();
    let mut fees = store.fees.subscribe();

    // Inputs that were delivered before this task started.
    if has_delivered(&store.students) {
        publish(&store, reconciler.on_students(students.latest()));
    }
    if has_delivered(&store.fees) {
        publish(&store, reconciler.on_fees(fees.latest()));
    }

    let warn_after = config.fee_ready_warn_after;
    let mut warned = warn_after.is_zero();
    let ready_timer = tokio::time::sleep(warn_after);
    tokio::pin!(ready_timer);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            snapshot = students.changed() => {
                let Some(snapshot) = snapshot else { break };
                if has_delivered(&store.students) {
                    publish(&store, reconciler.on_students(snapshot));
                }
            }
            snapshot = fees.changed() => {
                let Some(snapshot) = snapshot else { break };
                if has_delivered(&store.fees) {
                    publish(&store, reconciler.on_fees(snapshot));
                }
            }
            () = &mut ready_timer, if !warned => {
                warned = true;
                if !reconciler.is_ready() {
                    warn!(
                        students_ready = reconciler.students_ready(),
                        fees_ready = reconciler.fees_ready(),
                        waited = ?warn_after,
                        "fee view still waiting for its inputs"
                    );
                }
            }
        }
    }

    debug!("fee reconciliation task stopped");
}
