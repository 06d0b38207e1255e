//! Fee reconciliation over exported documents.

use std::sync::Arc;

use serde::Serialize;
use tabled::Tabled;

use schoolsync_core::{
    Document, Fee, FeeRecord, FeeSummary, Record, Student, compute_fee_records,
};

use crate::cli::{FeesArgs, GlobalOpts, OutputFormat};
use crate::commands::util;
use crate::config::Config;
use crate::error::CliError;
use crate::output;

// ── Report ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct FeeReport {
    records: Vec<FeeRecord>,
    summary: FeeSummary,
}

#[derive(Tabled)]
struct FeeRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Student")]
    name: String,
    #[tabled(rename = "Class")]
    class_name: String,
    #[tabled(rename = "Roll")]
    roll: String,
    #[tabled(rename = "Total")]
    total: i64,
    #[tabled(rename = "Paid")]
    paid: i64,
    #[tabled(rename = "Pending")]
    pending: i64,
    #[tabled(rename = "Status")]
    status: String,
}

impl FeeRow {
    fn new(r: &FeeRecord, color: bool) -> Self {
        let mut status = output::fee_status_label(r.status, color);
        if !r.has_fee_document {
            status.push_str(" (default)");
        }
        Self {
            id: r.id.to_string(),
            name: r.student_name.clone(),
            class_name: r.class_name.clone(),
            roll: r.roll_number.clone(),
            total: r.total_fee,
            paid: r.paid_amount,
            pending: r.pending,
            status,
        }
    }
}

fn summary_line(s: &FeeSummary) -> String {
    format!(
        "{} students: {} paid, {} partial, {} pending | total {} collected {} outstanding {}",
        s.students, s.paid, s.partial, s.pending, s.total_fee, s.collected, s.outstanding
    )
}

// ── Loading ─────────────────────────────────────────────────────────

fn load_records<T: Record>(path: &std::path::Path, field: &str) -> Result<Vec<Arc<T>>, CliError> {
    let value = util::read_json_file(path)?;
    let docs: Vec<Document> = util::documents_from_export(value, field)?;
    Ok(docs.iter().map(|d| Arc::new(T::from_document(d))).collect())
}

/// Join exported students and fee documents with the configured default.
fn reconcile(args: &FeesArgs, cfg: &Config) -> Result<FeeReport, CliError> {
    let default_total_fee = args.default_fee.unwrap_or(cfg.sync.default_total_fee);
    if default_total_fee < 0 {
        return Err(CliError::Validation {
            field: "default-fee".into(),
            reason: format!("must not be negative, got {default_total_fee}"),
        });
    }

    let students: Vec<Arc<Student>> = load_records(&args.students, "students")?;
    let fees: Vec<Arc<Fee>> = load_records(&args.fees, "fees")?;
    tracing::debug!(
        students = students.len(),
        fees = fees.len(),
        default_total_fee,
        "reconciling fee exports"
    );

    let records = compute_fee_records(&students, &fees, default_total_fee);
    let summary = FeeSummary::from_records(&records);
    Ok(FeeReport { records, summary })
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: FeesArgs, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let report = reconcile(&args, cfg)?;

    let out = if args.summary {
        output::render_single(&global.output, &report.summary, summary_line, |s| {
            s.outstanding.to_string()
        })
    } else {
        match global.output {
            OutputFormat::Json => output::render_json_pretty(&report),
            OutputFormat::Table => {
                let color = output::should_color(&global.color);
                let table = output::render_list(
                    &global.output,
                    &report.records,
                    |r| FeeRow::new(r, color),
                    |r| r.id.to_string(),
                );
                format!("{table}\n{}", summary_line(&report.summary))
            }
            OutputFormat::Plain => output::render_list(
                &global.output,
                &report.records,
                |r| FeeRow::new(r, false),
                |r| format!("{}\t{}", r.id, r.status),
            ),
        }
    };

    output::print_output(&out, global.quiet);
    Ok(())
}
