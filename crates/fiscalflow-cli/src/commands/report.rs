//! Report sinks: per-direction record sheets, service-charge reconciliation and summary.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use fiscalflow_core::models::NOT_AVAILABLE;
use fiscalflow_core::{
    BatchOutcome, DashboardSummary, InvoiceRecord, ReconciliationReport, TaxField,
};

/// Output format for batch reports.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum ReportFormat {
    /// One CSV per sheet plus summary.json
    Csv,
    /// A single JSON document
    Json,
}

/// Failed or skipped document.
#[derive(Debug, Serialize)]
pub struct FailedDocument {
    pub source_name: String,
    pub reason: String,
}

/// Batch totals written next to the sheets.
#[derive(Debug, Serialize)]
pub struct RunSummary<'a> {
    pub generated_at: String,
    pub dashboard: &'a DashboardSummary,
    pub processes_needing_confirmation: Vec<ProcessCount<'a>>,
    pub failed: Vec<FailedDocument>,
    pub skipped: usize,
    pub not_started: &'a [String],
}

#[derive(Debug, Serialize)]
pub struct ProcessCount<'a> {
    pub process_key: &'a str,
    pub outbound_found: usize,
}

impl<'a> RunSummary<'a> {
    pub fn new(outcome: &'a BatchOutcome, dashboard: &'a DashboardSummary) -> Self {
        Self {
            generated_at: chrono::Local::now().to_rfc3339(),
            dashboard,
            processes_needing_confirmation: dashboard
                .processes_needing_confirmation()
                .into_iter()
                .map(|(process_key, outbound_found)| ProcessCount {
                    process_key,
                    outbound_found,
                })
                .collect(),
            failed: outcome
                .failures
                .iter()
                .map(|e| FailedDocument {
                    source_name: e.source_name().to_string(),
                    reason: e.to_string(),
                })
                .collect(),
            skipped: outcome.skipped.len(),
            not_started: &outcome.not_started,
        }
    }
}

/// Whole run as one JSON document.
#[derive(Serialize)]
struct JsonReport<'a> {
    summary: &'a RunSummary<'a>,
    records: &'a [InvoiceRecord],
    reconciliation: &'a ReconciliationReport,
}

const RECORD_HEADERS: [&str; 25] = [
    "file",
    "invoice_number",
    "cfop",
    "client",
    "client_tax_id",
    "client_state",
    "issue_date",
    "goods_total",
    "total",
    "import_duty",
    "icms",
    "ipi",
    "pis",
    "cofins",
    "afrmm",
    "freight",
    "other_expenses",
    "domestic_freight",
    "trading_service",
    "process",
    "normalized_process",
    "direction",
    "status",
    "issuing_system",
    "tax_fields",
];

const SERVICE_HEADERS: [&str; 6] = [
    "file",
    "invoice_number",
    "client",
    "issue_date",
    "process",
    "trading_service",
];

/// Write the reports for a run; returns the paths written.
pub fn write_reports(
    format: ReportFormat,
    dir: &Path,
    stem: &str,
    records: &[InvoiceRecord],
    reconciliation: &ReconciliationReport,
    summary: &RunSummary<'_>,
) -> anyhow::Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;

    match format {
        ReportFormat::Json => {
            let path = dir.join(format!("{stem}.json"));
            let report = JsonReport {
                summary,
                records,
                reconciliation,
            };
            fs::write(&path, serde_json::to_string_pretty(&report)?)?;
            Ok(vec![path])
        }
        ReportFormat::Csv => {
            let dir = dir.join(stem);
            fs::create_dir_all(&dir)?;

            let (inbound, outbound): (Vec<&InvoiceRecord>, Vec<&InvoiceRecord>) =
                records.iter().partition(|r| r.is_inbound());

            let paths = vec![
                dir.join("outbound.csv"),
                dir.join("inbound.csv"),
                dir.join("service_authorized.csv"),
                dir.join("service_pending.csv"),
                dir.join("summary.json"),
            ];

            write_records(fs::File::create(&paths[0])?, &outbound)?;
            write_records(fs::File::create(&paths[1])?, &inbound)?;
            write_authorized(fs::File::create(&paths[2])?, reconciliation)?;
            write_pending(fs::File::create(&paths[3])?, reconciliation)?;
            fs::write(&paths[4], serde_json::to_string_pretty(summary)?)?;

            for path in &paths {
                debug!("Wrote {}", path.display());
            }
            Ok(paths)
        }
    }
}

pub fn write_records<W: Write>(sink: W, records: &[&InvoiceRecord]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(sink);
    wtr.write_record(RECORD_HEADERS)?;
    for record in records {
        wtr.write_record(record_row(record))?;
    }
    wtr.flush()?;
    Ok(())
}

fn record_row(r: &InvoiceRecord) -> Vec<String> {
    let taxes = &r.tax_amounts;
    let tax_fields = taxes
        .iter()
        .map(|(field, _)| field.tag().to_string())
        .collect::<Vec<_>>()
        .join(" ");

    vec![
        r.source_name.clone(),
        r.invoice_number.clone(),
        r.cfop_code.clone(),
        r.client_name.clone(),
        r.client_tax_id.clone(),
        r.client_state.clone(),
        r.issue_date.clone(),
        money(r.total_goods_amount),
        money(r.total_amount),
        money(r.import_duty_amount),
        money(taxes.get(&TaxField::Icms)),
        money(taxes.get(&TaxField::Ipi)),
        money(taxes.get(&TaxField::Pis)),
        money(taxes.get(&TaxField::Cofins)),
        money(r.import_tax_amount),
        money(r.freight_surcharge_amount),
        money(r.other_expenses_amount),
        money(r.domestic_freight_amount),
        money(r.service_charge_amount),
        r.process_label.clone(),
        r.process_key.clone(),
        r.direction_label().to_string(),
        r.status.to_string(),
        r.issuing_system.clone(),
        tax_fields,
    ]
}

fn service_row(r: &InvoiceRecord) -> Vec<String> {
    vec![
        r.source_name.clone(),
        r.invoice_number.clone(),
        r.client_name.clone(),
        r.issue_date.clone(),
        r.process_label.clone(),
        money(r.service_charge_amount),
    ]
}

fn write_authorized<W: Write>(sink: W, report: &ReconciliationReport) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(sink);
    wtr.write_record(SERVICE_HEADERS)?;
    for record in &report.authorized {
        wtr.write_record(service_row(record))?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_pending<W: Write>(sink: W, report: &ReconciliationReport) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(sink);
    let mut headers = SERVICE_HEADERS.to_vec();
    headers.extend(["found", "expected", "to_issue"]);
    wtr.write_record(&headers)?;

    for entry in &report.pending {
        let mut row = service_row(&entry.record);
        row.push(entry.found.to_string());
        row.push(optional(entry.expected));
        row.push(optional(entry.to_issue));
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}

fn money(value: f64) -> String {
    format!("{value:.2}")
}

fn optional(value: Option<u32>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), |v| v.to_string())
}
