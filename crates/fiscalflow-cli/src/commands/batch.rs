//! Batch command - extract a folder of NF-e documents and reconcile service charges.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::{style, Term};
use tracing::info;

use fiscalflow_core::{
    aggregate, reconcile, write_diagnostics, DashboardSummary, ExpectedCounts, InvoiceRecord,
    ManualCancellation,
};

use super::config::load_config;
use super::input::{collect_xml_files, extract_all, load_documents, print_failures, require_complete};
use super::report::{write_reports, ReportFormat, RunSummary};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input directory, XML file or glob pattern
    #[arg(required = true)]
    input: String,

    /// Output directory (default: configured directory, then the current one)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum, default_value = "csv")]
    format: ReportFormat,

    /// Number of parallel workers (default: from config)
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    /// Stop without writing reports if any document fails to parse
    #[arg(long)]
    fail_fast: bool,

    /// Expected outbound count for a process, as LABEL=COUNT (repeatable)
    #[arg(short, long = "expect", value_name = "LABEL=COUNT")]
    expect: Vec<String>,

    /// JSON file mapping process labels to expected outbound counts
    #[arg(long)]
    expect_file: Option<PathBuf>,

    /// Never ask for expected counts; unanswered processes use the implicit rule
    #[arg(long)]
    no_prompt: bool,

    /// Mark a document as cancelled by the operator (repeatable)
    #[arg(long = "cancel", value_name = "FILE")]
    cancel: Vec<String>,

    /// Also write the process diagnostics report to this file
    #[arg(long)]
    diagnostics: Option<PathBuf>,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let files = collect_xml_files(&args.input)?;
    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    let documents = load_documents(&files);
    let jobs = args.jobs.unwrap_or(config.batch.jobs);
    let outcome = extract_all(documents, &config, jobs, true).await?;
    require_complete(&outcome)?;

    let continue_on_error = config.batch.continue_on_error && !args.fail_fast;
    if !continue_on_error && !outcome.failures.is_empty() {
        print_failures(&outcome);
        anyhow::bail!("{} document(s) failed to parse", outcome.failures.len());
    }

    let records = apply_manual_cancellations(outcome.records.clone(), &args.cancel)?;
    let dashboard = aggregate(&records);

    let mut expected = load_expectations(&args)?;
    if !args.no_prompt && console::user_attended() {
        prompt_expectations(&dashboard, &mut expected)?;
    }

    let reconciliation = reconcile(&records, &expected)?;

    let dir = args
        .output_dir
        .clone()
        .or_else(|| config.output.directory.clone())
        .unwrap_or_else(|| PathBuf::from("."));
    let stem = config
        .output
        .file_stem(&chrono::Local::now().format("%Y-%m-%d").to_string());

    let summary = RunSummary::new(&outcome, &dashboard);
    let written = write_reports(args.format, &dir, &stem, &records, &reconciliation, &summary)?;

    if let Some(path) = &args.diagnostics {
        let mut file = fs::File::create(path)?;
        write_diagnostics(&records, &mut file)?;
        written_line(path);
    }

    print_dashboard(&dashboard);
    println!(
        "   {} service charge(s) authorized, {} pending",
        style(reconciliation.authorized.len()).green(),
        style(reconciliation.pending.len()).yellow()
    );

    println!();
    for path in &written {
        written_line(path);
    }
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        files.len(),
        start.elapsed()
    );

    print_failures(&outcome);

    Ok(())
}

fn written_line(path: &std::path::Path) {
    println!("{} Wrote {}", style("✓").green(), path.display());
}

/// Replace each named authorized record with its manually cancelled version.
fn apply_manual_cancellations(
    mut records: Vec<InvoiceRecord>,
    names: &[String],
) -> anyhow::Result<Vec<InvoiceRecord>> {
    for name in names {
        let record = records
            .iter_mut()
            .find(|r| &r.source_name == name)
            .ok_or_else(|| anyhow::anyhow!("--cancel: no record for {}", name))?;

        let cancellation = ManualCancellation::apply(record.clone())?;
        info!(
            "Cancelled {} manually (was {})",
            name,
            cancellation.original().status
        );
        *record = cancellation.record().clone();
    }
    Ok(records)
}

/// Expected counts from `--expect-file` and `--expect`, the latter winning.
fn load_expectations(args: &BatchArgs) -> anyhow::Result<ExpectedCounts> {
    let mut expected = ExpectedCounts::new();

    if let Some(path) = &args.expect_file {
        let content = fs::read_to_string(path)?;
        let entries: BTreeMap<String, i64> = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid expectations file {}: {}", path.display(), e))?;
        for (label, count) in entries {
            expected.insert(&label, count)?;
        }
    }

    for entry in &args.expect {
        let (label, count) = parse_expectation(entry)?;
        expected.insert(label, count)?;
    }

    Ok(expected)
}

fn parse_expectation(entry: &str) -> anyhow::Result<(&str, i64)> {
    let (label, count) = entry
        .rsplit_once('=')
        .ok_or_else(|| anyhow::anyhow!("Expected LABEL=COUNT, got {:?}", entry))?;
    let count = count
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid count in {:?}", entry))?;
    Ok((label.trim(), count))
}

/// Ask the operator for every process with several outbound invoices.
fn prompt_expectations(dashboard: &DashboardSummary, expected: &mut ExpectedCounts) -> anyhow::Result<()> {
    let pending: Vec<_> = dashboard
        .processes_needing_confirmation()
        .into_iter()
        .filter(|(key, _)| !expected.contains(key))
        .collect();
    if pending.is_empty() {
        return Ok(());
    }

    let term = Term::stdout();
    println!();
    println!("{}", style("Process confirmation").bold());

    for (key, found) in pending {
        loop {
            term.write_str(&format!(
                "Process {} has {} outbound invoice(s). Total expected? ",
                style(key).cyan(),
                found
            ))?;
            let answer = term.read_line()?;
            let answer = answer.trim();
            if answer.is_empty() {
                anyhow::bail!("Reconciliation aborted: no count given for process {}", key);
            }

            match answer.parse::<i64>() {
                Ok(n) if n >= found as i64 => {
                    expected.insert(key, n)?;
                    break;
                }
                Ok(n) if n > 0 => println!(
                    "{} {} is below the {} invoice(s) already found.",
                    style("!").yellow(),
                    n,
                    found
                ),
                _ => println!("{} Enter a positive whole number.", style("!").yellow()),
            }
        }
    }

    Ok(())
}

fn print_dashboard(dashboard: &DashboardSummary) {
    println!();
    println!(
        "{} {} documents: {} authorized, {} cancelled",
        style("ℹ").blue(),
        dashboard.total,
        style(dashboard.authorized).green(),
        style(dashboard.cancelled).red()
    );
    println!(
        "   Inbound:  {:>5} invoices, total {:>15.2}",
        dashboard.inbound.count, dashboard.inbound.total_amount
    );
    println!(
        "   Outbound: {:>5} invoices, total {:>15.2}",
        dashboard.outbound.count, dashboard.outbound.total_amount
    );
    println!(
        "   Goods: {:.2}, {} distinct process(es)",
        dashboard.goods_total,
        dashboard.unique_processes.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use fiscalflow_core::InvoiceStatus;

    #[test]
    fn test_parse_expectation() {
        assert_eq!(parse_expectation("EMALI.IMP001/2025=3").unwrap(), ("EMALI.IMP001/2025", 3));
        assert_eq!(parse_expectation(" A=B = 2 ").unwrap(), ("A=B", 2));
        assert!(parse_expectation("EMALIIMP001").is_err());
        assert!(parse_expectation("EMALIIMP001=x").is_err());
    }

    #[test]
    fn test_manual_cancellation_by_name() {
        let mut record = InvoiceRecord::empty("a.xml");
        record.status = InvoiceStatus::Authorized;
        record.total_amount = 10.0;

        let records = apply_manual_cancellations(vec![record], &["a.xml".to_string()]).unwrap();
        assert!(records[0].is_cancelled());
        assert_eq!(records[0].total_amount, 0.0);

        assert!(apply_manual_cancellations(records, &["missing.xml".to_string()]).is_err());
    }
}
