//! Process command - extract the record of a single NF-e document.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::{debug, info};

use fiscalflow_core::{DocumentExtractor, InvoiceRecord, NfeExtractor, SourceDocument, TaxField};

use super::config::load_config;
use super::report::write_records;

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input XML file
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let document = SourceDocument::from_path(&args.input)?;
    let record = NfeExtractor::new(&config.extraction).extract(&document.name, &document.bytes)?;

    let output = format_record(&record, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

fn format_record(record: &InvoiceRecord, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(record)?),
        OutputFormat::Csv => {
            let mut buf = Vec::new();
            write_records(&mut buf, &[record])?;
            Ok(String::from_utf8(buf)?)
        }
        OutputFormat::Text => Ok(format_text(record)),
    }
}

fn format_text(record: &InvoiceRecord) -> String {
    let mut output = String::new();

    output.push_str(&format!("Invoice: {} ({})\n", record.invoice_number, record.status));
    output.push_str(&format!("Date: {}\n", record.issue_date));
    output.push_str(&format!("Direction: {}\n", record.direction_label()));
    output.push_str(&format!("CFOP: {}\n", record.cfop_code));
    output.push('\n');

    output.push_str("Client:\n");
    output.push_str(&format!("  {}\n", record.client_name));
    output.push_str(&format!("  CNPJ/CPF: {}\n", record.client_tax_id));
    output.push_str(&format!("  UF: {}\n", record.client_state));
    output.push('\n');

    output.push_str("Totals:\n");
    output.push_str(&format!("  Goods:  {:.2}\n", record.total_goods_amount));
    output.push_str(&format!("  Total:  {:.2}\n", record.total_amount));
    for field in TaxField::SUMMARY.iter() {
        output.push_str(&format!(
            "  {:<7} {:.2}\n",
            format!("{}:", field.tag().trim_start_matches('v')),
            record.tax_amounts.get(field)
        ));
    }
    if record.import_tax_amount > 0.0 {
        output.push_str(&format!("  AFRMM:  {:.2}\n", record.import_tax_amount));
    }
    if record.service_charge_amount > 0.0 {
        output.push_str(&format!("  Trading service: {:.2}\n", record.service_charge_amount));
    }
    output.push('\n');

    output.push_str(&format!(
        "Process: {} (normalized {})\n",
        record.process_label, record.process_key
    ));
    output.push_str(&format!("Issuing system: {}\n", record.issuing_system));

    output
}
