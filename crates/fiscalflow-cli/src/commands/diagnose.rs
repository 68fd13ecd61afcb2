//! Diagnose command - audit how process labels were normalized.

use std::fs;
use std::io;
use std::path::PathBuf;

use clap::Args;
use console::style;

use super::config::load_config;
use super::input::{collect_xml_files, extract_all, load_documents, print_failures};

/// Arguments for the diagnose command.
#[derive(Args)]
pub struct DiagnoseArgs {
    /// Input directory, XML file or glob pattern
    #[arg(required = true)]
    input: String,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of parallel workers (default: from config)
    #[arg(short = 'j', long)]
    jobs: Option<usize>,
}

pub async fn run(args: DiagnoseArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    let files = collect_xml_files(&args.input)?;
    let documents = load_documents(&files);
    let jobs = args.jobs.unwrap_or(config.batch.jobs);
    let outcome = extract_all(documents, &config, jobs, args.output.is_some()).await?;

    match &args.output {
        Some(path) => {
            let mut file = fs::File::create(path)?;
            fiscalflow_core::write_diagnostics(&outcome.records, &mut file)?;
            println!(
                "{} Diagnostics written to {}",
                style("✓").green(),
                path.display()
            );
            print_failures(&outcome);
        }
        None => {
            let mut stdout = io::stdout().lock();
            fiscalflow_core::write_diagnostics(&outcome.records, &mut stdout)?;
        }
    }

    Ok(())
}
