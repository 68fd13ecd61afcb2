//! Input discovery and batch extraction shared by the processing commands.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};

use fiscalflow_core::{BatchOutcome, BatchProcessor, FiscalFlowConfig, NfeExtractor, SourceDocument};

/// Expand a directory, a single file or a glob pattern into XML files.
pub fn collect_xml_files(input: &str) -> anyhow::Result<Vec<PathBuf>> {
    let path = Path::new(input);
    let pattern = if path.is_dir() {
        path.join("*").to_string_lossy().into_owned()
    } else {
        input.to_string()
    };

    let mut files: Vec<PathBuf> = glob(&pattern)?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file() && is_xml(p))
        .collect();
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No XML files found for: {}", input);
    }

    Ok(files)
}

fn is_xml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("xml"))
}

/// Read every file; unreadable files are reported and left out.
pub fn load_documents(files: &[PathBuf]) -> Vec<SourceDocument> {
    files
        .iter()
        .filter_map(|path| match SourceDocument::from_path(path) {
            Ok(doc) => Some(doc),
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                None
            }
        })
        .collect()
}

/// Run the extraction batch on a blocking thread.
///
/// Ctrl-C stops the batch between documents; what was already extracted is
/// still returned.
pub async fn extract_all(
    documents: Vec<SourceDocument>,
    config: &FiscalFlowConfig,
    jobs: usize,
    show_progress: bool,
) -> anyhow::Result<BatchOutcome> {
    let pb = if show_progress {
        let pb = ProgressBar::new(documents.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")?
                .progress_chars("=>-"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            flag.store(true, Ordering::Relaxed);
        }
    });

    let processor = BatchProcessor::new(NfeExtractor::new(&config.extraction)).with_jobs(jobs);
    debug!("Extracting with {} worker(s)", processor.jobs());

    let bar = pb.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        processor.run(
            &documents,
            |progress| {
                bar.set_position(progress.completed as u64);
                bar.set_message(progress.source_name);
            },
            &cancel,
        )
    })
    .await??;

    if outcome.cancelled {
        pb.abandon_with_message("Cancelled");
        eprintln!(
            "{} Cancelled, {} file(s) not processed",
            style("!").yellow(),
            outcome.not_started.len()
        );
    } else {
        pb.finish_with_message("Complete");
    }

    Ok(outcome)
}

/// Fail when extraction stopped before every document was read.
pub fn require_complete(outcome: &BatchOutcome) -> anyhow::Result<()> {
    if outcome.cancelled {
        anyhow::bail!(
            "Extraction was cancelled with {} file(s) not processed; nothing reconciled",
            outcome.not_started.len()
        );
    }
    Ok(())
}

/// Print the failed-documents report.
pub fn print_failures(outcome: &BatchOutcome) {
    if outcome.failures.is_empty() {
        return;
    }

    println!();
    println!(
        "{}",
        style(format!("{} file(s) could not be read:", outcome.failures.len())).red()
    );
    for failure in &outcome.failures {
        println!("  - {}", failure);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_batch(cancelled: bool) -> BatchOutcome {
        let documents = vec![
            SourceDocument::new("a.xml", "<NFe><infNFe><ide><nNF>1</nNF></ide></infNFe></NFe>"),
            SourceDocument::new("b.xml", "<NFe><infNFe><ide><nNF>2</nNF></ide></infNFe></NFe>"),
        ];
        BatchProcessor::new(NfeExtractor::default())
            .run(&documents, |_| {}, &AtomicBool::new(cancelled))
            .unwrap()
    }

    #[test]
    fn test_cancelled_extraction_is_not_reconciled() {
        let outcome = run_batch(true);
        assert!(outcome.cancelled);

        let err = require_complete(&outcome).unwrap_err();
        assert!(err.to_string().contains("2 file(s) not processed"));
    }

    #[test]
    fn test_complete_extraction_passes() {
        let outcome = run_batch(false);
        assert_eq!(outcome.records.len(), 2);
        assert!(require_complete(&outcome).is_ok());
    }

    #[test]
    fn test_collect_xml_files_filters_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.XML"), "<a/>").unwrap();
        std::fs::write(dir.path().join("a.xml"), "<a/>").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let files = collect_xml_files(dir.path().to_str().unwrap()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.xml", "b.XML"]);
    }
}
