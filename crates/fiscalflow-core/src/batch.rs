//! Batch extraction over a worker pool.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use rayon::prelude::*;
use tracing::info;

use crate::error::{DocumentError, FiscalFlowError, Result};
use crate::models::InvoiceRecord;
use crate::nfe::DocumentExtractor;

/// Raw bytes of one document with the name it is reported under.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SourceDocument {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file; the document is named after the file name.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, bytes })
    }
}

/// Progress report sent after each finished document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
    pub source_name: String,
}

/// Everything a batch run produced, in input order.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub records: Vec<InvoiceRecord>,
    /// Unsupported documents, excluded silently.
    pub skipped: Vec<DocumentError>,
    /// Documents that failed to parse.
    pub failures: Vec<DocumentError>,
    /// Documents never started because the run was cancelled.
    pub not_started: Vec<String>,
    pub cancelled: bool,
}

/// Runs a [`DocumentExtractor`] over many documents.
pub struct BatchProcessor<E> {
    extractor: E,
    jobs: usize,
}

impl<E: DocumentExtractor + Sync> BatchProcessor<E> {
    pub fn new(extractor: E) -> Self {
        Self { extractor, jobs: 1 }
    }

    /// Set the number of worker threads (at least one).
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// Extract every document.
    ///
    /// `on_progress` is called once per finished document with a strictly
    /// increasing `completed`. The `cancel` flag is checked before each
    /// document starts; documents already running are finished.
    pub fn run<F>(&self, documents: &[SourceDocument], on_progress: F, cancel: &AtomicBool) -> Result<BatchOutcome>
    where
        F: Fn(BatchProgress) + Sync,
    {
        let total = documents.len();
        info!("Processing {} document(s) with {} worker(s)", total, self.jobs);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
            .map_err(|e| FiscalFlowError::Config(format!("failed to build worker pool: {e}")))?;

        let completed = Mutex::new(0usize);

        let results: Vec<Option<std::result::Result<InvoiceRecord, DocumentError>>> = pool.install(|| {
            documents
                .par_iter()
                .map(|doc| {
                    if cancel.load(Ordering::Relaxed) {
                        return None;
                    }
                    let result = self.extractor.extract(&doc.name, &doc.bytes);

                    let mut done = completed.lock().unwrap_or_else(PoisonError::into_inner);
                    *done += 1;
                    on_progress(BatchProgress {
                        completed: *done,
                        total,
                        source_name: doc.name.clone(),
                    });
                    Some(result)
                })
                .collect()
        });

        let mut outcome = BatchOutcome::default();
        for (doc, result) in documents.iter().zip(results) {
            match result {
                Some(Ok(record)) => outcome.records.push(record),
                Some(Err(e)) if e.is_ignorable() => outcome.skipped.push(e),
                Some(Err(e)) => outcome.failures.push(e),
                None => outcome.not_started.push(doc.name.clone()),
            }
        }
        outcome.cancelled = !outcome.not_started.is_empty();

        info!(
            "Batch finished: {} record(s), {} skipped, {} failed, {} not started",
            outcome.records.len(),
            outcome.skipped.len(),
            outcome.failures.len(),
            outcome.not_started.len()
        );

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nfe::NfeExtractor;

    fn invoice(number: u32) -> SourceDocument {
        SourceDocument::new(
            format!("nf{number}.xml"),
            format!("<NFe><infNFe><ide><nNF>{number}</nNF></ide></infNFe></NFe>"),
        )
    }

    #[test]
    fn test_outcome_partitions_and_keeps_order() {
        let mut documents: Vec<_> = (1..=20).map(invoice).collect();
        documents.insert(3, SourceDocument::new("broken.xml", "<NFe>"));
        documents.insert(7, SourceDocument::new("cte.xml", "<cteProc/>"));

        let outcome = BatchProcessor::new(NfeExtractor::default())
            .with_jobs(4)
            .run(&documents, |_| {}, &AtomicBool::new(false))
            .unwrap();

        let numbers: Vec<_> = outcome.records.iter().map(|r| r.invoice_number.clone()).collect();
        let expected: Vec<_> = (1..=20).map(|n| n.to_string()).collect();
        assert_eq!(numbers, expected);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].source_name(), "broken.xml");
        assert_eq!(outcome.skipped.len(), 1);
        assert!(!outcome.cancelled);
    }

    #[test]
    fn test_progress_is_monotonic() {
        let documents: Vec<_> = (1..=50).map(invoice).collect();
        let seen = Mutex::new(Vec::new());

        BatchProcessor::new(NfeExtractor::default())
            .with_jobs(8)
            .run(&documents, |p| seen.lock().unwrap().push(p.completed), &AtomicBool::new(false))
            .unwrap();

        let seen = seen.into_inner().unwrap();
        assert_eq!(seen, (1..=50).collect::<Vec<_>>());
    }

    #[test]
    fn test_cancel_before_start() {
        let documents: Vec<_> = (1..=5).map(invoice).collect();
        let outcome = BatchProcessor::new(NfeExtractor::default())
            .run(&documents, |_| {}, &AtomicBool::new(true))
            .unwrap();

        assert!(outcome.cancelled);
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.not_started.len(), 5);
    }

    #[test]
    fn test_cancel_between_documents() {
        let documents: Vec<_> = (1..=5).map(invoice).collect();
        let cancel = AtomicBool::new(false);

        let outcome = BatchProcessor::new(NfeExtractor::default())
            .with_jobs(1)
            .run(
                &documents,
                |p| {
                    if p.completed == 2 {
                        cancel.store(true, Ordering::Relaxed);
                    }
                },
                &cancel,
            )
            .unwrap();

        assert!(outcome.cancelled);
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.not_started, ["nf3.xml", "nf4.xml", "nf5.xml"]);
    }

    #[test]
    fn test_jobs_at_least_one() {
        assert_eq!(BatchProcessor::new(NfeExtractor::default()).with_jobs(0).jobs(), 1);
    }
}
