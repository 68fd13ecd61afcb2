//! Core library for NF-e fiscal document processing.
//!
//! This crate provides:
//! - Namespace-agnostic XML traversal of NF-e documents
//! - Classification of invoices and cancellation events
//! - Field extraction, including free-text recovery of process labels and surcharges
//! - Reconciliation of inbound service charges against outbound invoices
//! - Dashboard aggregation and process diagnostics
//! - Parallel batch extraction with progress reporting and cancellation

pub mod batch;
pub mod dashboard;
pub mod diagnostics;
pub mod error;
pub mod models;
pub mod nfe;
pub mod reconcile;
pub mod xml;

pub use batch::{BatchOutcome, BatchProcessor, BatchProgress, SourceDocument};
pub use dashboard::{aggregate, aggregate_parallel, DashboardSummary, DirectionTotals};
pub use diagnostics::write_diagnostics;
pub use error::{DocumentError, FiscalFlowError, ReconciliationInputError, RecordError, Result};
pub use models::config::FiscalFlowConfig;
pub use models::record::{
    CancellationSource, Direction, InvoiceRecord, InvoiceStatus, ManualCancellation, TaxAmounts, TaxField,
};
pub use nfe::{classify, DocumentExtractor, DocumentKind, NfeExtractor};
pub use nfe::rules::normalize::{normalize, process_key};
pub use reconcile::{reconcile, ExpectedCounts, PendingEntry, ProcessGroups, ReconciliationReport};
pub use xml::{XmlDocument, XmlElement, XmlError};
