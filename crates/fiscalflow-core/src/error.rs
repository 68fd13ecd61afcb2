//! Error types for the fiscalflow-core library.

use thiserror::Error;

/// Main error type for the fiscalflow library.
#[derive(Error, Debug)]
pub enum FiscalFlowError {
    /// Per-document extraction error.
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// Operator-supplied reconciliation input was rejected.
    #[error("reconciliation input error: {0}")]
    Reconciliation(#[from] ReconciliationInputError),

    /// Invalid state transition on an invoice record.
    #[error("record error: {0}")]
    Record(#[from] RecordError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors scoped to a single fiscal document.
///
/// None of these abort a batch: the document is excluded and the batch moves on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// The XML is not well-formed.
    #[error("failed to parse {source_name}: {message}")]
    Parse { source_name: String, message: String },

    /// Neither an invoice nor a supported cancellation event.
    #[error("unsupported document {source_name}: {reason}")]
    Unsupported { source_name: String, reason: String },

    /// Classified as an invoice or event but the mandatory block is missing.
    #[error("{source_name} lacks mandatory block <{missing}>")]
    NotAnInvoice { source_name: String, missing: String },
}

impl DocumentError {
    /// Name of the document that failed.
    pub fn source_name(&self) -> &str {
        match self {
            Self::Parse { source_name, .. }
            | Self::Unsupported { source_name, .. }
            | Self::NotAnInvoice { source_name, .. } => source_name,
        }
    }

    /// Whether the document is silently excluded rather than reported as a failure.
    pub fn is_ignorable(&self) -> bool {
        matches!(self, Self::Unsupported { .. } | Self::NotAnInvoice { .. })
    }
}

/// Errors in the operator's expected-count answers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationInputError {
    /// Fewer invoices expected than were already found.
    #[error("process {process_key}: expected {expected} outbound invoice(s) but {found} already found")]
    ExpectedBelowFound {
        process_key: String,
        expected: u32,
        found: usize,
    },

    /// Expected counts must be positive.
    #[error("process {process_key}: expected count must be a positive integer")]
    NonPositiveExpected { process_key: String },
}

/// Errors related to record state transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// Only authorized invoices can be cancelled manually.
    #[error("{source_name} cannot be cancelled manually from status {status}")]
    NotAuthorized { source_name: String, status: String },
}

/// Result type for the fiscalflow library.
pub type Result<T> = std::result::Result<T, FiscalFlowError>;
