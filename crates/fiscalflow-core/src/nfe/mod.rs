//! NF-e document extraction module.

pub mod cancellation;
pub mod classifier;
pub mod invoice;
pub mod rules;

pub use cancellation::CancellationFieldExtractor;
pub use classifier::{classify, DocumentKind, CANCELLATION_EVENT_CODE};
pub use invoice::InvoiceFieldExtractor;

use tracing::{error, info};

use crate::error::DocumentError;
use crate::models::config::ExtractionConfig;
use crate::models::InvoiceRecord;
use crate::xml::XmlDocument;

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, DocumentError>;

/// Trait for fiscal document extractors.
pub trait DocumentExtractor {
    /// Extract one record from the raw bytes of a document.
    fn extract(&self, source_name: &str, bytes: &[u8]) -> Result<InvoiceRecord>;
}

/// Classifies a document and routes it to the matching field extractor.
pub struct NfeExtractor {
    invoice: InvoiceFieldExtractor,
    cancellation: CancellationFieldExtractor,
}

impl NfeExtractor {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            invoice: InvoiceFieldExtractor::new(config),
            cancellation: CancellationFieldExtractor::new(),
        }
    }

    /// Extract from an already parsed document.
    pub fn extract_document(&self, source_name: &str, doc: &XmlDocument) -> Result<InvoiceRecord> {
        let result = match classify(doc) {
            DocumentKind::Invoice => self.invoice.extract(source_name, doc),
            DocumentKind::CancellationEvent => self.cancellation.extract(source_name, doc),
            DocumentKind::Unsupported(reason) => Err(DocumentError::Unsupported {
                source_name: source_name.to_string(),
                reason,
            }),
        };

        if let Err(e) = &result {
            info!("Ignoring {}: {}", source_name, e);
        }
        result
    }
}

impl Default for NfeExtractor {
    fn default() -> Self {
        Self::new(&ExtractionConfig::default())
    }
}

impl DocumentExtractor for NfeExtractor {
    fn extract(&self, source_name: &str, bytes: &[u8]) -> Result<InvoiceRecord> {
        let doc = XmlDocument::parse(bytes).map_err(|e| {
            error!(source = source_name, "Failed to parse XML: {}", e);
            DocumentError::Parse {
                source_name: source_name.to_string(),
                message: e.to_string(),
            }
        })?;

        self.extract_document(source_name, &doc)
    }
}
