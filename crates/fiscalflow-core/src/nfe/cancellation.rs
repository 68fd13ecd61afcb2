//! Reduced record for cancellation events (`procEventoNFe`, `tpEvento` 110111).

use tracing::{debug, warn};

use crate::error::DocumentError;
use crate::models::record::*;
use crate::xml::XmlDocument;

/// Length of an NF-e access key.
pub const ACCESS_KEY_LEN: usize = 44;

/// Position of the invoice number inside an access key.
const INVOICE_NUMBER_RANGE: std::ops::Range<usize> = 25..34;

/// Produces the record of a cancellation event.
///
/// Events carry no direction, client, process or amounts; only the number of
/// the cancelled invoice (decoded from its access key) and the event date.
#[derive(Debug, Default, Clone, Copy)]
pub struct CancellationFieldExtractor;

impl CancellationFieldExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, source_name: &str, doc: &XmlDocument) -> Result<InvoiceRecord, DocumentError> {
        let event = doc
            .root()
            .path(&["evento", "infEvento"])
            .ok_or_else(|| DocumentError::NotAnInvoice {
                source_name: source_name.to_string(),
                missing: "evento/infEvento".to_string(),
            })?;

        let mut record = InvoiceRecord::empty(source_name);
        record.direction = None;
        record.status = InvoiceStatus::Cancelled(CancellationSource::Protocol);
        record.issuing_system = NOT_AVAILABLE.to_string();

        record.invoice_number = event
            .child_text("chNFe")
            .map(|key| invoice_number_from_key(source_name, key))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());

        record.issue_date = event
            .child_text("dhEvento")
            .and_then(|ts| ts.split('T').next())
            .unwrap_or(NOT_AVAILABLE)
            .to_string();

        debug!(
            "Extracted cancellation of invoice {} from {}",
            record.invoice_number, source_name
        );

        Ok(record)
    }
}

/// Invoice number encoded in a 44-character access key.
pub fn invoice_number_from_key(source_name: &str, key: &str) -> String {
    if key.len() != ACCESS_KEY_LEN || !key.is_ascii() {
        warn!(
            "{}: access key has {} characters, expected {}",
            source_name,
            key.len(),
            ACCESS_KEY_LEN
        );
        return NOT_AVAILABLE.to_string();
    }
    key[INVOICE_NUMBER_RANGE].to_string()
}
