//! Data models shared across the pipeline.

pub mod config;
pub mod record;

pub use config::FiscalFlowConfig;
pub use record::{
    CancellationSource, Direction, InvoiceRecord, InvoiceStatus, ManualCancellation, TaxAmounts,
    TaxField, NOT_AVAILABLE, UNIDENTIFIED_SYSTEM,
};
