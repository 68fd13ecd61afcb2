//! Normalized invoice record extracted from one NF-e document.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RecordError;

/// Sentinel for a field that could not be recovered.
pub const NOT_AVAILABLE: &str = "N/A";

/// Issuing-system default when no heuristic matches.
pub const UNIDENTIFIED_SYSTEM: &str = "Unidentified";

/// Movement direction of an invoice (`tpNF`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Entrada (`tpNF` other than `1`).
    Inbound,
    /// Saída (`tpNF = 1`, also the default when the flag is missing).
    Outbound,
}

impl Direction {
    /// Decode the `tpNF` flag.
    pub fn from_flag(flag: Option<&str>) -> Self {
        match flag.map(str::trim) {
            None | Some("1") => Self::Outbound,
            Some(_) => Self::Inbound,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Inbound => "Inbound",
            Self::Outbound => "Outbound",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Who cancelled the invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationSource {
    /// Reported by the tax authority (protocol `cStat` 101 or cancellation event).
    Protocol,
    /// Marked by an operator.
    Manual,
}

/// Authorization status of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Authorized,
    Cancelled(CancellationSource),
    Unknown,
}

impl InvoiceStatus {
    /// Map a protocol `cStat` code.
    pub fn from_protocol_code(code: Option<&str>) -> Self {
        match code.map(str::trim) {
            Some("100") => Self::Authorized,
            Some("101") => Self::Cancelled(CancellationSource::Protocol),
            _ => Self::Unknown,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authorized => f.write_str("Authorized"),
            Self::Cancelled(CancellationSource::Protocol) => f.write_str("Cancelled"),
            Self::Cancelled(CancellationSource::Manual) => f.write_str("Cancelled (Manual)"),
            Self::Unknown => f.write_str(NOT_AVAILABLE),
        }
    }
}

/// A value tag found in the `ICMSTot` totals block.
///
/// Known tags get their own variant so summaries can match on them exhaustively;
/// anything else the document carries is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaxField {
    BaseIcms,
    Icms,
    IcmsRelief,
    Fcp,
    BaseIcmsSt,
    IcmsSt,
    FcpSt,
    FcpStWithheld,
    Goods,
    Freight,
    Insurance,
    Discount,
    ImportDuty,
    Ipi,
    IpiReturned,
    Pis,
    Cofins,
    Other,
    InvoiceTotal,
    ApproximateTaxes,
    Unlisted(String),
}

impl TaxField {
    /// Tax codes reported per direction by the dashboard.
    pub const SUMMARY: [TaxField; 4] = [TaxField::Icms, TaxField::Ipi, TaxField::Pis, TaxField::Cofins];

    /// Resolve an element local name such as `vICMS`.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "vBC" => Self::BaseIcms,
            "vICMS" => Self::Icms,
            "vICMSDeson" => Self::IcmsRelief,
            "vFCP" => Self::Fcp,
            "vBCST" => Self::BaseIcmsSt,
            "vST" => Self::IcmsSt,
            "vFCPST" => Self::FcpSt,
            "vFCPSTRet" => Self::FcpStWithheld,
            "vProd" => Self::Goods,
            "vFrete" => Self::Freight,
            "vSeg" => Self::Insurance,
            "vDesc" => Self::Discount,
            "vII" => Self::ImportDuty,
            "vIPI" => Self::Ipi,
            "vIPIDevol" => Self::IpiReturned,
            "vPIS" => Self::Pis,
            "vCOFINS" => Self::Cofins,
            "vOutro" => Self::Other,
            "vNF" => Self::InvoiceTotal,
            "vTotTrib" => Self::ApproximateTaxes,
            other => Self::Unlisted(other.to_string()),
        }
    }

    /// The element local name this field was read from.
    pub fn tag(&self) -> &str {
        match self {
            Self::BaseIcms => "vBC",
            Self::Icms => "vICMS",
            Self::IcmsRelief => "vICMSDeson",
            Self::Fcp => "vFCP",
            Self::BaseIcmsSt => "vBCST",
            Self::IcmsSt => "vST",
            Self::FcpSt => "vFCPST",
            Self::FcpStWithheld => "vFCPSTRet",
            Self::Goods => "vProd",
            Self::Freight => "vFrete",
            Self::Insurance => "vSeg",
            Self::Discount => "vDesc",
            Self::ImportDuty => "vII",
            Self::Ipi => "vIPI",
            Self::IpiReturned => "vIPIDevol",
            Self::Pis => "vPIS",
            Self::Cofins => "vCOFINS",
            Self::Other => "vOutro",
            Self::InvoiceTotal => "vNF",
            Self::ApproximateTaxes => "vTotTrib",
            Self::Unlisted(tag) => tag,
        }
    }
}

impl From<String> for TaxField {
    fn from(tag: String) -> Self {
        Self::from_tag(&tag)
    }
}

impl From<TaxField> for String {
    fn from(field: TaxField) -> Self {
        field.tag().to_string()
    }
}

impl fmt::Display for TaxField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Amounts of the totals block keyed by tag. Missing keys read as 0.0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxAmounts(BTreeMap<TaxField, f64>);

impl TaxAmounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: TaxField, amount: f64) {
        self.0.insert(field, amount);
    }

    /// Amount for `field`, 0.0 when absent.
    pub fn get(&self, field: &TaxField) -> f64 {
        self.0.get(field).copied().unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TaxField, &f64)> {
        self.0.iter()
    }
}

/// One row per fiscal document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    /// Document identifier, usually the file name.
    pub source_name: String,
    pub invoice_number: String,
    /// CFOP of the first line item.
    pub cfop_code: String,
    /// `YYYY-MM-DD` or `N/A`.
    pub issue_date: String,
    /// `None` only for cancellation events, which carry no direction.
    pub direction: Option<Direction>,
    pub status: InvoiceStatus,
    pub client_name: String,
    pub client_tax_id: String,
    pub client_state: String,
    pub total_amount: f64,
    pub total_goods_amount: f64,
    pub tax_amounts: TaxAmounts,
    /// AFRMM, structured or recovered from free text.
    pub import_tax_amount: f64,
    /// Imposto de Importação (`vII`).
    pub import_duty_amount: f64,
    /// Freight declared in the totals block (`vFrete`).
    pub freight_surcharge_amount: f64,
    /// Other expenses (`vOutro`).
    pub other_expenses_amount: f64,
    /// Domestic freight recovered from free text on inbound invoices.
    pub domestic_freight_amount: f64,
    /// Trading service charge; 0.0 means the invoice carries none.
    pub service_charge_amount: f64,
    /// Process label as written in the document.
    pub process_label: String,
    /// Normalized process label, for comparisons only.
    pub process_key: String,
    pub issuing_system: String,
}

impl InvoiceRecord {
    /// A record with every field at its sentinel default.
    pub fn empty(source_name: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            invoice_number: NOT_AVAILABLE.to_string(),
            cfop_code: NOT_AVAILABLE.to_string(),
            issue_date: NOT_AVAILABLE.to_string(),
            direction: Some(Direction::Outbound),
            status: InvoiceStatus::Unknown,
            client_name: NOT_AVAILABLE.to_string(),
            client_tax_id: NOT_AVAILABLE.to_string(),
            client_state: NOT_AVAILABLE.to_string(),
            total_amount: 0.0,
            total_goods_amount: 0.0,
            tax_amounts: TaxAmounts::new(),
            import_tax_amount: 0.0,
            import_duty_amount: 0.0,
            freight_surcharge_amount: 0.0,
            other_expenses_amount: 0.0,
            domestic_freight_amount: 0.0,
            service_charge_amount: 0.0,
            process_label: NOT_AVAILABLE.to_string(),
            process_key: NOT_AVAILABLE.to_string(),
            issuing_system: UNIDENTIFIED_SYSTEM.to_string(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.status.is_cancelled()
    }

    pub fn is_outbound(&self) -> bool {
        self.direction == Some(Direction::Outbound)
    }

    pub fn is_inbound(&self) -> bool {
        self.direction == Some(Direction::Inbound)
    }

    /// Whether the record carries a resolvable process key.
    pub fn has_process(&self) -> bool {
        !self.process_key.is_empty() && self.process_key != NOT_AVAILABLE
    }

    /// Label for the direction column, `N/A` for cancellation events.
    pub fn direction_label(&self) -> &'static str {
        self.direction.map(|d| d.label()).unwrap_or(NOT_AVAILABLE)
    }

    /// Derive the operator-cancelled version of an authorized record.
    ///
    /// Every monetary field and the tax map are zeroed. The receiver is left
    /// untouched so callers can keep it as the revert snapshot.
    pub fn cancel_manually(&self) -> Result<InvoiceRecord, RecordError> {
        if self.status != InvoiceStatus::Authorized {
            return Err(RecordError::NotAuthorized {
                source_name: self.source_name.clone(),
                status: self.status.to_string(),
            });
        }

        Ok(InvoiceRecord {
            status: InvoiceStatus::Cancelled(CancellationSource::Manual),
            total_amount: 0.0,
            total_goods_amount: 0.0,
            tax_amounts: TaxAmounts::new(),
            import_tax_amount: 0.0,
            import_duty_amount: 0.0,
            freight_surcharge_amount: 0.0,
            other_expenses_amount: 0.0,
            domestic_freight_amount: 0.0,
            service_charge_amount: 0.0,
            ..self.clone()
        })
    }
}

/// A manual cancellation together with the snapshot it was derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct ManualCancellation {
    original: InvoiceRecord,
    cancelled: InvoiceRecord,
}

impl ManualCancellation {
    pub fn apply(original: InvoiceRecord) -> Result<Self, RecordError> {
        let cancelled = original.cancel_manually()?;
        Ok(Self { original, cancelled })
    }

    pub fn record(&self) -> &InvoiceRecord {
        &self.cancelled
    }

    pub fn original(&self) -> &InvoiceRecord {
        &self.original
    }

    /// Drop the override and return the untouched snapshot.
    pub fn revert(self) -> InvoiceRecord {
        self.original
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authorized() -> InvoiceRecord {
        let mut record = InvoiceRecord::empty("a.xml");
        record.status = InvoiceStatus::Authorized;
        record.total_amount = 100.0;
        record.service_charge_amount = 12.5;
        record.tax_amounts.insert(TaxField::Icms, 18.0);
        record
    }

    #[test]
    fn test_direction_flag() {
        assert_eq!(Direction::from_flag(Some("1")), Direction::Outbound);
        assert_eq!(Direction::from_flag(Some("0")), Direction::Inbound);
        assert_eq!(Direction::from_flag(Some("2")), Direction::Inbound);
        assert_eq!(Direction::from_flag(None), Direction::Outbound);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(InvoiceStatus::from_protocol_code(Some("100")), InvoiceStatus::Authorized);
        assert_eq!(
            InvoiceStatus::from_protocol_code(Some("101")),
            InvoiceStatus::Cancelled(CancellationSource::Protocol)
        );
        assert_eq!(InvoiceStatus::from_protocol_code(Some("204")), InvoiceStatus::Unknown);
        assert_eq!(InvoiceStatus::from_protocol_code(None), InvoiceStatus::Unknown);
        assert_eq!(
            InvoiceStatus::Cancelled(CancellationSource::Manual).to_string(),
            "Cancelled (Manual)"
        );
    }

    #[test]
    fn test_tax_field_tags() {
        assert_eq!(TaxField::from_tag("vICMS"), TaxField::Icms);
        assert_eq!(TaxField::from_tag("vXYZ"), TaxField::Unlisted("vXYZ".to_string()));
        assert_eq!(TaxField::from_tag(TaxField::Cofins.tag()), TaxField::Cofins);
    }

    #[test]
    fn test_missing_tax_reads_zero() {
        let amounts = TaxAmounts::new();
        assert_eq!(amounts.get(&TaxField::Ipi), 0.0);
    }

    #[test]
    fn test_tax_amounts_serialize_by_tag() {
        let mut amounts = TaxAmounts::new();
        amounts.insert(TaxField::Pis, 1.5);
        let json = serde_json::to_string(&amounts).unwrap();
        assert_eq!(json, r#"{"vPIS":1.5}"#);
        let back: TaxAmounts = serde_json::from_str(&json).unwrap();
        assert_eq!(back, amounts);
    }

    #[test]
    fn test_manual_cancellation_zeroes_amounts() {
        let original = authorized();
        let cancelled = original.cancel_manually().unwrap();

        assert_eq!(cancelled.status, InvoiceStatus::Cancelled(CancellationSource::Manual));
        assert_eq!(cancelled.total_amount, 0.0);
        assert_eq!(cancelled.service_charge_amount, 0.0);
        assert!(cancelled.tax_amounts.is_empty());
        assert_eq!(cancelled.source_name, original.source_name);
        assert_eq!(original.total_amount, 100.0);
    }

    #[test]
    fn test_manual_cancellation_requires_authorized() {
        let mut record = authorized();
        record.status = InvoiceStatus::Unknown;
        assert!(matches!(
            record.cancel_manually(),
            Err(RecordError::NotAuthorized { .. })
        ));
    }

    #[test]
    fn test_manual_cancellation_revert() {
        let original = authorized();
        let applied = ManualCancellation::apply(original.clone()).unwrap();
        assert!(applied.record().is_cancelled());
        assert_eq!(applied.revert(), original);
    }
}
