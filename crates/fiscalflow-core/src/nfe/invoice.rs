//! Field extraction for authorized invoices (`nfeProc` / `NFe`).

use chrono::NaiveDate;
use tracing::{debug, trace};

use crate::error::DocumentError;
use crate::models::config::ExtractionConfig;
use crate::models::record::*;
use crate::xml::{XmlDocument, XmlElement};

use super::rules::{
    parse_plain_amount, process_key, FieldExtractor, IssuerIdentifier, KeywordAmountExtractor,
    ProcessExtractor,
};

/// Produces one [`InvoiceRecord`] per invoice document.
///
/// Every field is optional: a missing or unparseable element resolves to its
/// sentinel default and never aborts the record.
pub struct InvoiceFieldExtractor {
    issuer: IssuerIdentifier,
    process: ProcessExtractor,
    afrmm: KeywordAmountExtractor,
    domestic_freight: KeywordAmountExtractor,
    trading: KeywordAmountExtractor,
}

impl InvoiceFieldExtractor {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            issuer: IssuerIdentifier::new(config),
            process: ProcessExtractor::new(),
            afrmm: KeywordAmountExtractor::afrmm(),
            domestic_freight: KeywordAmountExtractor::domestic_freight(),
            trading: KeywordAmountExtractor::trading(),
        }
    }

    /// Extract the record, or [`DocumentError::NotAnInvoice`] when the
    /// identification block is missing.
    pub fn extract(&self, source_name: &str, doc: &XmlDocument) -> Result<InvoiceRecord, DocumentError> {
        let root = doc.root();
        let nfe = root.child("NFe").unwrap_or(root);
        let inf_nfe = nfe
            .child("infNFe")
            .ok_or_else(|| not_an_invoice(source_name, "infNFe"))?;
        let ide = inf_nfe
            .child("ide")
            .ok_or_else(|| not_an_invoice(source_name, "ide"))?;

        let mut record = InvoiceRecord::empty(source_name);

        record.invoice_number = text_or_na(ide.child_text("nNF"));
        record.cfop_code = text_or_na(
            inf_nfe
                .child("det")
                .and_then(|det| det.path_text(&["prod", "CFOP"])),
        );
        record.issue_date = issue_date(ide);
        let direction = Direction::from_flag(ide.child_text("tpNF"));
        record.direction = Some(direction);

        if let Some(dest) = inf_nfe.child("dest") {
            record.client_name = text_or_na(dest.child_text("xNome"));
            record.client_tax_id = text_or_na(dest.child_text("CNPJ").or_else(|| dest.child_text("CPF")));
            record.client_state = text_or_na(dest.path_text(&["enderDest", "UF"]));
        }

        if let Some(totals) = inf_nfe.path(&["total", "ICMSTot"]) {
            self.read_totals(totals, &mut record);
        }

        let additional_info = inf_nfe
            .path_text(&["infAdic", "infCpl"])
            .unwrap_or_default();

        record.import_tax_amount = first_positive_afrmm(inf_nfe);
        if record.import_tax_amount == 0.0 && !additional_info.is_empty() {
            record.import_tax_amount = self.afrmm.extract_or_zero(additional_info);
        }

        if direction == Direction::Inbound && !additional_info.is_empty() {
            record.domestic_freight_amount = self.domestic_freight.extract_or_zero(additional_info);
        }

        let process = self.process.extract(additional_info).or_else(|| {
            self.process.extract_from_items(
                inf_nfe
                    .children_named("det")
                    .filter_map(|det| det.child_text("infAdProd")),
            )
        });
        if let Some(found) = process {
            trace!("{}: process {:?} via {:?}", source_name, found.label, found.rule);
            record.process_label = found.label;
        }
        record.process_key = process_key(&record.process_label);

        record.issuing_system = self.issuer.identify(
            ide.child_text("verProc"),
            inf_nfe.path_text(&["infRespTec", "email"]),
        );

        record.service_charge_amount = self.trading.extract_or_zero(additional_info);

        record.status = InvoiceStatus::from_protocol_code(root.path_text(&["protNFe", "infProt", "cStat"]));

        debug!(
            "Extracted invoice {} from {} ({}, process {})",
            record.invoice_number, source_name, direction, record.process_key
        );

        Ok(record)
    }

    fn read_totals(&self, totals: &XmlElement, record: &mut InvoiceRecord) {
        for field in totals.children() {
            if !field.name().starts_with('v') {
                continue;
            }
            let Some(text) = field.text() else { continue };
            match parse_plain_amount(text) {
                Some(amount) => record.tax_amounts.insert(TaxField::from_tag(field.name()), amount),
                None => debug!("Skipping unparseable total {}={:?}", field.name(), text),
            }
        }

        let amounts = &record.tax_amounts;
        record.total_amount = amounts.get(&TaxField::InvoiceTotal);
        record.total_goods_amount = amounts.get(&TaxField::Goods);
        record.import_duty_amount = amounts.get(&TaxField::ImportDuty);
        record.freight_surcharge_amount = amounts.get(&TaxField::Freight);
        record.other_expenses_amount = amounts.get(&TaxField::Other);
    }
}

impl Default for InvoiceFieldExtractor {
    fn default() -> Self {
        Self::new(&ExtractionConfig::default())
    }
}

/// AFRMM from the customs declaration of each item; the first positive value wins.
fn first_positive_afrmm(inf_nfe: &XmlElement) -> f64 {
    inf_nfe
        .children_named("det")
        .filter_map(|det| det.path_text(&["prod", "DI", "vAFRMM"]))
        .filter_map(parse_plain_amount)
        .find(|v| *v > 0.0)
        .unwrap_or(0.0)
}

/// Date portion of `dhEmi`, or of the legacy `dEmi`.
fn issue_date(ide: &XmlElement) -> String {
    let Some(raw) = ide.child_text("dhEmi").or_else(|| ide.child_text("dEmi")) else {
        return NOT_AVAILABLE.to_string();
    };
    let date = raw.split('T').next().unwrap_or(raw);

    match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(d) => d.format("%Y-%m-%d").to_string(),
        Err(_) => {
            debug!("Unparseable issue date {:?}", raw);
            NOT_AVAILABLE.to_string()
        }
    }
}

fn text_or_na(text: Option<&str>) -> String {
    text.unwrap_or(NOT_AVAILABLE).to_string()
}

fn not_an_invoice(source_name: &str, missing: &str) -> DocumentError {
    DocumentError::NotAnInvoice {
        source_name: source_name.to_string(),
        missing: missing.to_string(),
    }
}
