//! Common regex patterns for NF-e free-text recovery.
//!
//! The additional-information field (`infCpl`) and the per-item annotation
//! (`infAdProd`) are written by hand or by the issuing software, so these
//! patterns are deliberately loose.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // AFRMM surcharge: keyword, anything, optional "R$", then a grouped amount
    pub static ref AFRMM_AMOUNT: Regex = Regex::new(
        r"(?is)AFRMM.*?R\$?\s*([\d.,]+)"
    ).unwrap();

    // Domestic freight on inbound invoices
    pub static ref DOMESTIC_FREIGHT_AMOUNT: Regex = Regex::new(
        r"(?is)FRETE\s*NACIONAL.*?[R$]?\s*([\d.,]+)"
    ).unwrap();

    // Trading service charge: first number after the keyword
    pub static ref TRADING_AMOUNT: Regex = Regex::new(
        r"(?i)trading[^0-9]*([\d.,]+)"
    ).unwrap();

    // Production code such as EMALIIMP001 (letters, IMP/EXP marker, digits)
    pub static ref PROCESS_CODE: Regex = Regex::new(
        r"(?i)([A-Z]+(?:IMP|EXP)\d+)"
    ).unwrap();

    // Explicit "PROCESSO:" label in the additional information
    pub static ref PROCESS_LABEL: Regex = Regex::new(
        r"(?i)PROCESSO\s*:?\s*([A-Z0-9./\s-]+)"
    ).unwrap();

    // "PROCESSO:" or "REGISTRO:" label in a line item annotation
    pub static ref ITEM_PROCESS_LABEL: Regex = Regex::new(
        r"(?i)(?:PROCESSO|REGISTRO):\s*([A-Z0-9./\s-]+)"
    ).unwrap();

    // Domain part of a technical-contact e-mail
    pub static ref EMAIL_DOMAIN: Regex = Regex::new(
        r"@([\w.-]+)"
    ).unwrap();

    // Any ASCII letter
    pub static ref HAS_LETTER: Regex = Regex::new(
        r"[a-zA-Z]"
    ).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_afrmm_pattern_spans_lines() {
        let caps = AFRMM_AMOUNT
            .captures("Valor do afrmm\nrecolhido: R$ 1.234,56 conforme DI")
            .unwrap();
        assert_eq!(&caps[1], "1.234,56");
    }

    #[test]
    fn test_process_code_pattern() {
        let caps = PROCESS_CODE.captures("REF EMALIIMP001 2025").unwrap();
        assert_eq!(&caps[1], "EMALIIMP001");
        assert!(PROCESS_CODE.captures("SIMPLES NACIONAL").is_none());
    }

    #[test]
    fn test_item_label_requires_colon() {
        assert!(ITEM_PROCESS_LABEL.is_match("REGISTRO: 25/0001"));
        assert!(!ITEM_PROCESS_LABEL.is_match("REGISTRO 25/0001"));
    }
}
