//! Amount parsing for NF-e structured fields and free text.

use regex::Regex;
use tracing::warn;

use super::FieldExtractor;
use super::patterns::{AFRMM_AMOUNT, DOMESTIC_FREIGHT_AMOUNT, TRADING_AMOUNT};

/// Extractor for an amount that follows a keyword in free text.
pub struct KeywordAmountExtractor {
    pattern: &'static Regex,
    field: &'static str,
}

impl KeywordAmountExtractor {
    pub fn new(pattern: &'static Regex, field: &'static str) -> Self {
        Self { pattern, field }
    }

    /// AFRMM surcharge.
    pub fn afrmm() -> Self {
        Self::new(&AFRMM_AMOUNT, "AFRMM")
    }

    /// Domestic freight ("FRETE NACIONAL").
    pub fn domestic_freight() -> Self {
        Self::new(&DOMESTIC_FREIGHT_AMOUNT, "domestic freight")
    }

    /// Trading service charge.
    pub fn trading() -> Self {
        Self::new(&TRADING_AMOUNT, "trading service")
    }

    /// Amount in the text, 0.0 when absent or unparseable.
    pub fn extract_or_zero(&self, text: &str) -> f64 {
        self.extract(text).unwrap_or(0.0)
    }
}

impl FieldExtractor for KeywordAmountExtractor {
    type Output = f64;

    fn extract(&self, text: &str) -> Option<f64> {
        let caps = self.pattern.captures(text)?;
        let raw = &caps[1];
        let amount = parse_grouped_amount(raw);
        if amount.is_none() {
            warn!("Could not convert {} amount {:?}", self.field, raw);
        }
        amount
    }
}

/// Parse an amount written as `1.234,56` (dot thousands, comma decimal).
///
/// Trailing punctuation picked up from the surrounding sentence is ignored.
pub fn parse_grouped_amount(s: &str) -> Option<f64> {
    let trimmed = s.trim().trim_end_matches(['.', ',']);
    if trimmed.is_empty() {
        return None;
    }

    let normalized = trimmed.replace('.', "").replace(',', ".");
    normalized.parse::<f64>().ok()
}

/// Parse a structured XML amount such as `1234.56`.
pub fn parse_plain_amount(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_grouped_amount() {
        assert_eq!(parse_grouped_amount("1.234,56"), Some(1234.56));
        assert_eq!(parse_grouped_amount("1234,56"), Some(1234.56));
        assert_eq!(parse_grouped_amount("12.345.678,90"), Some(12345678.90));
        assert_eq!(parse_grouped_amount("350"), Some(350.0));
        assert_eq!(parse_grouped_amount("1.234,56."), Some(1234.56));
        assert_eq!(parse_grouped_amount("1,2,3"), None);
        assert_eq!(parse_grouped_amount("..."), None);
    }

    #[test]
    fn test_parse_plain_amount() {
        assert_eq!(parse_plain_amount(" 150.00 "), Some(150.0));
        assert_eq!(parse_plain_amount("abc"), None);
        assert_eq!(parse_plain_amount("NaN"), None);
    }

    #[test]
    fn test_afrmm_fallback_text() {
        let text = "Mercadoria importada. AFRMM no valor de R$ 1.234,56 recolhido.";
        assert_eq!(KeywordAmountExtractor::afrmm().extract(text), Some(1234.56));
    }

    #[test]
    fn test_trading_amount_is_case_insensitive() {
        let text = "Servico de TRADING: 2.500,00";
        assert_eq!(KeywordAmountExtractor::trading().extract_or_zero(text), 2500.0);
        assert_eq!(KeywordAmountExtractor::trading().extract_or_zero("sem servico"), 0.0);
    }

    #[test]
    fn test_domestic_freight_conversion_error_is_zero() {
        let text = "FRETE NACIONAL R$ 1,2,3";
        assert_eq!(KeywordAmountExtractor::domestic_freight().extract_or_zero(text), 0.0);
    }
}
