//! Text normalization for identifier comparison.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::models::NOT_AVAILABLE;

/// Word stripped from process labels before comparison.
const PROCESS_WORD: &str = "PROCESSO";

/// Upper-case `text` and strip diacritics, punctuation and whitespace.
///
/// Uses canonical decomposition, so the result does not depend on the host
/// locale. Only meant for building comparison keys.
pub fn normalize(text: &str) -> String {
    text.to_uppercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Comparison key for a process label.
///
/// `"PROCESSO EMALI.IMP001/2025"` and `"emali imp001-2025"` both map to
/// `"EMALIIMP0012025"`. Missing or empty labels map to `N/A`.
pub fn process_key(label: &str) -> String {
    if label.trim().is_empty() || label == NOT_AVAILABLE {
        return NOT_AVAILABLE.to_string();
    }

    let key = normalize(label).replace(PROCESS_WORD, "");
    if key.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_punctuation_and_diacritics() {
        let normalized = normalize("PROCESSO EMALI.IMP001/2025");
        assert_eq!(normalized, "PROCESSOEMALIIMP0012025");
        assert!(normalized.chars().all(|c| c.is_ascii_alphanumeric()));

        assert_eq!(normalize("Importação n. 7"), "IMPORTACAON7");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for input in ["PROCESSO EMALI.IMP001/2025", "ação-ÇÃO ñ", "Ǆ ǰ ß", "  ", "já/está"] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "input {input:?}");
        }
    }

    #[test]
    fn test_process_key_variants_collide() {
        assert_eq!(process_key("PROCESSO EMALI.IMP001/2025"), "EMALIIMP0012025");
        assert_eq!(process_key("emali imp001-2025"), "EMALIIMP0012025");
        assert_eq!(process_key("Processo: EMALIIMP001/2025"), "EMALIIMP0012025");
    }

    #[test]
    fn test_process_key_sentinels() {
        assert_eq!(process_key("N/A"), "N/A");
        assert_eq!(process_key(""), "N/A");
        assert_eq!(process_key("Processo: ./-"), "N/A");
    }
}
