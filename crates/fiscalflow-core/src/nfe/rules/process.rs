//! Process label recovery from free text.
//!
//! The rules run in a fixed priority order and the first match wins. The order
//! is part of the contract: ambiguous documents resolve differently if it
//! changes.

use super::FieldExtractor;
use super::patterns::{ITEM_PROCESS_LABEL, PROCESS_CODE, PROCESS_LABEL};

/// Which rule produced a process label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessRule {
    /// Bare production code (`EMALIIMP001`) in the additional information.
    ProductionCode,
    /// `PROCESSO:` label in the additional information.
    LabeledField,
    /// `PROCESSO:`/`REGISTRO:` label in a line item annotation.
    ItemAnnotation,
}

/// A recovered process label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessMatch {
    pub label: String,
    pub rule: ProcessRule,
}

/// Process extractor for the invoice-level additional information.
pub struct ProcessExtractor;

impl ProcessExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Try the item annotations in document order; the first match wins.
    pub fn extract_from_items<'a, I>(&self, annotations: I) -> Option<ProcessMatch>
    where
        I: IntoIterator<Item = &'a str>,
    {
        annotations.into_iter().find_map(|text| {
            let caps = ITEM_PROCESS_LABEL.captures(text)?;
            non_empty(&caps[1]).map(|label| ProcessMatch {
                label,
                rule: ProcessRule::ItemAnnotation,
            })
        })
    }
}

impl Default for ProcessExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for ProcessExtractor {
    type Output = ProcessMatch;

    fn extract(&self, text: &str) -> Option<ProcessMatch> {
        // Codes are often written as EMALI.IMP001/2025
        let compact = text.replace(['/', '.'], "");
        if let Some(caps) = PROCESS_CODE.captures(&compact) {
            return Some(ProcessMatch {
                label: caps[1].to_string(),
                rule: ProcessRule::ProductionCode,
            });
        }

        let caps = PROCESS_LABEL.captures(text)?;
        non_empty(&caps[1]).map(|label| ProcessMatch {
            label,
            rule: ProcessRule::LabeledField,
        })
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}
