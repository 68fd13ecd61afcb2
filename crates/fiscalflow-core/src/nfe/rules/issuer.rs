//! Best-effort identification of the software that issued a document.

use std::collections::BTreeMap;

use tracing::trace;

use crate::models::UNIDENTIFIED_SYSTEM;
use crate::models::config::ExtractionConfig;

use super::patterns::{EMAIL_DOMAIN, HAS_LETTER};

/// Issuing-system heuristic over `verProc` and the technical-contact e-mail.
#[derive(Debug, Clone)]
pub struct IssuerIdentifier {
    aliases: BTreeMap<String, String>,
    suffix: String,
}

impl IssuerIdentifier {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            aliases: config
                .vendor_aliases
                .iter()
                .map(|(k, v)| (k.to_lowercase(), v.clone()))
                .collect(),
            suffix: config.vendor_suffix.clone(),
        }
    }

    /// Identify the issuing system.
    ///
    /// A `verProc` with letters that is not a dotted number is used verbatim;
    /// otherwise the vendor is derived from the e-mail domain.
    pub fn identify(&self, version: Option<&str>, contact_email: Option<&str>) -> String {
        if let Some(version) = version.map(str::trim) {
            if HAS_LETTER.is_match(version) && !is_dotted_number(version) {
                trace!("Issuing system from verProc: {}", version);
                return version.to_string();
            }
        }

        contact_email
            .and_then(|email| self.vendor_from_email(email))
            .unwrap_or_else(|| UNIDENTIFIED_SYSTEM.to_string())
    }

    fn vendor_from_email(&self, email: &str) -> Option<String> {
        let caps = EMAIL_DOMAIN.captures(email)?;
        let label = caps[1].split('.').next().filter(|l| !l.is_empty())?;
        let lower = label.to_lowercase();

        if let Some(name) = self
            .aliases
            .iter()
            .find_map(|(needle, name)| lower.contains(needle.as_str()).then_some(name))
        {
            trace!("Issuing system from alias {}: {}", label, name);
            return Some(name.clone());
        }

        Some(format!("{}{}", capitalize(&lower), self.suffix))
    }
}

impl Default for IssuerIdentifier {
    fn default() -> Self {
        Self::new(&ExtractionConfig::default())
    }
}

fn is_dotted_number(s: &str) -> bool {
    let digits: String = s.chars().filter(|c| *c != '.').collect();
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
