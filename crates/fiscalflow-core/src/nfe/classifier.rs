//! Document classification by root element.

use crate::xml::XmlDocument;

/// Event type code for "cancellation of NF-e authorized".
pub const CANCELLATION_EVENT_CODE: &str = "110111";

/// Root names of a standalone invoice or an invoice inside its protocol envelope.
const INVOICE_ROOTS: [&str; 2] = ["nfeProc", "NFe"];

/// Root name of a processed event envelope.
const EVENT_ROOT: &str = "procEventoNFe";

/// What kind of fiscal document a parsed XML is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentKind {
    Invoice,
    CancellationEvent,
    /// Anything else; carries a human-readable reason for the log.
    Unsupported(String),
}

/// Classify a parsed document.
pub fn classify(doc: &XmlDocument) -> DocumentKind {
    let root = doc.root();

    if INVOICE_ROOTS.contains(&root.name()) {
        return DocumentKind::Invoice;
    }

    if root.name() == EVENT_ROOT {
        let code = root
            .descendant("infEvento")
            .and_then(|ev| ev.child_text("tpEvento"));
        return match code {
            Some(CANCELLATION_EVENT_CODE) => DocumentKind::CancellationEvent,
            Some(other) => DocumentKind::Unsupported(format!("event type {other}")),
            None => DocumentKind::Unsupported("event without type code".to_string()),
        };
    }

    DocumentKind::Unsupported(format!("root element <{}>", root.name()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(code: &str) -> XmlDocument {
        let xml = format!(
            r#"<procEventoNFe xmlns="http://www.portalfiscal.inf.br/nfe" versao="1.00">
                <evento><infEvento><tpEvento>{code}</tpEvento></infEvento></evento>
            </procEventoNFe>"#
        );
        XmlDocument::parse(xml.as_bytes()).unwrap()
    }

    #[test]
    fn test_invoice_roots() {
        for xml in ["<nfeProc/>", "<NFe/>"] {
            let doc = XmlDocument::parse(xml.as_bytes()).unwrap();
            assert_eq!(classify(&doc), DocumentKind::Invoice);
        }
    }

    #[test]
    fn test_cancellation_event_code() {
        assert_eq!(classify(&event("110111")), DocumentKind::CancellationEvent);
    }

    #[test]
    fn test_other_event_codes_are_unsupported() {
        for code in ["110110", "210200", "110112"] {
            assert!(matches!(classify(&event(code)), DocumentKind::Unsupported(_)));
        }
    }

    #[test]
    fn test_unknown_root_is_unsupported() {
        let doc = XmlDocument::parse(b"<cteProc/>").unwrap();
        assert_eq!(
            classify(&doc),
            DocumentKind::Unsupported("root element <cteProc>".to_string())
        );
    }
}
