//! Namespace-agnostic XML parsing.
//!
//! Documents are read with a namespace-resolving reader into an owned tree of
//! [`XmlElement`]s. Lookups match local names only, so the same extractor works
//! on documents with the NF-e portal namespace, another namespace, or none.

mod element;

pub use element::XmlElement;

use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use thiserror::Error;

/// Deepest element nesting accepted before a document is rejected.
pub const MAX_DEPTH: usize = 256;

/// The document is not well-formed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (at byte {position})")]
pub struct XmlError {
    pub position: u64,
    pub message: String,
}

/// A parsed XML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    root: XmlElement,
}

impl XmlDocument {
    /// Parse a document. The encoding declared in the prolog is honoured.
    pub fn parse(bytes: &[u8]) -> Result<Self, XmlError> {
        let mut reader = NsReader::from_reader(bytes);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            let (ns, event) = match reader.read_resolved_event_into(&mut buf) {
                Ok(pair) => pair,
                Err(e) => return Err(error_at(reader.buffer_position(), e)),
            };
            let namespace = namespace_uri(&ns);
            let decoder = reader.decoder();

            match event {
                Event::Start(e) => {
                    if stack.len() >= MAX_DEPTH {
                        return Err(too_deep(reader.buffer_position()));
                    }
                    let name = decoder
                        .decode(e.local_name().as_ref())
                        .map_err(|err| error_at(reader.buffer_position(), err))?
                        .into_owned();
                    stack.push(XmlElement::new(name, namespace));
                }
                Event::Empty(e) => {
                    if stack.len() >= MAX_DEPTH {
                        return Err(too_deep(reader.buffer_position()));
                    }
                    let name = decoder
                        .decode(e.local_name().as_ref())
                        .map_err(|err| error_at(reader.buffer_position(), err))?
                        .into_owned();
                    attach(&mut stack, &mut root, XmlElement::new(name, namespace));
                }
                Event::End(_) => {
                    let Some(element) = stack.pop() else {
                        return Err(error_at(reader.buffer_position(), "unexpected closing tag"));
                    };
                    attach(&mut stack, &mut root, element);
                }
                Event::Text(e) => {
                    let text = e
                        .unescape()
                        .map_err(|err| error_at(reader.buffer_position(), err))?;
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&text);
                    }
                }
                Event::CData(e) => {
                    let text = decoder
                        .decode(&e)
                        .map_err(|err| error_at(reader.buffer_position(), err))?;
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&text);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(error_at(reader.buffer_position(), "unexpected end of document"));
        }

        root.map(|root| Self { root })
            .ok_or_else(|| error_at(reader.buffer_position(), "document has no root element"))
    }

    /// The root element.
    pub fn root(&self) -> &XmlElement {
        &self.root
    }

    /// Namespace of the root element, which NF-e documents share throughout.
    pub fn namespace(&self) -> Option<&str> {
        self.root.namespace()
    }
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

fn namespace_uri(ns: &ResolveResult<'_>) -> Option<String> {
    match ns {
        ResolveResult::Bound(Namespace(uri)) => Some(String::from_utf8_lossy(uri).into_owned()),
        _ => None,
    }
}

fn too_deep(position: u64) -> XmlError {
    error_at(position, format!("element nesting exceeds {MAX_DEPTH} levels"))
}

fn error_at(position: u64, message: impl ToString) -> XmlError {
    XmlError {
        position,
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespaced_and_plain_documents_match_by_local_name() {
        let namespaced = br#"<?xml version="1.0" encoding="UTF-8"?>
            <nfeProc xmlns="http://www.portalfiscal.inf.br/nfe"><NFe><infNFe><ide><nNF>42</nNF></ide></infNFe></NFe></nfeProc>"#;
        let plain = br#"<nfeProc><NFe><infNFe><ide><nNF>42</nNF></ide></infNFe></NFe></nfeProc>"#;

        for bytes in [&namespaced[..], &plain[..]] {
            let doc = XmlDocument::parse(bytes).unwrap();
            assert_eq!(doc.root().name(), "nfeProc");
            assert_eq!(
                doc.root().path_text(&["NFe", "infNFe", "ide", "nNF"]),
                Some("42")
            );
        }

        let doc = XmlDocument::parse(namespaced).unwrap();
        assert_eq!(doc.namespace(), Some("http://www.portalfiscal.inf.br/nfe"));
        assert_eq!(XmlDocument::parse(plain).unwrap().namespace(), None);
    }

    #[test]
    fn test_prefixed_names_are_stripped() {
        let bytes = br#"<n:nfeProc xmlns:n="urn:x"><n:NFe/></n:nfeProc>"#;
        let doc = XmlDocument::parse(bytes).unwrap();
        assert_eq!(doc.root().name(), "nfeProc");
        assert!(doc.root().child("NFe").is_some());
    }

    #[test]
    fn test_entities_and_cdata() {
        let bytes = br#"<a><b>A &amp; B</b><c><![CDATA[x < y]]></c></a>"#;
        let doc = XmlDocument::parse(bytes).unwrap();
        assert_eq!(doc.root().child_text("b"), Some("A & B"));
        assert_eq!(doc.root().child_text("c"), Some("x < y"));
    }

    #[test]
    fn test_declared_latin1_encoding() {
        let mut bytes = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><a>Jo".to_vec();
        bytes.push(0xE3);
        bytes.extend_from_slice(b"o</a>");
        let doc = XmlDocument::parse(&bytes).unwrap();
        assert_eq!(doc.root().text(), Some("João"));
    }

    #[test]
    fn test_malformed_documents_fail() {
        assert!(XmlDocument::parse(b"<a><b></a>").is_err());
        assert!(XmlDocument::parse(b"<a><b>").is_err());
        assert!(XmlDocument::parse(b"").is_err());
    }

    fn nested(depth: usize) -> Vec<u8> {
        let mut xml = "<x>".repeat(depth);
        xml.push_str(&"</x>".repeat(depth));
        xml.into_bytes()
    }

    #[test]
    fn test_nesting_depth_limit() {
        let doc = XmlDocument::parse(&nested(MAX_DEPTH)).unwrap();
        assert!(doc.root().descendant("missing").is_none());

        let err = XmlDocument::parse(&nested(MAX_DEPTH + 1)).unwrap_err();
        assert!(err.message.contains("nesting"));

        let mut leaf = "<x>".repeat(MAX_DEPTH);
        leaf.push_str("<y/>");
        leaf.push_str(&"</x>".repeat(MAX_DEPTH));
        assert!(XmlDocument::parse(leaf.as_bytes()).is_err());

        assert!(XmlDocument::parse(&nested(200_000)).is_err());
    }
}
