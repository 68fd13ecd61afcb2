//! Owned element tree with lookups keyed on local name.

/// An element of a parsed document.
///
/// The name is the local name with any prefix stripped; the resolved namespace
/// URI is kept alongside but never takes part in lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    pub(crate) name: String,
    pub(crate) namespace: Option<String>,
    pub(crate) text: String,
    pub(crate) children: Vec<XmlElement>,
}

impl XmlElement {
    pub(crate) fn new(name: String, namespace: Option<String>) -> Self {
        Self {
            name,
            namespace,
            text: String::new(),
            children: Vec::new(),
        }
    }

    /// Local name of the element.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace URI the element resolved to, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Trimmed text content, `None` when empty.
    pub fn text(&self) -> Option<&str> {
        let text = self.text.trim();
        (!text.is_empty()).then_some(text)
    }

    /// Direct children in document order.
    pub fn children(&self) -> &[XmlElement] {
        &self.children
    }

    /// First direct child with the given local name.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All direct children with the given local name, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// First descendant with the given local name, depth-first in document order.
    pub fn descendant(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find_map(|c| {
            if c.name == name {
                Some(c)
            } else {
                c.descendant(name)
            }
        })
    }

    /// Follow a chain of direct children.
    pub fn path(&self, names: &[&str]) -> Option<&XmlElement> {
        names.iter().try_fold(self, |el, name| el.child(name))
    }

    /// Text of the first direct child with the given name.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).and_then(XmlElement::text)
    }

    /// Text at the end of a chain of direct children.
    pub fn path_text(&self, names: &[&str]) -> Option<&str> {
        self.path(names).and_then(XmlElement::text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn el(name: &str, text: &str, children: Vec<XmlElement>) -> XmlElement {
        XmlElement {
            name: name.to_string(),
            namespace: None,
            text: text.to_string(),
            children,
        }
    }

    #[test]
    fn test_child_and_path_lookup() {
        let tree = el(
            "root",
            "",
            vec![
                el("a", " first ", vec![el("b", "deep", vec![])]),
                el("a", "second", vec![]),
            ],
        );

        assert_eq!(tree.child_text("a"), Some("first"));
        assert_eq!(tree.children_named("a").count(), 2);
        assert_eq!(tree.path_text(&["a", "b"]), Some("deep"));
        assert!(tree.path(&["a", "missing"]).is_none());
        assert_eq!(tree.descendant("b").and_then(XmlElement::text), Some("deep"));
        assert!(tree.child("b").is_none());
    }

    #[test]
    fn test_blank_text_is_none() {
        assert_eq!(el("x", "   \n", vec![]).text(), None);
    }
}
