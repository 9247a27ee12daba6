//! Owned XML document model over `roxmltree`.
//!
//! `roxmltree` borrows from its input, but clipboard payloads are dropped
//! right after parsing, so the tree is copied into owned nodes. Comments
//! and processing instructions are not kept.
//!
//! Parsing never validates: a DOCTYPE is accepted and otherwise ignored.

use std::str::Utf8Error;

/// Why a payload could not be turned into a [`Document`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseFailure {
    /// Nothing left to parse (e.g. the payload was only the terminator).
    #[error("payload is empty")]
    Empty,
    #[error("payload is not UTF-8: {0}")]
    Encoding(#[from] Utf8Error),
    #[error("malformed XML: {0}")]
    Malformed(String),
}

/// A parsed XML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    root: Element,
}

impl Document {
    /// The document element.
    pub fn root(&self) -> &Element {
        &self.root
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub namespace: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    namespace: Option<String>,
    attributes: Vec<Attribute>,
    children: Vec<Node>,
}

impl Element {
    /// Local name, without prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Value of the first attribute with local name `name`, in any namespace.
    ///
    /// Spreadsheet payloads mix `ss:Index` and unprefixed attributes, so
    /// matching on the local name is what callers want.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Child elements, skipping text.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// Child elements with local name `name`.
    pub fn elements_named<'a, 'n>(
        &'a self,
        name: &'n str,
    ) -> impl Iterator<Item = &'a Element> + use<'a, 'n> {
        self.elements().filter(move |e| e.name == name)
    }

    /// First child element with local name `name`.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements_named(name).next()
    }

    /// Concatenated text of this element and all its descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                Node::Text(t) => out.push_str(t),
                Node::Element(e) => e.collect_text(out),
            }
        }
    }

    fn from_node(node: roxmltree::Node<'_, '_>) -> Self {
        let tag = node.tag_name();
        let attributes = node
            .attributes()
            .map(|a| Attribute {
                name: a.name().to_string(),
                namespace: a.namespace().map(String::from),
                value: a.value().to_string(),
            })
            .collect();

        let children = node
            .children()
            .filter_map(|child| {
                if child.is_element() {
                    Some(Node::Element(Element::from_node(child)))
                } else if child.is_text() {
                    child.text().map(|t| Node::Text(t.to_string()))
                } else {
                    None
                }
            })
            .collect();

        Self {
            name: tag.name().to_string(),
            namespace: tag.namespace().map(String::from),
            attributes,
            children,
        }
    }
}

/// Parse `bytes` as a UTF-8 XML document without validation.
pub fn parse(bytes: &[u8]) -> Result<Document, ParseFailure> {
    if bytes.is_empty() {
        return Err(ParseFailure::Empty);
    }

    let text = std::str::from_utf8(bytes)?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    };
    let doc = roxmltree::Document::parse_with_options(text, options)
        .map_err(|e| ParseFailure::Malformed(e.to_string()))?;

    Ok(Document {
        root: Element::from_node(doc.root_element()),
    })
}
