//! HTML import and export for [`Document`].
//!
//! Parsing goes through `scraper` (html5ever), so malformed markup is
//! repaired the way a browser would. Serialization escapes text and
//! attribute values with `html-escape` and leaves raw-text elements such as
//! `<script>` untouched.

use scraper::{ElementRef, Html, Node, Selector};
use tracing::debug;

use super::{Document, MutableTree, NodeId, NodeKind};
use crate::error::HiliteError;

/// Elements that never have children or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose text content is emitted without escaping.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "xmp", "iframe", "noembed", "noframes", "plaintext", "noscript",
];

/// How an HTML input is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HtmlKind {
    /// A snippet of body content.
    Fragment,
    /// A full page starting with a doctype or `<html>` tag.
    Document,
}

impl HtmlKind {
    /// Guesses the kind from the first tag of `html`.
    pub fn detect(html: &str) -> Self {
        let head = html.trim_start();
        let starts_with = |prefix: &str| {
            head.get(..prefix.len())
                .is_some_and(|start| start.eq_ignore_ascii_case(prefix))
        };

        if starts_with("<!doctype") || starts_with("<html") {
            HtmlKind::Document
        } else {
            HtmlKind::Fragment
        }
    }
}

/// A parsed document together with the nodes a highlight pass should
/// start from.
#[derive(Debug, Clone)]
pub struct ParsedHtml {
    pub document: Document,
    /// Document root when no selector was given, otherwise every element
    /// matching the selector, in document order.
    pub roots: Vec<NodeId>,
}

/// Parses a CSS selector.
///
/// ## Errors
///
/// Returns [`HiliteError::InvalidSelector`] when the selector is rejected.
pub fn parse_selector(selector: &str) -> Result<Selector, HiliteError> {
    Selector::parse(selector).map_err(|_| HiliteError::InvalidSelector(selector.to_string()))
}

/// Parses `html`, picking roots with `selector` when given.
///
/// ## Errors
///
/// Returns [`HiliteError::InvalidSelector`] when the selector is invalid.
pub fn parse(html: &str, selector: Option<&str>) -> Result<ParsedHtml, HiliteError> {
    let selector = selector.map(parse_selector).transpose()?;
    let kind = HtmlKind::detect(html);

    let mut importer = Importer::new(selector.as_ref());
    let root = importer.document.root();
    match kind {
        HtmlKind::Fragment => {
            let parsed = Html::parse_fragment(html);
            importer.import_children(parsed.root_element(), root);
        }
        HtmlKind::Document => {
            let parsed = Html::parse_document(html);
            for child in parsed.tree.root().children() {
                match child.value() {
                    Node::Doctype(doctype) => {
                        importer.document.append_doctype(root, doctype.name());
                    }
                    Node::Comment(comment) => {
                        importer.document.append_comment(root, comment);
                    }
                    _ => {
                        if let Some(element) = ElementRef::wrap(child) {
                            importer.import_element(element, root);
                        }
                    }
                }
            }
        }
    }

    let Importer {
        document, roots, ..
    } = importer;
    let roots = if selector.is_some() {
        roots
    } else {
        vec![document.root()]
    };
    debug!(?kind, roots = roots.len(), "parsed html");

    Ok(ParsedHtml { document, roots })
}

/// Parses a snippet of body content.
pub fn parse_fragment(html: &str) -> Document {
    let mut importer = Importer::new(None);
    let root = importer.document.root();
    importer.import_children(Html::parse_fragment(html).root_element(), root);
    importer.document
}

struct Importer<'s> {
    document: Document,
    selector: Option<&'s Selector>,
    roots: Vec<NodeId>,
}

impl<'s> Importer<'s> {
    fn new(selector: Option<&'s Selector>) -> Self {
        Self {
            document: Document::new(),
            selector,
            roots: Vec::new(),
        }
    }

    fn import_children(&mut self, element: ElementRef<'_>, parent: NodeId) {
        for child in element.children() {
            match child.value() {
                Node::Text(text) => {
                    self.document.append_text(parent, text);
                }
                Node::Comment(comment) => {
                    self.document.append_comment(parent, comment);
                }
                Node::Element(_) => {
                    if let Some(element) = ElementRef::wrap(child) {
                        self.import_element(element, parent);
                    }
                }
                _ => {}
            }
        }
    }

    fn import_element(&mut self, element: ElementRef<'_>, parent: NodeId) {
        let value = element.value();
        let mut attrs: Vec<(String, String)> = value
            .attrs()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        // scraper keeps attributes in a hash map
        attrs.sort();

        let id = self.document.append_element(parent, value.name(), attrs);
        if self.selector.is_some_and(|selector| selector.matches(&element)) {
            self.roots.push(id);
        }
        self.import_children(element, id);
    }
}

impl Document {
    /// Parses `html` as a fragment or a full document, see [`HtmlKind`].
    pub fn parse_html(html: &str) -> Self {
        match HtmlKind::detect(html) {
            HtmlKind::Fragment => parse_fragment(html),
            HtmlKind::Document => match parse(html, None) {
                Ok(parsed) => parsed.document,
                Err(_) => Document::new(),
            },
        }
    }

    /// Serializes the whole document.
    pub fn to_html(&self) -> String {
        self.inner_html(self.root())
    }

    /// Serializes the children of `id`.
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        let raw_text = self.is_raw_text(id);
        for child in self.children(id) {
            self.write_node(child, raw_text, &mut out);
        }
        out
    }

    /// Serializes `id` including its own tag.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        let raw_text = self.parent(id).is_some_and(|parent| self.is_raw_text(parent));
        self.write_node(id, raw_text, &mut out);
        out
    }

    fn is_raw_text(&self, id: NodeId) -> bool {
        self.element(id).is_some_and(|el| {
            RAW_TEXT_ELEMENTS
                .iter()
                .any(|tag| el.name.eq_ignore_ascii_case(tag))
        })
    }

    fn write_node(&self, id: NodeId, raw_text: bool, out: &mut String) {
        match self.kind(id) {
            NodeKind::Document => {
                for child in self.children(id) {
                    self.write_node(child, false, out);
                }
            }
            NodeKind::Doctype(name) => {
                out.push_str("<!DOCTYPE ");
                out.push_str(name);
                out.push('>');
            }
            NodeKind::Comment(comment) => {
                out.push_str("<!--");
                out.push_str(comment);
                out.push_str("-->");
            }
            NodeKind::Text(text) if raw_text => out.push_str(text),
            NodeKind::Text(text) => out.push_str(&html_escape::encode_text(text)),
            NodeKind::Element(el) => {
                out.push('<');
                out.push_str(&el.name);
                for (name, value) in &el.attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&html_escape::encode_double_quoted_attribute(value));
                    out.push('"');
                }
                out.push('>');

                if VOID_ELEMENTS
                    .iter()
                    .any(|tag| el.name.eq_ignore_ascii_case(tag))
                {
                    return;
                }

                let raw_text = self.is_raw_text(id);
                for child in self.children(id) {
                    self.write_node(child, raw_text, out);
                }
                out.push_str("</");
                out.push_str(&el.name);
                out.push('>');
            }
        }
    }
}
