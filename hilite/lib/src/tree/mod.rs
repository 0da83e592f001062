//! Mutable tree capability and its in-memory implementation.
//!
//! The highlighter never talks to a concrete DOM. It works against the
//! [`MutableTree`] trait, which exposes the handful of operations the
//! algorithm needs (split a text node, clone, create, insert, replace,
//! reparent, normalize). [`Document`] implements it over an arena, and the
//! [`html`] module moves documents in and out of HTML.

mod document;
pub mod html;

pub use document::{Document, ElementData, NodeKind};

/// Identifier of a node inside a tree.
///
/// Ids stay valid for the lifetime of the tree, including after the node
/// has been detached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// The raw arena index.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Borrowed view of a node, used for kind dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeView<'a> {
    /// The document (or fragment) root.
    Document,
    /// An element with its tag name and `class` attribute.
    Element {
        name: &'a str,
        class_name: Option<&'a str>,
    },
    Text(&'a str),
    Comment(&'a str),
    Doctype,
}

impl NodeView<'_> {
    /// Whether this is an element with tag `tag` (ASCII case-insensitive)
    /// and exactly the class `class_name`.
    pub fn is_element(&self, tag: &str, class_name: &str) -> bool {
        match self {
            NodeView::Element {
                name,
                class_name: class,
            } => name.eq_ignore_ascii_case(tag) && *class == Some(class_name),
            _ => false,
        }
    }

    /// Whether this is an element with tag `tag` whose class list contains
    /// `class_name`, the way the CSS selector `tag.class_name` matches.
    pub fn has_class(&self, tag: &str, class_name: &str) -> bool {
        match self {
            NodeView::Element {
                name,
                class_name: Some(classes),
            } => {
                name.eq_ignore_ascii_case(tag)
                    && classes.split_ascii_whitespace().any(|c| c == class_name)
            }
            _ => false,
        }
    }
}

/// Tree operations required by the highlighter.
///
/// Operations follow DOM semantics. None of them validate their inputs
/// beyond what is needed to stay memory safe: passing a node that is not a
/// child of `parent` makes the operation fall back to a harmless result
/// (append, or no-op) instead of failing.
pub trait MutableTree {
    /// Kind and payload of `id`.
    fn view(&self, id: NodeId) -> NodeView<'_>;

    fn parent(&self, id: NodeId) -> Option<NodeId>;

    /// The `index`-th child of `parent`, if any.
    fn child_at(&self, parent: NodeId, index: usize) -> Option<NodeId>;

    fn next_sibling(&self, id: NodeId) -> Option<NodeId>;

    /// Concatenated text of `id` and its descendants.
    fn text_content(&self, id: NodeId) -> String;

    /// Splits a text node at byte `offset`.
    ///
    /// `id` keeps the text before the offset; a new text node holding the
    /// rest is inserted right after it and returned.
    fn split_text(&mut self, id: NodeId, offset: usize) -> NodeId;

    /// Deep-clones `id` into a new detached node.
    fn deep_clone(&mut self, id: NodeId) -> NodeId;

    /// Creates a detached element with the given tag and class.
    fn create_element(&mut self, tag: &str, class_name: &str) -> NodeId;

    /// Moves `child` to the end of `parent`'s children.
    fn append_child(&mut self, parent: NodeId, child: NodeId);

    /// Moves `node` right before `reference` in `parent`.
    fn insert_before(&mut self, parent: NodeId, node: NodeId, reference: NodeId);

    /// Puts `node` where `old` was in `parent`; `old` becomes detached.
    fn replace_child(&mut self, parent: NodeId, node: NodeId, old: NodeId);

    /// Detaches `child` from `parent`.
    fn remove_child(&mut self, parent: NodeId, child: NodeId);

    /// Merges adjacent text nodes and drops empty ones below `id`.
    fn normalize(&mut self, id: NodeId);

    /// Children of `parent` in order.
    fn children(&self, parent: NodeId) -> Vec<NodeId> {
        let mut children = Vec::new();
        while let Some(child) = self.child_at(parent, children.len()) {
            children.push(child);
        }
        children
    }

    /// Descendants of `id` in document order, excluding `id` itself.
    fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            found.push(node);
            stack.extend(self.children(node).into_iter().rev());
        }
        found
    }
}
