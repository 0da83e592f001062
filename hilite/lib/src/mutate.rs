//! Tree surgery used to wrap matched content in Highlight Elements.
//!
//! These operations assume the caller already verified the match. They do
//! not report errors; a node without a parent or a substring that cannot be
//! found degrades to a detached wrapper instead of a panic.

use tracing::trace;

use crate::tree::{MutableTree, NodeId, NodeView};

/// Callback run with every completed Highlight Element.
pub type Observer<'a, T> = dyn FnMut(&T, NodeId) + 'a;

/// Tag and class of a wrapper element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub tag: String,
    pub class_name: String,
}

impl Marker {
    pub fn new(tag: &str, class_name: &str) -> Self {
        Self {
            tag: tag.to_string(),
            class_name: class_name.to_string(),
        }
    }

    /// Whether `view` is an element carrying this marker.
    pub fn matches(&self, view: &NodeView<'_>) -> bool {
        view.is_element(&self.tag, &self.class_name)
    }

    /// Whether `view` is an element of this tag listing this class among
    /// others.
    pub fn selects(&self, view: &NodeView<'_>) -> bool {
        view.has_class(&self.tag, &self.class_name)
    }
}

fn notify<T: MutableTree>(tree: &T, highlight: NodeId, observer: Option<&mut Observer<'_, T>>) {
    if let Some(observer) = observer {
        observer(tree, highlight);
    }
}

/// Wraps `matched` inside text node `node` and returns the wrapper.
///
/// The substring is searched from byte `match_start` onwards so repeated
/// words resolve to the occurrence the regex reported. The node is split
/// into before/matched/after; the matched piece is replaced by the wrapper
/// holding a clone of it.
pub fn wrap_text_match<T: MutableTree>(
    tree: &mut T,
    node: NodeId,
    match_start: usize,
    matched: &str,
    marker: &Marker,
    observer: Option<&mut Observer<'_, T>>,
) -> NodeId {
    let offset = match tree.view(node) {
        NodeView::Text(text) => text
            .get(match_start..)
            .and_then(|rest| rest.find(matched))
            .map_or(match_start, |found| match_start + found),
        _ => match_start,
    };

    let word = tree.split_text(node, offset);
    tree.split_text(word, matched.len());

    let highlight = tree.create_element(&marker.tag, &marker.class_name);
    let copy = tree.deep_clone(word);
    tree.append_child(highlight, copy);
    if let Some(parent) = tree.parent(word) {
        tree.replace_child(parent, highlight, word);
    }

    trace!(node = node.index(), offset, matched, "wrapped text match");
    notify(tree, highlight, observer);
    highlight
}

/// Replaces `node` with a wrapper holding a clone of it.
pub fn wrap_whole_node<T: MutableTree>(
    tree: &mut T,
    node: NodeId,
    marker: &Marker,
    observer: Option<&mut Observer<'_, T>>,
) -> NodeId {
    let highlight = tree.create_element(&marker.tag, &marker.class_name);
    let copy = tree.deep_clone(node);
    tree.append_child(highlight, copy);
    if let Some(parent) = tree.parent(node) {
        tree.replace_child(parent, highlight, node);
    }

    notify(tree, highlight, observer);
    highlight
}

/// Moves sibling `nodes` into one wrapper placed where the first one was.
///
/// Returns `None` for an empty list.
pub fn wrap_node_list<T: MutableTree>(
    tree: &mut T,
    nodes: &[NodeId],
    marker: &Marker,
    observer: Option<&mut Observer<'_, T>>,
) -> Option<NodeId> {
    let &first = nodes.first()?;

    let highlight = tree.create_element(&marker.tag, &marker.class_name);
    if let Some(parent) = tree.parent(first) {
        tree.insert_before(parent, highlight, first);
    }
    for &node in nodes {
        tree.append_child(highlight, node);
    }

    notify(tree, highlight, observer);
    Some(highlight)
}
