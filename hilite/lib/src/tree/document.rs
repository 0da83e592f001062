//! Arena-backed document tree.

use super::{MutableTree, NodeId, NodeView};

/// Payload of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The root of a document or fragment.
    Document,
    Element(ElementData),
    Text(String),
    Comment(String),
    /// A doctype declaration, holding its name (`html`).
    Doctype(String),
}

/// Tag name and attributes of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    pub name: String,
    pub attrs: Vec<(String, String)>,
}

impl ElementData {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attrs: Vec::new(),
        }
    }

    /// Value of attribute `name`, if present.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Sets attribute `name`, replacing any previous value.
    pub fn set_attr(&mut self, name: &str, value: &str) {
        match self.attrs.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.attrs.push((name.to_string(), value.to_string())),
        }
    }

    pub fn class_name(&self) -> Option<&str> {
        self.attr("class")
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
        }
    }
}

/// In-memory document tree.
///
/// Nodes live in an arena and are addressed by [`NodeId`]. Detached nodes
/// are never freed, so an id handed out once stays valid for the life of
/// the document.
///
/// ## Examples
///
/// ```
/// use hilite_lib::tree::{Document, MutableTree};
///
/// let mut doc = Document::new();
/// let p = doc.append_element(doc.root(), "p", Vec::new());
/// doc.append_text(p, "Hello ");
/// let em = doc.append_element(p, "em", Vec::new());
/// doc.append_text(em, "world");
///
/// assert_eq!(doc.text_content(doc.root()), "Hello world");
/// assert_eq!(doc.to_html(), "<p>Hello <em>world</em></p>");
/// ```
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates an empty document holding only its root.
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData::new(NodeKind::Document)],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    /// Element payload of `id`, if it is an element.
    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match self.kind(id) {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    pub fn append_element(
        &mut self,
        parent: NodeId,
        name: &str,
        attrs: Vec<(String, String)>,
    ) -> NodeId {
        let id = self.push(NodeKind::Element(ElementData {
            name: name.to_string(),
            attrs,
        }));
        self.attach(parent, id);
        id
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        let id = self.push(NodeKind::Text(text.to_string()));
        self.attach(parent, id);
        id
    }

    pub fn append_comment(&mut self, parent: NodeId, comment: &str) -> NodeId {
        let id = self.push(NodeKind::Comment(comment.to_string()));
        self.attach(parent, id);
        id
    }

    pub fn append_doctype(&mut self, parent: NodeId, name: &str) -> NodeId {
        let id = self.push(NodeKind::Doctype(name.to_string()));
        self.attach(parent, id);
        id
    }

    /// Elements below the root with tag `tag` (ASCII case-insensitive).
    pub fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|&id| {
                self.element(id)
                    .is_some_and(|el| el.name.eq_ignore_ascii_case(tag))
            })
            .collect()
    }

    /// Elements below the root with tag `tag` and exactly class `class_name`.
    pub fn find_elements(&self, tag: &str, class_name: &str) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|&id| self.view(id).is_element(tag, class_name))
            .collect()
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(NodeData::new(kind));
        NodeId(self.nodes.len() - 1)
    }

    /// Appends a detached node to `parent`.
    fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parent = Some(parent);
    }

    fn position(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.nodes[parent.0].children.iter().position(|&c| c == child)
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            if let Some(index) = self.position(parent, id) {
                self.nodes[parent.0].children.remove(index);
            }
        }
    }

    /// Whether `ancestor` is `id` or one of its ancestors.
    fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.nodes[node.0].parent;
        }
        false
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        for &child in &self.nodes[id.0].children {
            match &self.nodes[child.0].kind {
                NodeKind::Text(text) => out.push_str(text),
                NodeKind::Element(_) | NodeKind::Document => self.collect_text(child, out),
                NodeKind::Comment(_) | NodeKind::Doctype(_) => {}
            }
        }
    }
}

/// Largest char boundary of `text` not above `offset`.
fn floor_char_boundary(text: &str, offset: usize) -> usize {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

impl MutableTree for Document {
    fn view(&self, id: NodeId) -> NodeView<'_> {
        match self.kind(id) {
            NodeKind::Document => NodeView::Document,
            NodeKind::Element(data) => NodeView::Element {
                name: &data.name,
                class_name: data.class_name(),
            },
            NodeKind::Text(text) => NodeView::Text(text),
            NodeKind::Comment(comment) => NodeView::Comment(comment),
            NodeKind::Doctype(_) => NodeView::Doctype,
        }
    }

    fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    fn child_at(&self, parent: NodeId, index: usize) -> Option<NodeId> {
        self.nodes[parent.0].children.get(index).copied()
    }

    fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.position(parent, id)?;
        self.child_at(parent, index + 1)
    }

    fn text_content(&self, id: NodeId) -> String {
        match self.kind(id) {
            NodeKind::Text(text) | NodeKind::Comment(text) => text.clone(),
            NodeKind::Doctype(_) => String::new(),
            NodeKind::Element(_) | NodeKind::Document => {
                let mut out = String::new();
                self.collect_text(id, &mut out);
                out
            }
        }
    }

    fn split_text(&mut self, id: NodeId, offset: usize) -> NodeId {
        let rest = match &mut self.nodes[id.0].kind {
            NodeKind::Text(text) => {
                let offset = floor_char_boundary(text, offset);
                text.split_off(offset)
            }
            _ => String::new(),
        };

        let new = self.push(NodeKind::Text(rest));
        if let Some(parent) = self.nodes[id.0].parent {
            if let Some(index) = self.position(parent, id) {
                self.nodes[parent.0].children.insert(index + 1, new);
                self.nodes[new.0].parent = Some(parent);
            }
        }
        new
    }

    fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let copy = self.push(self.nodes[id.0].kind.clone());
        for child in self.nodes[id.0].children.clone() {
            let child_copy = self.deep_clone(child);
            self.attach(copy, child_copy);
        }
        copy
    }

    fn create_element(&mut self, tag: &str, class_name: &str) -> NodeId {
        let mut data = ElementData::new(tag);
        data.set_attr("class", class_name);
        self.push(NodeKind::Element(data))
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if self.is_ancestor_or_self(child, parent) {
            return;
        }
        self.detach(child);
        self.attach(parent, child);
    }

    fn insert_before(&mut self, parent: NodeId, node: NodeId, reference: NodeId) {
        if node == reference || self.is_ancestor_or_self(node, parent) {
            return;
        }
        self.detach(node);
        let index = self
            .position(parent, reference)
            .unwrap_or(self.nodes[parent.0].children.len());
        self.nodes[parent.0].children.insert(index, node);
        self.nodes[node.0].parent = Some(parent);
    }

    fn replace_child(&mut self, parent: NodeId, node: NodeId, old: NodeId) {
        if node == old || self.position(parent, old).is_none() {
            return;
        }
        if self.is_ancestor_or_self(node, parent) {
            return;
        }
        self.detach(node);
        // detaching `node` may have shifted `old`
        if let Some(index) = self.position(parent, old) {
            self.nodes[parent.0].children[index] = node;
            self.nodes[node.0].parent = Some(parent);
            self.nodes[old.0].parent = None;
        }
    }

    fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        if self.nodes[child.0].parent == Some(parent) {
            self.detach(child);
        }
    }

    fn normalize(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.nodes[id.0].children);
        let mut kept: Vec<NodeId> = Vec::with_capacity(children.len());
        let mut last_text: Option<NodeId> = None;

        for child in children {
            let text = match &self.nodes[child.0].kind {
                NodeKind::Text(text) => Some(text.clone()),
                _ => None,
            };

            match text {
                Some(text) if text.is_empty() => {
                    self.nodes[child.0].parent = None;
                }
                Some(text) => match last_text {
                    Some(previous) => {
                        if let NodeKind::Text(existing) = &mut self.nodes[previous.0].kind {
                            existing.push_str(&text);
                        }
                        self.nodes[child.0].parent = None;
                    }
                    None => {
                        last_text = Some(child);
                        kept.push(child);
                    }
                },
                None => {
                    last_text = None;
                    self.normalize(child);
                    kept.push(child);
                }
            }
        }

        self.nodes[id.0].children = kept;
    }

    fn children(&self, parent: NodeId) -> Vec<NodeId> {
        self.nodes[parent.0].children.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraph(parts: &[&str]) -> (Document, NodeId) {
        let mut doc = Document::new();
        let p = doc.append_element(doc.root(), "p", Vec::new());
        for part in parts {
            doc.append_text(p, part);
        }
        (doc, p)
    }

    #[test]
    fn test_text_content_skips_comments() {
        let mut doc = Document::new();
        let div = doc.append_element(doc.root(), "div", Vec::new());
        doc.append_text(div, "a");
        doc.append_comment(div, "hidden");
        let b = doc.append_element(div, "b", Vec::new());
        doc.append_text(b, "c");

        assert_eq!(doc.text_content(div), "ac");
        assert_eq!(doc.text_content(doc.root()), "ac");
    }

    #[test]
    fn test_split_text() {
        let (mut doc, p) = paragraph(&["hello world"]);
        let first = doc.child_at(p, 0).unwrap();

        let rest = doc.split_text(first, 6);

        assert_eq!(doc.view(first), NodeView::Text("hello "));
        assert_eq!(doc.view(rest), NodeView::Text("world"));
        assert_eq!(doc.children(p), vec![first, rest]);
        assert_eq!(doc.next_sibling(first), Some(rest));
    }

    #[test]
    fn test_split_text_at_edges_creates_empty_nodes() {
        let (mut doc, p) = paragraph(&["abc"]);
        let first = doc.child_at(p, 0).unwrap();

        let rest = doc.split_text(first, 0);
        assert_eq!(doc.view(first), NodeView::Text(""));
        let tail = doc.split_text(rest, 3);
        assert_eq!(doc.view(tail), NodeView::Text(""));
        assert_eq!(doc.children(p).len(), 3);
        assert_eq!(doc.text_content(p), "abc");
    }

    #[test]
    fn test_split_text_respects_char_boundaries() {
        let (mut doc, p) = paragraph(&["héllo"]);
        let first = doc.child_at(p, 0).unwrap();

        // byte 2 is inside 'é'
        let rest = doc.split_text(first, 2);
        assert_eq!(doc.view(first), NodeView::Text("h"));
        assert_eq!(doc.view(rest), NodeView::Text("éllo"));
    }

    #[test]
    fn test_deep_clone_is_detached() {
        let mut doc = Document::new();
        let em = doc.append_element(doc.root(), "em", Vec::new());
        doc.append_text(em, "dog");

        let copy = doc.deep_clone(em);

        assert_ne!(copy, em);
        assert_eq!(doc.parent(copy), None);
        assert_eq!(doc.text_content(copy), "dog");
        assert_eq!(doc.children(doc.root()), vec![em]);
    }

    #[test]
    fn test_replace_and_insert() {
        let (mut doc, p) = paragraph(&["a", "b"]);
        let a = doc.child_at(p, 0).unwrap();
        let b = doc.child_at(p, 1).unwrap();

        let wrapper = doc.create_element("span", "highlight");
        doc.replace_child(p, wrapper, b);
        assert_eq!(doc.children(p), vec![a, wrapper]);
        assert_eq!(doc.parent(b), None);

        doc.append_child(wrapper, b);
        let c = doc.create_element("i", "x");
        doc.insert_before(p, c, a);
        assert_eq!(doc.children(p), vec![c, a, wrapper]);
        assert_eq!(doc.text_content(p), "ab");
    }

    #[test]
    fn test_append_child_refuses_cycles() {
        let mut doc = Document::new();
        let outer = doc.append_element(doc.root(), "div", Vec::new());
        let inner = doc.append_element(outer, "div", Vec::new());

        doc.append_child(inner, outer);

        assert_eq!(doc.parent(outer), Some(doc.root()));
        assert_eq!(doc.parent(inner), Some(outer));
    }

    #[test]
    fn test_insert_before_unknown_reference_appends() {
        let (mut doc, p) = paragraph(&["a"]);
        let stray = doc.create_element("b", "x");
        let node = doc.create_element("i", "y");

        doc.insert_before(p, node, stray);

        assert_eq!(doc.child_at(p, 1), Some(node));
    }

    #[test]
    fn test_normalize_merges_and_drops_empty_text() {
        let (mut doc, p) = paragraph(&["a", "", "b"]);
        let em = doc.append_element(p, "em", Vec::new());
        doc.append_text(em, "x");
        doc.append_text(em, "y");
        doc.append_text(p, "c");

        doc.normalize(p);

        let children = doc.children(p);
        assert_eq!(children.len(), 3);
        assert_eq!(doc.view(children[0]), NodeView::Text("ab"));
        assert_eq!(doc.children(em).len(), 1);
        assert_eq!(doc.text_content(p), "abxyc");
    }

    #[test]
    fn test_find_elements() {
        let mut doc = Document::new();
        let span = doc.append_element(
            doc.root(),
            "SPAN",
            vec![("class".to_string(), "highlight".to_string())],
        );
        doc.append_element(
            doc.root(),
            "span",
            vec![("class".to_string(), "other".to_string())],
        );

        assert_eq!(doc.find_elements("span", "highlight"), vec![span]);
        assert_eq!(doc.elements_by_tag("span").len(), 2);
    }

    #[test]
    fn test_descendants_in_document_order() {
        let mut doc = Document::new();
        let a = doc.append_element(doc.root(), "a", Vec::new());
        let b = doc.append_element(a, "b", Vec::new());
        let c = doc.append_element(doc.root(), "c", Vec::new());

        assert_eq!(doc.descendants(doc.root()), vec![a, b, c]);
    }
}
