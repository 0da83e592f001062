//! Recursive tree walk driving single-node and spanning matches.
//!
//! For every text node the walker first tries the single-node match
//! pattern. Only when that fails, and the phrase's span pattern matches a
//! prefix running off the end of the node, does it scan forward through the
//! following siblings to reconstruct a match that crosses node boundaries.
//!
//! A spanning match is accepted only when it tiles contiguous content:
//! the first segment ends where its text node ends, every following
//! segment starts where its node starts, elements are consumed whole and
//! only the last segment may stop short of its node's end. Wrapping such a
//! match therefore never moves text out of order.

use regex::Regex;
use tracing::{debug, trace};

use crate::error::HiliteError;
use crate::mutate::{Marker, Observer, wrap_node_list, wrap_text_match, wrap_whole_node};
use crate::options::SUB_HIGHLIGHT_CLASS;
use crate::pattern::{HIT_GROUP, SpanCapture, SpanPattern};
use crate::tree::{MutableTree, NodeId, NodeView};

/// How many ancestor levels the sibling scan may climb when the node a
/// spanning match starts in has no next sibling.
pub const MAX_ANCESTOR_HOPS: usize = 1;

/// Elements whose content is never searched: raw-text elements, plus
/// `textarea` and `title`, whose markup would serialize as literal text.
const SKIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "textarea", "title", "noscript", "xmp", "iframe", "noembed", "noframes",
    "plaintext",
];

fn is_skipped_element(name: &str) -> bool {
    SKIPPED_ELEMENTS
        .iter()
        .any(|tag| name.eq_ignore_ascii_case(tag))
}

/// One piece of a spanning match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment {
    /// Bytes `start..end` of a text node.
    Text { node: NodeId, start: usize, end: usize },
    /// A whole element.
    Element(NodeId),
}

enum Visit {
    Text,
    Children,
    Skip,
}

/// Walks one root, wrapping every match it finds.
#[derive(Debug)]
pub struct Walker<'a> {
    match_pattern: &'a Regex,
    span_pattern: Option<&'a SpanPattern>,
    marker: &'a Marker,
    sub_marker: Marker,
    root: NodeId,
}

impl<'a> Walker<'a> {
    pub fn new(
        match_pattern: &'a Regex,
        span_pattern: Option<&'a SpanPattern>,
        marker: &'a Marker,
        root: NodeId,
    ) -> Self {
        Self {
            match_pattern,
            span_pattern,
            sub_marker: Marker::new(&marker.tag, SUB_HIGHLIGHT_CLASS),
            marker,
            root,
        }
    }

    /// Visits `node` and returns how many of its original siblings (itself
    /// included) a match starting at it consumed.
    ///
    /// ## Errors
    ///
    /// Returns [`HiliteError::InvalidPattern`] if a continuation pattern
    /// fails to compile.
    pub fn walk<T: MutableTree>(
        &self,
        tree: &mut T,
        node: NodeId,
        observer: Option<&mut Observer<'_, T>>,
    ) -> Result<usize, HiliteError> {
        let visit = match tree.view(node) {
            NodeView::Text(_) => Visit::Text,
            NodeView::Element { name, .. } if is_skipped_element(name) => Visit::Skip,
            view @ NodeView::Element { .. } if self.marker.matches(&view) => Visit::Skip,
            NodeView::Element { .. } | NodeView::Document => Visit::Children,
            NodeView::Comment(_) | NodeView::Doctype => Visit::Skip,
        };

        match visit {
            Visit::Text => self.walk_text(tree, node, observer),
            Visit::Children => {
                self.walk_children(tree, node, observer)?;
                Ok(0)
            }
            Visit::Skip => Ok(0),
        }
    }

    fn walk_children<T: MutableTree>(
        &self,
        tree: &mut T,
        node: NodeId,
        mut observer: Option<&mut Observer<'_, T>>,
    ) -> Result<(), HiliteError> {
        let mut index = 0;
        while let Some(child) = tree.child_at(node, index) {
            let consumed = self.walk(tree, child, observer.as_deref_mut())?;
            // a match leaves the text before it at `index` and the wrapper at `index + 1`
            index += if consumed > 0 { 2 } else { 1 };
        }
        Ok(())
    }

    fn walk_text<T: MutableTree>(
        &self,
        tree: &mut T,
        node: NodeId,
        observer: Option<&mut Observer<'_, T>>,
    ) -> Result<usize, HiliteError> {
        let (hit, partial) = {
            let NodeView::Text(text) = tree.view(node) else {
                return Ok(0);
            };
            let hit = self.match_pattern.captures(text).and_then(|caps| {
                let whole = caps.get(0)?;
                let hit = caps.name(HIT_GROUP)?;
                Some((whole.start(), hit.as_str().to_string()))
            });
            let partial = match (&hit, self.span_pattern) {
                (None, Some(span)) => span
                    .captures(text)
                    .filter(|capture| !capture.is_complete(span)),
                _ => None,
            };
            (hit, partial)
        };

        if let Some((start, matched)) = hit {
            trace!(node = node.index(), start, matched = %matched, "single-node match");
            wrap_text_match(tree, node, start, &matched, self.marker, observer);
            return Ok(1);
        }

        let (Some(span), Some(capture)) = (self.span_pattern, partial) else {
            return Ok(0);
        };
        trace!(
            node = node.index(),
            pieces = capture.pieces,
            "partial match at end of text node"
        );

        let Some(segments) = self.scan(tree, node, span, capture)? else {
            trace!(node = node.index(), "spanning match not completed");
            return Ok(0);
        };

        debug!(
            node = node.index(),
            segments = segments.len(),
            "spanning match"
        );
        self.wrap_span(tree, &segments, observer);
        Ok(segments.len())
    }

    /// First node a spanning match may continue into.
    fn continuation_start<T: MutableTree>(&self, tree: &T, node: NodeId) -> Option<NodeId> {
        let mut current = node;
        for hop in 0..=MAX_ANCESTOR_HOPS {
            if current == self.root {
                return None;
            }
            if let Some(next) = tree.next_sibling(current) {
                return Some(next);
            }
            if hop < MAX_ANCESTOR_HOPS {
                current = tree.parent(current)?;
            }
        }
        None
    }

    /// Collects the segments of a spanning match starting with `capture` in
    /// `start`. Returns `None` when the phrase cannot be completed.
    fn scan<T: MutableTree>(
        &self,
        tree: &T,
        start: NodeId,
        span: &SpanPattern,
        capture: SpanCapture,
    ) -> Result<Option<Vec<Segment>>, HiliteError> {
        let mut segments = vec![Segment::Text {
            node: start,
            start: capture.start,
            end: capture.end,
        }];
        let mut consumed = capture.pieces;
        let mut next = self.continuation_start(tree, start);

        while let Some(pattern) = span.continuation(consumed)? {
            let Some(node) = next else {
                return Ok(None);
            };
            let Some((segment, pieces)) = self.continue_into(tree, node, &pattern) else {
                return Ok(None);
            };

            trace!(
                node = node.index(),
                pieces,
                remaining = %pattern.remaining_text(pieces),
                "span continues"
            );
            segments.push(segment);
            consumed += pieces;
            next = tree.next_sibling(node);
        }

        let last = segments[segments.len() - 1];
        if !self.ends_on_boundary(tree, span, last) {
            trace!(node = start.index(), "span runs into a word character");
            return Ok(None);
        }

        Ok(Some(segments))
    }

    /// Checks the end boundary of a match whose last segment runs to the
    /// end of its node against the text of the following sibling.
    fn ends_on_boundary<T: MutableTree>(
        &self,
        tree: &T,
        span: &SpanPattern,
        last: Segment,
    ) -> bool {
        let (node, before) = match last {
            Segment::Element(node) => (node, tree.text_content(node)),
            Segment::Text { node, end, .. } => match tree.view(node) {
                NodeView::Text(text) if end == text.len() => (node, text.to_string()),
                _ => return true,
            },
        };
        let after = match tree.next_sibling(node) {
            Some(next) => match tree.view(next) {
                NodeView::Text(text) => text.to_string(),
                NodeView::Element { .. } => tree.text_content(next),
                _ => String::new(),
            },
            None => String::new(),
        };
        span.ends_on_boundary(&before, &after)
    }

    /// Tests `node` against a continuation pattern. Returns the segment and
    /// the number of pieces it consumed.
    fn continue_into<T: MutableTree>(
        &self,
        tree: &T,
        node: NodeId,
        pattern: &SpanPattern,
    ) -> Option<(Segment, usize)> {
        match tree.view(node) {
            NodeView::Text(text) => {
                let capture = pattern.captures(text)?;
                let whole = capture.end == text.len();
                if !whole && !capture.is_complete(pattern) {
                    return None;
                }
                Some((
                    Segment::Text {
                        node,
                        start: capture.start,
                        end: capture.end,
                    },
                    capture.pieces,
                ))
            }
            view @ NodeView::Element { name, .. } => {
                if is_skipped_element(name) || self.marker.matches(&view) {
                    return None;
                }
                if tree
                    .descendants(node)
                    .into_iter()
                    .any(|id| self.marker.matches(&tree.view(id)))
                {
                    return None;
                }

                let text = tree.text_content(node);
                let capture = pattern.captures(&text)?;
                (capture.end == text.len()).then_some((Segment::Element(node), capture.pieces))
            }
            NodeView::Comment(_) | NodeView::Doctype | NodeView::Document => None,
        }
    }

    /// Wraps each segment with the sub marker, then all of them with the
    /// final marker.
    fn wrap_span<T: MutableTree>(
        &self,
        tree: &mut T,
        segments: &[Segment],
        observer: Option<&mut Observer<'_, T>>,
    ) {
        let mut parts = Vec::with_capacity(segments.len());
        for segment in segments {
            let part = match *segment {
                Segment::Text { node, start, end } => {
                    let matched = match tree.view(node) {
                        NodeView::Text(text) => text.get(start..end).unwrap_or_default().to_string(),
                        _ => String::new(),
                    };
                    wrap_text_match(tree, node, start, &matched, &self.sub_marker, None)
                }
                Segment::Element(node) => wrap_whole_node(tree, node, &self.sub_marker, None),
            };
            parts.push(part);
        }
        wrap_node_list(tree, &parts, self.marker, observer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::build_match_pattern;
    use crate::tree::Document;

    struct Fixture {
        match_pattern: Regex,
        span_pattern: Option<SpanPattern>,
        marker: Marker,
    }

    impl Fixture {
        fn new(phrase: &str) -> Self {
            Self {
                match_pattern: build_match_pattern(&[phrase], false, false, r"\b", r"\b")
                    .unwrap()
                    .unwrap(),
                span_pattern: SpanPattern::new(phrase, true, None).unwrap(),
                marker: Marker::new("span", "highlight"),
            }
        }

        fn run(&self, doc: &mut Document, root: NodeId) -> usize {
            let walker = Walker::new(
                &self.match_pattern,
                self.span_pattern.as_ref(),
                &self.marker,
                root,
            );
            walker.walk(doc, root, None).unwrap()
        }
    }

    #[test]
    fn test_single_node_match_reports_one() {
        let mut doc = Document::parse_html("<p>the scurvy dog</p>");
        let text = doc.child_at(doc.elements_by_tag("p")[0], 0).unwrap();
        let fixture = Fixture::new("scurvy");

        assert_eq!(fixture.run(&mut doc, text), 1);
        assert_eq!(doc.find_elements("span", "highlight").len(), 1);
    }

    #[test]
    fn test_repeated_words_in_one_node() {
        let mut doc = Document::parse_html("<p>dog eat dog, dog</p>");
        let root = doc.root();

        Fixture::new("dog").run(&mut doc, root);

        assert_eq!(doc.find_elements("span", "highlight").len(), 3);
        assert_eq!(doc.text_content(root), "dog eat dog, dog");
    }

    #[test]
    fn test_spanning_across_inline_element() {
        let mut doc = Document::parse_html("<p>Bury the scurvy <em>dog</em> at dawn</p>");
        let root = doc.root();

        Fixture::new("scurvy dog").run(&mut doc, root);

        assert_eq!(
            doc.to_html(),
            concat!(
                r#"<p>Bury the <span class="highlight">"#,
                r#"<span class="sub-highlight">scurvy </span>"#,
                r#"<span class="sub-highlight"><em>dog</em></span>"#,
                r#"</span> at dawn</p>"#
            )
        );
    }

    #[test]
    fn test_spanning_into_partial_final_text() {
        let mut doc = Document::parse_html("<p>the <b>scurvy</b> dog ran</p>");
        let root = doc.root();

        Fixture::new("scurvy dog").run(&mut doc, root);

        let highlights = doc.find_elements("span", "highlight");
        assert_eq!(highlights.len(), 1);
        assert_eq!(doc.text_content(highlights[0]), "scurvy dog");
        assert_eq!(doc.text_content(root), "the scurvy dog ran");
    }

    #[test]
    fn test_spanning_reports_segment_count() {
        let mut doc = Document::parse_html("<p>a scurvy <em>sea</em> dog</p>");
        let p = doc.elements_by_tag("p")[0];
        let start = doc.child_at(p, 0).unwrap();
        let fixture = Fixture::new("scurvy sea dog");

        let walker = Walker::new(
            &fixture.match_pattern,
            fixture.span_pattern.as_ref(),
            &fixture.marker,
            p,
        );
        assert_eq!(walker.walk(&mut doc, start, None).unwrap(), 3);
    }

    #[test]
    fn test_unfinished_span_leaves_tree_untouched() {
        let html = "<p>bury the scurvy <em>cat</em> at dawn</p>";
        let mut doc = Document::parse_html(html);
        let root = doc.root();

        Fixture::new("scurvy dog").run(&mut doc, root);

        assert_eq!(doc.to_html(), html);
    }

    #[test]
    fn test_element_must_be_consumed_whole() {
        let html = "<p>the scurvy <em>dog star</em></p>";
        let mut doc = Document::parse_html(html);
        let root = doc.root();

        Fixture::new("scurvy dog").run(&mut doc, root);

        assert_eq!(doc.to_html(), html);
    }

    #[test]
    fn test_span_does_not_leave_walk_root() {
        let html = "<div><p>the scurvy</p><p>dog</p></div>";
        let mut doc = Document::parse_html(html);
        let first = doc.elements_by_tag("p")[0];

        Fixture::new("scurvy dog").run(&mut doc, first);

        assert_eq!(doc.to_html(), html);
    }

    #[test]
    fn test_ancestor_hop_is_limited() {
        let html = "<p><i><b>the scurvy</b></i> dog</p>";
        let mut doc = Document::parse_html(html);
        let root = doc.root();

        Fixture::new("scurvy dog").run(&mut doc, root);

        assert_eq!(doc.to_html(), html);
    }

    #[test]
    fn test_skips_script_and_style() {
        let html = "<div><script>var scurvy = 1;</script><STYLE>.scurvy{}</STYLE></div>";
        let mut doc = Document::parse_html(html);
        let root = doc.root();

        Fixture::new("scurvy").run(&mut doc, root);

        assert!(doc.find_elements("span", "highlight").is_empty());
    }

    #[test]
    fn test_skips_rcdata_and_raw_text_elements() {
        let html = concat!(
            "<div><textarea>scurvy</textarea><noscript>scurvy</noscript>",
            "<iframe>scurvy</iframe></div>"
        );
        let mut doc = Document::parse_html(html);
        let root = doc.root();

        Fixture::new("scurvy").run(&mut doc, root);

        assert!(doc.find_elements("span", "highlight").is_empty());
        assert_eq!(doc.to_html(), html);
    }

    #[test]
    fn test_span_hop_wraps_inside_first_parent() {
        let mut doc = Document::parse_html("<p>the <b>scurvy</b> dog ran</p>");
        let root = doc.root();

        Fixture::new("scurvy dog").run(&mut doc, root);

        assert_eq!(
            doc.to_html(),
            concat!(
                r#"<p>the <b><span class="highlight">"#,
                r#"<span class="sub-highlight">scurvy</span>"#,
                r#"<span class="sub-highlight"> dog</span>"#,
                r#"</span></b> ran</p>"#
            )
        );
    }

    #[test]
    fn test_span_stops_at_comment() {
        let html = "<p>the scurvy <!-- x --> dog</p>";
        let mut doc = Document::parse_html(html);
        let root = doc.root();

        Fixture::new("scurvy dog").run(&mut doc, root);

        assert_eq!(doc.to_html(), html);
    }

    #[test]
    fn test_continuation_start_hops_one_level() {
        let mut doc = Document::parse_html("<p>the <b>scurvy</b> dog</p>");
        let p = doc.elements_by_tag("p")[0];
        let b = doc.elements_by_tag("b")[0];
        let inner = doc.child_at(b, 0).unwrap();
        let after = doc.child_at(p, 2).unwrap();
        let fixture = Fixture::new("scurvy dog");

        let walker = Walker::new(
            &fixture.match_pattern,
            fixture.span_pattern.as_ref(),
            &fixture.marker,
            p,
        );
        assert_eq!(walker.continuation_start(&doc, inner), Some(after));

        let bounded = Walker::new(
            &fixture.match_pattern,
            fixture.span_pattern.as_ref(),
            &fixture.marker,
            b,
        );
        assert_eq!(bounded.continuation_start(&doc, inner), None);
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_spanning_match_is_logged() {
        let mut doc = Document::parse_html("<p>the scurvy <em>dog</em></p>");
        let root = doc.root();

        Fixture::new("scurvy dog").run(&mut doc, root);

        assert!(logs_contain("spanning match"));
    }
}
