//! Public highlight and unhighlight operations.

use serde::Serialize;
use tracing::{debug, instrument};

use crate::error::HiliteError;
use crate::mutate::{Marker, Observer};
use crate::options::{HighlightOptions, SUB_HIGHLIGHT_CLASS, UnhighlightOptions};
use crate::pattern::{SpanPattern, WordBoundaries, build_match_pattern};
use crate::tree::html;
use crate::tree::{MutableTree, NodeId};
use crate::walk::Walker;

/// The words to search for.
///
/// Empty words are dropped on construction. Order is preserved; the
/// remaining words joined with single spaces form the phrase used for
/// matches that cross node boundaries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchTerms(Vec<String>);

impl SearchTerms {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            words
                .into_iter()
                .map(Into::into)
                .filter(|word: &String| !word.is_empty())
                .collect(),
        )
    }

    pub fn words(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The words joined with single spaces.
    pub fn combined(&self) -> String {
        self.0.join(" ")
    }
}

impl From<&str> for SearchTerms {
    fn from(word: &str) -> Self {
        Self::new([word])
    }
}

impl From<String> for SearchTerms {
    fn from(word: String) -> Self {
        Self::new([word])
    }
}

impl From<Vec<String>> for SearchTerms {
    fn from(words: Vec<String>) -> Self {
        Self::new(words)
    }
}

impl From<Vec<&str>> for SearchTerms {
    fn from(words: Vec<&str>) -> Self {
        Self::new(words)
    }
}

impl From<&[&str]> for SearchTerms {
    fn from(words: &[&str]) -> Self {
        Self::new(words.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for SearchTerms {
    fn from(words: [&str; N]) -> Self {
        Self::new(words)
    }
}

/// Result of an HTML-to-HTML operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HtmlOutput {
    pub html: String,
    /// Highlights created, or removed for [`unhighlight_html`].
    pub count: usize,
}

/// Highlights every occurrence of `terms` below each of `roots`.
///
/// Returns the number of Highlight Elements created. When no non-empty word
/// remains the tree is left alone and `Ok(0)` is returned.
///
/// ## Errors
///
/// Returns [`HiliteError::InvalidPattern`] when a boundary fragment in
/// `options` is not a valid regex.
///
/// ## Examples
///
/// ```
/// use hilite_lib::{HighlightOptions, MutableTree, highlight, tree::Document};
///
/// let mut doc = Document::parse_html("<p>Bury the scurvy <em>dog</em> at dawn</p>");
/// let root = doc.root();
///
/// let count = highlight(&mut doc, &[root], "scurvy dog", &HighlightOptions::default()).unwrap();
/// assert_eq!(count, 1);
/// assert_eq!(doc.text_content(root), "Bury the scurvy dog at dawn");
/// ```
pub fn highlight<T: MutableTree>(
    tree: &mut T,
    roots: &[NodeId],
    terms: impl Into<SearchTerms>,
    options: &HighlightOptions,
) -> Result<usize, HiliteError> {
    run_highlight(tree, roots, &terms.into(), options, None)
}

/// Like [`highlight`], calling `observer` with each completed Highlight
/// Element in creation order.
///
/// ## Errors
///
/// See [`highlight`].
pub fn highlight_with_observer<T, F>(
    tree: &mut T,
    roots: &[NodeId],
    terms: impl Into<SearchTerms>,
    options: &HighlightOptions,
    mut observer: F,
) -> Result<usize, HiliteError>
where
    T: MutableTree,
    F: FnMut(&T, NodeId),
{
    run_highlight(tree, roots, &terms.into(), options, Some(&mut observer))
}

#[instrument(skip_all, fields(roots = roots.len(), words = terms.words().len(), class = %options.class_name))]
fn run_highlight<T: MutableTree>(
    tree: &mut T,
    roots: &[NodeId],
    terms: &SearchTerms,
    options: &HighlightOptions,
    mut observer: Option<&mut Observer<'_, T>>,
) -> Result<usize, HiliteError> {
    let Some(match_pattern) = build_match_pattern(
        terms.words(),
        options.case_sensitive,
        options.words_only,
        options.boundary_start(),
        options.boundary_end(),
    )?
    else {
        debug!("no search words, nothing to highlight");
        return Ok(0);
    };

    let boundaries = options.words_only.then(|| WordBoundaries {
        start: options.boundary_start().to_string(),
        end: options.boundary_end().to_string(),
    });
    let span_pattern = SpanPattern::new(
        &terms.combined(),
        options.span_case_insensitive(),
        boundaries,
    )?;
    let marker = Marker::new(&options.element, &options.class_name);

    let mut count = 0;
    let mut counting = |tree: &T, highlight: NodeId| {
        count += 1;
        if let Some(observer) = observer.as_deref_mut() {
            observer(tree, highlight);
        }
    };

    for &root in roots {
        let walker = Walker::new(&match_pattern, span_pattern.as_ref(), &marker, root);
        walker.walk(tree, root, Some(&mut counting))?;
    }

    debug!(count, "highlight pass complete");
    Ok(count)
}

/// Unwraps every Highlight Element below `roots` matching `options`.
///
/// Each wrapper is replaced by its children, `sub-highlight` wrappers
/// inside it are unwrapped too, and the affected parents are normalized.
/// Returns the number of Highlight Elements removed.
#[instrument(skip_all, fields(roots = roots.len(), class = %options.class_name))]
pub fn unhighlight<T: MutableTree>(
    tree: &mut T,
    roots: &[NodeId],
    options: &UnhighlightOptions,
) -> usize {
    let marker = Marker::new(&options.element, &options.class_name);
    let sub_marker = Marker::new(&options.element, SUB_HIGHLIGHT_CLASS);

    let mut parents = Vec::new();
    let mut removed = 0;
    for &root in roots {
        let targets: Vec<NodeId> = tree
            .descendants(root)
            .into_iter()
            .filter(|&id| marker.selects(&tree.view(id)))
            .collect();

        for target in targets {
            // already unwrapped through an overlapping root
            let Some(parent) = tree.parent(target) else {
                continue;
            };
            for child in tree.children(target) {
                if sub_marker.selects(&tree.view(child)) {
                    unwrap(tree, target, child);
                }
            }
            unwrap(tree, parent, target);
            parents.push(parent);
            removed += 1;
        }
    }

    parents.sort();
    parents.dedup();
    for parent in parents {
        tree.normalize(parent);
    }

    debug!(removed, "unhighlight pass complete");
    removed
}

/// Replaces `node` with its children.
fn unwrap<T: MutableTree>(tree: &mut T, parent: NodeId, node: NodeId) {
    for child in tree.children(node) {
        tree.insert_before(parent, child, node);
    }
    tree.remove_child(parent, node);
}

/// Parses `html`, highlights the roots picked by `selector` (the whole
/// document without one) and serializes the result.
///
/// ## Errors
///
/// Returns [`HiliteError::InvalidSelector`] for a rejected selector and
/// [`HiliteError::InvalidPattern`] for an invalid boundary.
pub fn highlight_html(
    html: &str,
    selector: Option<&str>,
    terms: impl Into<SearchTerms>,
    options: &HighlightOptions,
) -> Result<HtmlOutput, HiliteError> {
    let html::ParsedHtml {
        mut document,
        roots,
    } = html::parse(html, selector)?;
    let count = highlight(&mut document, &roots, terms, options)?;
    Ok(HtmlOutput {
        html: document.to_html(),
        count,
    })
}

/// Parses `html`, removes highlights below the selected roots and
/// serializes the result.
///
/// ## Errors
///
/// Returns [`HiliteError::InvalidSelector`] for a rejected selector.
pub fn unhighlight_html(
    html: &str,
    selector: Option<&str>,
    options: &UnhighlightOptions,
) -> Result<HtmlOutput, HiliteError> {
    let html::ParsedHtml {
        mut document,
        roots,
    } = html::parse(html, selector)?;
    let count = unhighlight(&mut document, &roots, options);
    Ok(HtmlOutput {
        html: document.to_html(),
        count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::SpanCase;
    use crate::tree::Document;

    fn count(html: &str, terms: impl Into<SearchTerms>, options: &HighlightOptions) -> usize {
        highlight_html(html, None, terms, options).unwrap().count
    }

    #[test]
    fn test_search_terms_drop_empty_words() {
        let terms = SearchTerms::from(["scurvy", "", "dog"]);
        assert_eq!(terms.words(), ["scurvy", "dog"]);
        assert_eq!(terms.combined(), "scurvy dog");

        assert!(SearchTerms::from("").is_empty());
        assert!(SearchTerms::from(vec![String::new()]).is_empty());
    }

    #[test]
    fn test_empty_terms_are_a_no_op() {
        let html = "<p>scurvy</p>";
        let output = highlight_html(html, None, "", &HighlightOptions::default()).unwrap();
        assert_eq!(output.count, 0);
        assert_eq!(output.html, html);
    }

    #[test]
    fn test_highlight_html() {
        let output = highlight_html(
            "<p>the scurvy dog</p>",
            None,
            "scurvy",
            &HighlightOptions::default(),
        )
        .unwrap();

        assert_eq!(output.count, 1);
        assert_eq!(
            output.html,
            r#"<p>the <span class="highlight">scurvy</span> dog</p>"#
        );
    }

    #[test]
    fn test_highlight_html_with_selector() {
        let output = highlight_html(
            r#"<p class="log">scurvy</p><p>scurvy</p>"#,
            Some("p.log"),
            "scurvy",
            &HighlightOptions::default(),
        )
        .unwrap();

        assert_eq!(output.count, 1);
        assert!(output.html.ends_with("<p>scurvy</p>"));
    }

    #[test]
    fn test_invalid_boundary_is_reported() {
        let options = HighlightOptions {
            words_only: true,
            words_boundary: "(".to_string(),
            ..Default::default()
        };
        let result = highlight_html("<p>x</p>", None, "x", &options);
        assert!(matches!(result, Err(HiliteError::InvalidPattern { .. })));
    }

    #[test]
    fn test_words_only_custom_boundaries() {
        let options = HighlightOptions {
            words_only: true,
            words_boundary_start: Some(r"(?:^|\s)".to_string()),
            words_boundary_end: Some(r"(?:\s|$)".to_string()),
            ..Default::default()
        };
        assert_eq!(count("<p>I write C# daily</p>", "C#", &options), 1);
        assert_eq!(count("<p>I write C#, daily</p>", "C#", &options), 0);
    }

    #[test]
    fn test_custom_element_and_class() {
        let options = HighlightOptions {
            class_name: "important".to_string(),
            element: "em".to_string(),
            ..Default::default()
        };
        let output = highlight_html("<p>the scurvy dog</p>", None, "scurvy", &options).unwrap();
        assert!(output.html.contains(r#"<em class="important">scurvy</em>"#));
    }

    #[test]
    fn test_span_case_follows_case_sensitive() {
        let html = "<p>the scurvy <em>Dog</em></p>";
        let legacy = HighlightOptions {
            case_sensitive: true,
            ..Default::default()
        };
        assert_eq!(count(html, "Scurvy Dog", &legacy), 1);

        let strict = HighlightOptions {
            span_case: SpanCase::FollowCaseSensitive,
            ..legacy
        };
        assert_eq!(count(html, "Scurvy Dog", &strict), 0);
    }

    #[test]
    fn test_observer_called_per_highlight_in_order() {
        let mut doc = Document::parse_html("<p>dog and <b>scurvy</b> dog</p>");
        let root = doc.root();
        let mut seen = Vec::new();

        let created = highlight_with_observer(
            &mut doc,
            &[root],
            ["dog", "scurvy"],
            &HighlightOptions::default(),
            |tree: &Document, id| seen.push(tree.text_content(id)),
        )
        .unwrap();

        assert_eq!(created, 3);
        assert_eq!(seen, vec!["dog", "scurvy", "dog"]);
    }

    #[test]
    fn test_unhighlight_restores_markup() {
        let original = "<p>Bury the scurvy <em>dog</em> at dawn</p>";
        let marked = highlight_html(original, None, "scurvy dog", &HighlightOptions::default())
            .unwrap();
        assert_eq!(marked.count, 1);

        let cleared = unhighlight_html(&marked.html, None, &UnhighlightOptions::default()).unwrap();
        assert_eq!(cleared.count, 1);
        assert_eq!(cleared.html, original);
    }

    #[test]
    fn test_unhighlight_only_touches_matching_class() {
        let html = r#"<p>a <span class="other">b</span> <span class="highlight">c</span></p>"#;
        let cleared = unhighlight_html(html, None, &UnhighlightOptions::default()).unwrap();
        assert_eq!(cleared.count, 1);
        assert_eq!(
            cleared.html,
            r#"<p>a <span class="other">b</span> c</p>"#
        );
    }

    #[test]
    fn test_unhighlight_matches_class_lists() {
        let html = r#"<p>a <span class="extra highlight">b</span> c</p>"#;
        let cleared = unhighlight_html(html, None, &UnhighlightOptions::default()).unwrap();
        assert_eq!(cleared.count, 1);
        assert_eq!(cleared.html, "<p>a b c</p>");
    }

    #[test]
    fn test_unhighlight_keeps_all_children() {
        let html = r#"<p><span class="highlight">a<b>b</b>c</span></p>"#;
        let cleared = unhighlight_html(html, None, &UnhighlightOptions::default()).unwrap();
        assert_eq!(cleared.html, "<p>a<b>b</b>c</p>");
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_highlight_logs_summary() {
        count("<p>scurvy</p>", "scurvy", &HighlightOptions::default());
        assert!(logs_contain("highlight pass complete"));
    }
}
