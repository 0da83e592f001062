//! Search-term highlighting for HTML trees.
//!
//! Finds every occurrence of one or more words in the text of a tree and
//! wraps each one in a marker element (`<span class="highlight">` by
//! default) without changing the visible text. A phrase that crosses node
//! boundaries, such as `scurvy <em>dog</em>`, is reconstructed and wrapped
//! as a single region. [`unhighlight`] reverses the operation.
//!
//! ```
//! use hilite_lib::{HighlightOptions, UnhighlightOptions, highlight_html, unhighlight_html};
//!
//! let html = "<p>Bury the scurvy <em>dog</em> at dawn</p>";
//! let marked = highlight_html(html, None, "scurvy dog", &HighlightOptions::default()).unwrap();
//! assert_eq!(marked.count, 1);
//!
//! let cleared = unhighlight_html(&marked.html, None, &UnhighlightOptions::default()).unwrap();
//! assert_eq!(cleared.html, html);
//! ```

pub mod error;
pub mod highlight;
pub mod mutate;
pub mod options;
pub mod pattern;
pub mod tree;
pub mod walk;

pub use error::HiliteError;
pub use highlight::{
    HtmlOutput, SearchTerms, highlight, highlight_html, highlight_with_observer, unhighlight,
    unhighlight_html,
};
pub use options::{HighlightOptions, SpanCase, UnhighlightOptions};
pub use tree::{Document, MutableTree, NodeId, NodeView};
