//! Options accepted by [`highlight`](crate::highlight()) and
//! [`unhighlight`](crate::unhighlight()).
//!
//! Field names serialize in camelCase, so option blobs such as
//! `{"wordsOnly": true, "className": "important"}` load unchanged.

use serde::{Deserialize, Serialize};

use crate::error::HiliteError;

/// Default class applied to highlight elements.
pub const DEFAULT_CLASS_NAME: &str = "highlight";

/// Default tag name of highlight elements.
pub const DEFAULT_ELEMENT: &str = "span";

/// Default boundary fragment used on both sides when `words_only` is set.
pub const DEFAULT_WORDS_BOUNDARY: &str = r"\b";

/// Class used for the intermediate wrappers of a spanning match.
pub const SUB_HIGHLIGHT_CLASS: &str = "sub-highlight";

/// How the spanning (cross-node) pattern treats letter case.
///
/// `Insensitive` ignores case in spanning matches even when the caller
/// asked for case-sensitive matching. `FollowCaseSensitive` applies the
/// caller's `case_sensitive` flag to spanning matches as well.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpanCase {
    #[default]
    Insensitive,
    FollowCaseSensitive,
}

/// Options for a highlight pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HighlightOptions {
    /// Class name given to each highlight element.
    pub class_name: String,
    /// Tag name of each highlight element.
    pub element: String,
    /// Match letter case exactly.
    pub case_sensitive: bool,
    /// Only match whole words, as decided by the boundary fragments.
    pub words_only: bool,
    /// Boundary fragment used on both sides unless overridden.
    pub words_boundary: String,
    /// Overrides `words_boundary` before the match.
    pub words_boundary_start: Option<String>,
    /// Overrides `words_boundary` after the match.
    pub words_boundary_end: Option<String>,
    /// Case handling of cross-node matches.
    pub span_case: SpanCase,
}

impl Default for HighlightOptions {
    fn default() -> Self {
        Self {
            class_name: DEFAULT_CLASS_NAME.to_string(),
            element: DEFAULT_ELEMENT.to_string(),
            case_sensitive: false,
            words_only: false,
            words_boundary: DEFAULT_WORDS_BOUNDARY.to_string(),
            words_boundary_start: None,
            words_boundary_end: None,
            span_case: SpanCase::default(),
        }
    }
}

impl HighlightOptions {
    /// Parses options from a JSON object. Missing keys keep their defaults.
    ///
    /// ## Errors
    ///
    /// Returns [`HiliteError::InvalidOptions`] for malformed JSON or values
    /// of the wrong type.
    pub fn from_json(json: &str) -> Result<Self, HiliteError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Boundary fragment placed before the match.
    ///
    /// An empty override falls back to `words_boundary`.
    pub fn boundary_start(&self) -> &str {
        non_empty(self.words_boundary_start.as_deref()).unwrap_or(self.words_boundary.as_str())
    }

    /// Boundary fragment placed after the match.
    pub fn boundary_end(&self) -> &str {
        non_empty(self.words_boundary_end.as_deref()).unwrap_or(self.words_boundary.as_str())
    }

    /// Whether the spanning pattern should ignore letter case.
    pub fn span_case_insensitive(&self) -> bool {
        match self.span_case {
            SpanCase::Insensitive => true,
            SpanCase::FollowCaseSensitive => !self.case_sensitive,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Options for removing highlights.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UnhighlightOptions {
    pub class_name: String,
    pub element: String,
}

impl Default for UnhighlightOptions {
    fn default() -> Self {
        Self {
            class_name: DEFAULT_CLASS_NAME.to_string(),
            element: DEFAULT_ELEMENT.to_string(),
        }
    }
}

impl UnhighlightOptions {
    /// Parses options from a JSON object. Missing keys keep their defaults.
    ///
    /// ## Errors
    ///
    /// Returns [`HiliteError::InvalidOptions`] for malformed JSON.
    pub fn from_json(json: &str) -> Result<Self, HiliteError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl From<&HighlightOptions> for UnhighlightOptions {
    fn from(options: &HighlightOptions) -> Self {
        Self {
            class_name: options.class_name.clone(),
            element: options.element.clone(),
        }
    }
}
