//! Regex construction for single-node and cross-node matching.
//!
//! Two patterns drive a highlight pass:
//!
//! - the **match pattern**, an alternation of every search word captured in
//!   one group, used against a single text node;
//! - the **span pattern**, a progressive pattern over the combined phrase
//!   whose first word is mandatory and whose remaining pieces are optional,
//!   used to detect a phrase that starts in one node and continues in the
//!   following siblings.
//!
//! ## Examples
//!
//! ```
//! use hilite_lib::pattern::{build_match_pattern, build_span_pattern};
//!
//! let re = build_match_pattern(&["scurvy", "dog"], false, false, r"\b", r"\b")
//!     .unwrap()
//!     .expect("words were given");
//! assert!(re.is_match("Scurvy"));
//!
//! let span = build_span_pattern("scurvy dog", true).unwrap().unwrap();
//! let capture = span.captures("bury the scurvy ").unwrap();
//! assert_eq!(capture.pieces, 2);
//! assert!(!capture.is_complete(&span));
//! ```

use regex::{Regex, RegexBuilder};

use crate::error::HiliteError;

/// Name of the capture group holding the text to highlight.
pub const HIT_GROUP: &str = "hit";

/// Escapes every regex-significant character of a search word.
///
/// The escaped set is `- [ ] { } ( ) * + ? . , \ ^ $ | #` plus ASCII
/// whitespace.
pub fn escape_word(word: &str) -> String {
    let mut escaped = String::with_capacity(word.len() * 2);
    for ch in word.chars() {
        if needs_escape(ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn needs_escape(ch: char) -> bool {
    matches!(
        ch,
        '-' | '['
            | ']'
            | '{'
            | '}'
            | '('
            | ')'
            | '*'
            | '+'
            | '?'
            | '.'
            | ','
            | '\\'
            | '^'
            | '$'
            | '|'
            | '#'
    ) || ch.is_ascii_whitespace()
}

/// Builds the single-node match pattern.
///
/// Empty words are dropped. Whitespace inside a word matches any whitespace
/// run, the same way it does in a [`SpanPattern`]. When nothing remains the result is `Ok(None)`,
/// which callers treat as "nothing to do". The matched text is available
/// through the [`HIT_GROUP`] capture; boundary fragments sit outside it so
/// a consuming boundary such as `\W` never ends up highlighted.
///
/// ## Errors
///
/// Returns [`HiliteError::InvalidPattern`] when a boundary fragment is not a
/// valid regex.
pub fn build_match_pattern<S: AsRef<str>>(
    words: &[S],
    case_sensitive: bool,
    words_only: bool,
    boundary_start: &str,
    boundary_end: &str,
) -> Result<Option<Regex>, HiliteError> {
    let escaped: Vec<String> = words
        .iter()
        .map(AsRef::as_ref)
        .filter(|word| !word.is_empty())
        .map(word_pattern)
        .collect();

    if escaped.is_empty() {
        return Ok(None);
    }

    let mut pattern = format!("(?P<{HIT_GROUP}>{})", escaped.join("|"));
    if words_only {
        pattern = format!("(?:{boundary_start}){pattern}(?:{boundary_end})");
    }

    compile(&pattern, !case_sensitive).map(Some)
}

/// Builds the progressive span pattern for a phrase.
///
/// See [`SpanPattern`]. Returns `Ok(None)` for a blank phrase.
///
/// ## Errors
///
/// Returns [`HiliteError::InvalidPattern`] if the generated pattern exceeds
/// the regex engine's limits (extremely long phrases).
pub fn build_span_pattern(
    phrase: &str,
    case_insensitive: bool,
) -> Result<Option<SpanPattern>, HiliteError> {
    SpanPattern::new(phrase, case_insensitive, None)
}

/// Escapes `word`, turning each whitespace run into `\s+`.
fn word_pattern(word: &str) -> String {
    let mut pattern = String::with_capacity(word.len() * 2);
    let mut in_space = false;
    for ch in word.chars() {
        if ch.is_whitespace() {
            if !in_space {
                pattern.push_str(r"\s+");
            }
            in_space = true;
            continue;
        }
        in_space = false;
        if needs_escape(ch) {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern
}

fn compile(pattern: &str, case_insensitive: bool) -> Result<Regex, HiliteError> {
    RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|source| HiliteError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
}

/// Word boundary fragments applied to span patterns in whole-word mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordBoundaries {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PieceKind {
    Word,
    /// Whitespace between two words; matches any whitespace run.
    Space,
    /// A hyphen or underscore inside a word.
    Joiner,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Piece {
    kind: PieceKind,
    text: String,
}

impl Piece {
    fn new(kind: PieceKind, text: &str) -> Self {
        Self {
            kind,
            text: text.to_string(),
        }
    }

    fn pattern(&self) -> String {
        match self.kind {
            PieceKind::Word | PieceKind::Joiner => escape_word(&self.text),
            PieceKind::Space => r"\s+".to_string(),
        }
    }
}

/// Splits a phrase into the pieces a span pattern is built from.
///
/// The first word stays whole. Later words are preceded by the whitespace
/// that separated them in the phrase and are cut at hyphens and underscores.
fn phrase_pieces(phrase: &str) -> Vec<Piece> {
    let mut pieces = Vec::new();
    let mut rest = phrase.trim();
    let mut first = true;

    while !rest.is_empty() {
        let word_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let (word, after) = rest.split_at(word_end);

        if first {
            pieces.push(Piece::new(PieceKind::Word, word));
            first = false;
        } else {
            push_word_parts(&mut pieces, word);
        }

        let gap_end = after
            .find(|c: char| !c.is_whitespace())
            .unwrap_or(after.len());
        let (gap, next) = after.split_at(gap_end);
        if !next.is_empty() {
            pieces.push(Piece::new(PieceKind::Space, gap));
        }
        rest = next;
    }

    pieces
}

fn push_word_parts(pieces: &mut Vec<Piece>, word: &str) {
    let mut start = 0;
    for (index, ch) in word.char_indices() {
        if ch == '-' || ch == '_' {
            if start < index {
                pieces.push(Piece::new(PieceKind::Word, &word[start..index]));
            }
            let end = index + ch.len_utf8();
            pieces.push(Piece::new(PieceKind::Joiner, &word[index..end]));
            start = end;
        }
    }
    if start < word.len() {
        pieces.push(Piece::new(PieceKind::Word, &word[start..]));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor {
    /// The match must end where the tested text ends.
    End,
    /// The match must begin where the tested text begins.
    Start,
}

/// Progressive pattern over the pieces of a phrase.
///
/// The first piece is a mandatory capture and every following piece an
/// optional one, nested so that a match always covers a prefix of the
/// phrase. The initial pattern is anchored at the end of the tested text
/// (the phrase has to run off the end of the node it starts in); patterns
/// produced by [`continuation`](Self::continuation) are anchored at the
/// start (the phrase has to pick up where the previous node stopped).
#[derive(Debug, Clone)]
pub struct SpanPattern {
    pieces: Vec<Piece>,
    regex: Regex,
    groups: Vec<usize>,
    case_insensitive: bool,
    boundaries: Option<WordBoundaries>,
    end_check: Option<Regex>,
}

/// The part of a text matched by a [`SpanPattern`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanCapture {
    /// Byte offset where the first piece starts.
    pub start: usize,
    /// Byte offset where the last matched piece ends.
    pub end: usize,
    /// Number of phrase pieces matched.
    pub pieces: usize,
}

impl SpanCapture {
    /// Whether the capture consumed every piece of `pattern`.
    pub fn is_complete(&self, pattern: &SpanPattern) -> bool {
        self.pieces >= pattern.len()
    }
}

impl SpanPattern {
    /// Builds the initial (end-anchored) pattern for `phrase`.
    ///
    /// With `boundaries`, the start fragment precedes the first piece and the
    /// end fragment follows the final one.
    ///
    /// ## Errors
    ///
    /// Returns [`HiliteError::InvalidPattern`] when the pattern cannot be
    /// compiled.
    pub fn new(
        phrase: &str,
        case_insensitive: bool,
        boundaries: Option<WordBoundaries>,
    ) -> Result<Option<Self>, HiliteError> {
        let pieces = phrase_pieces(phrase);
        if pieces.is_empty() {
            return Ok(None);
        }
        Self::from_pieces(pieces, Anchor::End, case_insensitive, boundaries).map(Some)
    }

    fn from_pieces(
        pieces: Vec<Piece>,
        anchor: Anchor,
        case_insensitive: bool,
        boundaries: Option<WordBoundaries>,
    ) -> Result<Self, HiliteError> {
        let last = pieces.len() - 1;
        let end_boundary = boundaries
            .as_ref()
            .map(|b| format!("(?:{})", b.end))
            .unwrap_or_default();

        let mut body = String::new();
        for (index, piece) in pieces.iter().enumerate().rev() {
            let end = if index == last { end_boundary.as_str() } else { "" };
            let group = format!("(?P<p{index}>{}){end}{body}", piece.pattern());
            body = if index == 0 {
                group
            } else {
                format!("(?:{group})?")
            };
        }

        let pattern = match (anchor, boundaries.as_ref()) {
            (Anchor::End, Some(b)) => format!("(?:{}){body}$", b.start),
            (Anchor::End, None) => format!("{body}$"),
            (Anchor::Start, _) => format!("^{body}"),
        };
        let regex = compile(&pattern, case_insensitive)?;
        let end_check = boundaries
            .as_ref()
            .map(|b| compile(&format!("(?:{})", b.end), case_insensitive))
            .transpose()?;

        let groups = (0..pieces.len())
            .map(|index| {
                let name = format!("p{index}");
                regex
                    .capture_names()
                    .position(|n| n == Some(name.as_str()))
                    .unwrap_or(0)
            })
            .collect();

        Ok(Self {
            pieces,
            regex,
            groups,
            case_insensitive,
            boundaries,
            end_check,
        })
    }

    /// Number of pieces in the pattern.
    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    /// Always `false`; a span pattern holds at least one piece.
    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// Phrase text covered by the pieces from `consumed` onwards.
    pub fn remaining_text(&self, consumed: usize) -> String {
        self.pieces
            .iter()
            .skip(consumed)
            .map(|p| p.text.as_str())
            .collect()
    }

    /// Matches the pattern against `text`.
    pub fn captures(&self, text: &str) -> Option<SpanCapture> {
        let caps = self.regex.captures(text)?;
        let first = caps.get(self.groups[0])?;

        let mut capture = SpanCapture {
            start: first.start(),
            end: first.end(),
            pieces: 1,
        };
        for &group in &self.groups[1..] {
            match caps.get(group) {
                Some(m) => {
                    capture.end = m.end();
                    capture.pieces += 1;
                }
                None => break,
            }
        }
        Some(capture)
    }

    /// Whether the end boundary holds where `before` meets `after`.
    ///
    /// Used when a match ends exactly where its node ends, so the pattern
    /// itself only saw the end of the text. Always `true` without
    /// boundaries.
    pub fn ends_on_boundary(&self, before: &str, after: &str) -> bool {
        let Some(check) = &self.end_check else {
            return true;
        };
        let joined = format!("{before}{after}");
        check
            .find_at(&joined, before.len())
            .is_some_and(|m| m.start() == before.len())
    }

    /// Builds a fresh start-anchored pattern for the pieces after the first
    /// `consumed` ones. Returns `Ok(None)` once nothing is left.
    ///
    /// ## Errors
    ///
    /// Returns [`HiliteError::InvalidPattern`] when the pattern cannot be
    /// compiled.
    pub fn continuation(&self, consumed: usize) -> Result<Option<Self>, HiliteError> {
        if consumed >= self.pieces.len() {
            return Ok(None);
        }
        Self::from_pieces(
            self.pieces[consumed..].to_vec(),
            Anchor::Start,
            self.case_insensitive,
            self.boundaries.clone(),
        )
        .map(Some)
    }
}
