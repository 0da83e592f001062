//! Error types for the highlight library.

use thiserror::Error;

/// Errors emitted by highlight operations.
///
/// A search that finds nothing is not an error; it simply creates no
/// highlights. These variants cover input the library cannot interpret.
#[derive(Debug, Error)]
pub enum HiliteError {
    /// A search or boundary pattern failed to compile.
    #[error("Invalid search pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// JSON options could not be parsed.
    #[error("Invalid options: {0}")]
    InvalidOptions(#[from] serde_json::Error),

    /// A CSS selector used to pick root nodes was rejected.
    #[error("Invalid CSS selector: {0}")]
    InvalidSelector(String),
}
