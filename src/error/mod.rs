//! Error types for parsing and tree navigation.
//!
//! Every fallible operation in the crate returns [`Error`]. Structural XML
//! problems reported by the tokenizer, or found at its boundary (unclosed
//! elements, text outside the document element, exceeded limits), are
//! carried as a positioned [`ParseError`] so callers can point at the
//! offending byte.
//!
//! Looking up a child that does not exist is a [`Error::MissingMember`];
//! looking up an attribute that does not exist is never an error.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type returned when the XML input is not well-formed.
#[derive(Debug)]
pub struct ParseError {
    /// Human-readable description of the problem.
    pub message: String,
    /// 0-based byte offset into the input where the problem was detected.
    pub position: u64,
    /// The tokenizer error this was raised from, if any.
    pub source: Option<quick_xml::Error>,
}

impl ParseError {
    /// Creates a parse error raised at the given byte offset.
    pub fn new(message: impl Into<String>, position: u64) -> Self {
        Self {
            message: message.into(),
            position,
            source: None,
        }
    }

    /// Wraps an error reported by the tokenizer.
    #[must_use]
    pub fn from_xml(error: quick_xml::Error, position: u64) -> Self {
        Self {
            message: error.to_string(),
            position,
            source: Some(error),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse error at byte {}: {}", self.position, self.message)
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Everything that can go wrong while turning a source into a tree, or
/// while navigating the finished tree.
#[derive(Debug, Error)]
pub enum Error {
    /// The source was empty or blank.
    #[error("parse() takes a filename, URL or XML string")]
    MissingInput,

    /// A feature toggle name the parser does not know.
    #[error("unknown parser feature '{0}'")]
    UnknownFeature(String),

    /// A known feature toggle that cannot take the requested value.
    #[error("parser feature '{feature}' cannot be set to {value}")]
    UnsupportedFeature { feature: &'static str, value: bool },

    /// The document is not well-formed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The document referenced an external entity while external loading
    /// was disabled.
    #[error("forbidden reference to external entity '{name}' ({system_id})")]
    ForbiddenEntity { name: String, system_id: String },

    /// A child lookup found no element with that name.
    #[error("'{parent}' has no child named '{name}'")]
    MissingMember { parent: String, name: String },

    /// Character data or an element end arrived with no open element.
    #[error("tree builder received {event} with no open element")]
    BuilderUnderflow { event: &'static str },

    /// The event stream ended while elements were still open.
    #[error("tree builder finished with {0} unclosed element(s)")]
    UnclosedElements(usize),

    /// A local file could not be opened.
    #[error("cannot open '{}': {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A string that looked like a URL could not be parsed as one.
    #[error("invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// An HTTP(S) request failed.
    #[error("failed to fetch '{url}': {source}")]
    Fetch {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },

    /// Reading from a stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` if this is a [`Error::MissingMember`] fault.
    #[must_use]
    pub fn is_missing_member(&self) -> bool {
        matches!(self, Self::MissingMember { .. })
    }

    /// Returns the underlying [`ParseError`], if this is one.
    #[must_use]
    pub fn as_parse_error(&self) -> Option<&ParseError> {
        match self {
            Self::Parse(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::new("unclosed element <a>", 14);
        assert_eq!(err.to_string(), "parse error at byte 14: unclosed element <a>");
    }

    #[test]
    fn test_parse_error_is_transparent() {
        let err = Error::from(ParseError::new("no element found", 0));
        assert_eq!(err.to_string(), "parse error at byte 0: no element found");
        assert!(err.as_parse_error().is_some());
    }

    #[test]
    fn test_missing_member_display() {
        let err = Error::MissingMember {
            parent: "root".to_string(),
            name: "inexistent".to_string(),
        };
        assert_eq!(err.to_string(), "'root' has no child named 'inexistent'");
        assert!(err.is_missing_member());
    }

    #[test]
    fn test_missing_input_is_not_missing_member() {
        assert!(!Error::MissingInput.is_missing_member());
        assert!(Error::MissingInput.as_parse_error().is_none());
    }

    #[test]
    fn test_error_is_error_trait() {
        let err = Error::UnknownFeature("invalid_feature".to_string());
        let _: &dyn std::error::Error = &err;
        assert_eq!(err.to_string(), "unknown parser feature 'invalid_feature'");
    }
}
