//! Error types for newsitem operations.

use thiserror::Error;

use crate::events::SinkError;

/// Errors that can occur while reading or mutating a news item.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),

    #[error("XML escape error: {0}")]
    XmlEscape(#[from] quick_xml::escape::EscapeError),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Missing required element: {0}")]
    MissingElement(String),

    /// A required field is missing or an argument has the wrong shape.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The referenced identity is absent from the document.
    #[error("Could not find {kind} with {key}")]
    NotFound { kind: &'static str, key: String },

    /// The document holds a shape this crate never produces (e.g. two sections).
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Change subscriber failed: {0}")]
    Subscriber(#[source] SinkError),

    #[error("UTF-8 decoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            key: key.into(),
        }
    }

    /// Check whether this is a [`Error::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_carries_key() {
        let err = Error::not_found("link", "uuid u9");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Could not find link with uuid u9");
    }

    #[test]
    fn test_other_errors_are_not_not_found() {
        assert!(!Error::Validation("x".into()).is_not_found());
        assert!(!Error::InvariantViolation("x".into()).is_not_found());
    }
}
