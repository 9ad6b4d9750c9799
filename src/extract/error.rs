//! Error types for shape-directed decoding.

use thiserror::Error;

/// Errors produced while decoding untyped JSON against a [`Shape`](super::Shape).
///
/// Every variant carries the dotted path of the offending value (`$` is the
/// root) so a failure deep inside a page payload can be located from the log.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// A value exists but is not of (or convertible to) the expected kind.
    #[error("expected {expected} at {path}, found {found}")]
    TypeMismatch {
        /// Path of the value.
        path: String,
        /// What the shape asked for.
        expected: &'static str,
        /// What the input actually held.
        found: &'static str,
    },

    /// A required record field is absent.
    #[error("missing required field {path}")]
    MissingField {
        /// Path of the missing field.
        path: String,
    },

    /// No alternative of a union matched the value.
    #[error("no alternative of {tried} matched at {path}")]
    NoAlternative {
        /// Path of the value.
        path: String,
        /// Number of alternatives tried.
        tried: usize,
    },

    /// The raw block was not valid JSON.
    #[error("invalid JSON in embedded data block: {reason}")]
    InvalidJson {
        /// Parser message.
        reason: String,
    },
}

impl ExtractError {
    /// Creates a type mismatch error.
    pub fn mismatch(path: impl Into<String>, expected: &'static str, found: &'static str) -> Self {
        Self::TypeMismatch {
            path: path.into(),
            expected,
            found,
        }
    }

    /// Creates a missing field error.
    pub fn missing(path: impl Into<String>) -> Self {
        Self::MissingField { path: path.into() }
    }

    /// Returns the path the error refers to, if any.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::TypeMismatch { path, .. }
            | Self::MissingField { path }
            | Self::NoAlternative { path, .. } => Some(path),
            Self::InvalidJson { .. } => None,
        }
    }
}

impl From<serde_json::Error> for ExtractError {
    fn from(error: serde_json::Error) -> Self {
        Self::InvalidJson {
            reason: error.to_string(),
        }
    }
}
