//! Error taxonomy for content compilation.
//!
//! Every failure while turning a content record into derivation rules falls
//! into one of three categories. None of them is fatal to the system: the
//! dispatcher logs the error with the record identity, skips that record and
//! carries on with the rest of the stream.

use std::fmt;

use thiserror::Error;

use crate::content::ContentKind;

/// Category of a compilation failure, used for logging and reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed token, unterminated quote, wrong arity.
    Structural,
    /// Unknown field, out-of-domain value, undefined attribute reference.
    Semantic,
    /// A generated match pattern that would also match unrelated content.
    Aliasing,
}

impl ErrorCategory {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Structural => "structural",
            Self::Semantic => "semantic",
            Self::Aliasing => "aliasing",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised while parsing or compiling a single content record.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// The raw text could not be tokenized or has the wrong shape
    #[error("Structural parse error: {0}")]
    StructuralParse(String),

    /// The text parsed but its content is invalid for the record kind
    #[error("Semantic validation error: {0}")]
    SemanticValidation(String),

    /// A generated match pattern is broad enough to hit unrelated content
    #[error("Aliasing hazard: {0}")]
    AliasingHazard(String),
}

impl CompileError {
    /// Creates a structural error for malformed input.
    ///
    /// Use this when the text itself cannot be read:
    /// - A token has no `=` separator
    /// - A quote is never closed
    /// - A field carries the wrong number of values
    pub fn structural(msg: impl Into<String>) -> Self {
        Self::StructuralParse(msg.into())
    }

    /// Creates a semantic error for well-formed but invalid content.
    ///
    /// # Example
    /// ```ignore
    /// if !allowed.contains(&name) {
    ///     return Err(CompileError::semantic(format!("unknown field '{}'", name)));
    /// }
    /// ```
    pub fn semantic(msg: impl Into<String>) -> Self {
        Self::SemanticValidation(msg.into())
    }

    /// Creates an aliasing error for over-broad generated patterns.
    pub fn aliasing(msg: impl Into<String>) -> Self {
        Self::AliasingHazard(msg.into())
    }

    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::StructuralParse(_) => ErrorCategory::Structural,
            Self::SemanticValidation(_) => ErrorCategory::Semantic,
            Self::AliasingHazard(_) => ErrorCategory::Aliasing,
        }
    }

    /// Prefixes the message with the name of the field being processed.
    pub fn in_field(self, field: &str) -> Self {
        match self {
            Self::StructuralParse(msg) => Self::StructuralParse(format!("field '{field}': {msg}")),
            Self::SemanticValidation(msg) => {
                Self::SemanticValidation(format!("field '{field}': {msg}"))
            }
            Self::AliasingHazard(msg) => Self::AliasingHazard(format!("field '{field}': {msg}")),
        }
    }
}

/// A [`CompileError`] tagged with the record that produced it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{kind} '{name}': {error}")]
pub struct RecordError {
    pub kind: ContentKind,
    pub name: String,
    #[source]
    pub error: CompileError,
}

impl RecordError {
    pub fn new(kind: ContentKind, name: impl Into<String>, error: CompileError) -> Self {
        Self {
            kind,
            name: name.into(),
            error,
        }
    }

    pub const fn category(&self) -> ErrorCategory {
        self.error.category()
    }
}
