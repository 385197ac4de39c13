//! Error types for the parsing layer
//!
//! Parsing is permissive: none of these errors abort the assembly of a whole
//! document. They surface through the single-line entry points
//! ([`crate::lexing::tokenize_line`], [`crate::annotation::parse_annotation`])
//! and through [`crate::validation::diagnose`].

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Error produced by the line tokenizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    /// The text before `=` is not a valid variable name
    InvalidVariableName(String),
}

impl fmt::Display for TokenizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenizeError::InvalidVariableName(name) => write!(
                f,
                "invalid variable name {:?}: must start with an uppercase letter and contain only uppercase letters, numbers, and underscores",
                name
            ),
        }
    }
}

impl std::error::Error for TokenizeError {}

/// Syntax error in a `#prompt:` annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationError {
    /// Text does not start with `#prompt:`
    MissingPrefix,
    /// No `|` between the message and the type
    MissingTypeSeparator,
    /// Nothing after the `|`
    MissingType,
}

impl fmt::Display for AnnotationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotationError::MissingPrefix => {
                write!(f, "invalid annotation: missing prefix (must start with #prompt:)")
            }
            AnnotationError::MissingTypeSeparator => {
                write!(f, "invalid annotation: missing type separator |")
            }
            AnnotationError::MissingType => write!(f, "invalid annotation: missing type"),
        }
    }
}

impl std::error::Error for AnnotationError {}

/// Error reading a document from disk
#[derive(Debug)]
pub enum DocumentError {
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentError::Io { path, source } => {
                write!(f, "failed to read {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for DocumentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DocumentError::Io { source, .. } => Some(source),
        }
    }
}
