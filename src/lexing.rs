//! Line tokenizer
//!
//! Splits a single physical line of an env file into its variable name, its
//! value and an optional trailing annotation:
//!
//! ```text
//! NAME=value #prompt:Message?|type;constraint:value
//! ^^^^ ^^^^^ ^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^
//! name value annotation
//! ```
//!
//! The tokenizer only knows about variable lines. Comments, blank lines and
//! config lines all tokenize to `None`; callers tell them apart with the
//! classification helpers below and in [`crate::project`].

use crate::error::TokenizeError;
use once_cell::sync::Lazy;
use regex::Regex;

/// Marker that opens an annotation
pub const ANNOTATION_MARKER: &str = "#prompt:";

/// An annotation only counts when separated from the value by a space
const INLINE_ANNOTATION_MARKER: &str = " #prompt:";

/// Valid variable names: an uppercase letter followed by uppercase letters,
/// digits and underscores
static VARIABLE_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][A-Z0-9_]*$").unwrap());

/// The pieces of a variable line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineTokens {
    pub name: String,
    pub value: String,
    /// Raw annotation text starting at `#prompt:`, if present
    pub annotation: Option<String>,
}

/// Tokenize one line.
///
/// Returns `Ok(None)` for blank lines, full-line comments and lines that do
/// not look like assignments. The only hard error is an invalid variable
/// name.
pub fn tokenize_line(line: &str) -> Result<Option<LineTokens>, TokenizeError> {
    let line = line.trim();

    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let Some(eq_idx) = line.find('=') else {
        return Ok(None);
    };

    let name = line[..eq_idx].trim();
    if name.is_empty() {
        return Ok(None);
    }
    if !is_valid_variable_name(name) {
        return Err(TokenizeError::InvalidVariableName(name.to_string()));
    }

    let mut rest = &line[eq_idx + 1..];
    let mut annotation = None;
    if let Some(marker_idx) = rest.find(INLINE_ANNOTATION_MARKER) {
        annotation = Some(rest[marker_idx + 1..].trim().to_string());
        rest = &rest[..marker_idx];
    }

    Ok(Some(LineTokens {
        name: name.to_string(),
        value: parse_value(rest),
        annotation,
    }))
}

/// Check a variable name against `^[A-Z][A-Z0-9_]*$`
pub fn is_valid_variable_name(name: &str) -> bool {
    VARIABLE_NAME_REGEX.is_match(name)
}

/// Trim, then strip one pair of matching surrounding quotes.
fn parse_value(raw: &str) -> String {
    let trimmed = raw.trim();
    let unquoted = unquote(trimmed);
    if unquoted.trim().is_empty() {
        String::new()
    } else {
        unquoted.to_string()
    }
}

fn unquote(s: &str) -> &str {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &s[1..s.len() - 1];
        }
    }
    s
}

/// Full-line comment (config lines included)
pub fn is_comment(line: &str) -> bool {
    line.trim().starts_with('#')
}

pub fn is_empty_line(line: &str) -> bool {
    line.trim().is_empty()
}

/// Whether the line carries an inline `#prompt:` annotation
pub fn is_annotation_line(line: &str) -> bool {
    line.contains(INLINE_ANNOTATION_MARKER)
}

/// Comment text without the leading `#`, trimmed. Empty for non-comments.
pub fn extract_comment_text(line: &str) -> &str {
    line.trim()
        .strip_prefix('#')
        .map(str::trim)
        .unwrap_or_default()
}
