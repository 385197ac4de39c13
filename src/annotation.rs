//! Annotation parser
//!
//! An annotation trails a variable line and describes how the variable is
//! prompted for and validated.
//!
//! Syntax:
//!
//! ```text
//! annotation  = "#prompt:" message "|" type { ";" modifier } ;
//! message     = { any-char - "|" } ;
//! type        = "string" | "int" | "numeric" | "boolean" | "enum" | "object" ;
//! modifier    = "optional" | "secret" | constraint ;
//! constraint  = name ":" value ;
//! name        = "min"|"max"|"minlen"|"maxlen"|"pattern"|"options"|"format"|"encoding" ;
//! value       = { any-char - ";" } ;
//! ```
//!
//! Examples:
//! - `#prompt:Database port?|int;min:1;max:65535`
//! - `#prompt:Environment?|enum;options:dev,staging,prod`
//! - `#prompt:API key?|string;minlen:32;secret`
//!
//! The parser is lenient about content: unknown types fall back to `string`,
//! unknown modifiers and constraints are dropped. Only a missing prefix,
//! separator or type is an error.

use crate::error::AnnotationError;
use crate::lexing::ANNOTATION_MARKER;
use std::fmt;
use tracing::warn;

/// The type of a variable value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VariableType {
    #[default]
    String,
    Int,
    Numeric,
    Boolean,
    Enum,
    Object,
}

impl VariableType {
    /// Map a type token. Unknown tokens fall back to [`VariableType::String`].
    pub fn from_token(token: &str) -> Self {
        match token {
            "string" => VariableType::String,
            "int" => VariableType::Int,
            "numeric" => VariableType::Numeric,
            "boolean" => VariableType::Boolean,
            "enum" => VariableType::Enum,
            "object" => VariableType::Object,
            _ => VariableType::String,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VariableType::String => "string",
            VariableType::Int => "int",
            VariableType::Numeric => "numeric",
            VariableType::Boolean => "boolean",
            VariableType::Enum => "enum",
            VariableType::Object => "object",
        }
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The closed set of constraint names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintKind {
    Min,
    Max,
    MinLen,
    MaxLen,
    Pattern,
    Options,
    Format,
    Encoding,
}

impl ConstraintKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "min" => Some(ConstraintKind::Min),
            "max" => Some(ConstraintKind::Max),
            "minlen" => Some(ConstraintKind::MinLen),
            "maxlen" => Some(ConstraintKind::MaxLen),
            "pattern" => Some(ConstraintKind::Pattern),
            "options" => Some(ConstraintKind::Options),
            "format" => Some(ConstraintKind::Format),
            "encoding" => Some(ConstraintKind::Encoding),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConstraintKind::Min => "min",
            ConstraintKind::Max => "max",
            ConstraintKind::MinLen => "minlen",
            ConstraintKind::MaxLen => "maxlen",
            ConstraintKind::Pattern => "pattern",
            ConstraintKind::Options => "options",
            ConstraintKind::Format => "format",
            ConstraintKind::Encoding => "encoding",
        }
    }

    /// Whether the validator reads this constraint for `var_type`.
    pub fn applies_to(&self, var_type: VariableType) -> bool {
        match self {
            ConstraintKind::Min | ConstraintKind::Max => {
                matches!(var_type, VariableType::Int | VariableType::Numeric)
            }
            ConstraintKind::MinLen
            | ConstraintKind::MaxLen
            | ConstraintKind::Pattern
            | ConstraintKind::Encoding => var_type == VariableType::String,
            ConstraintKind::Options => var_type == VariableType::Enum,
            ConstraintKind::Format => var_type == VariableType::Object,
        }
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validation rule attached to an annotation. The value stays raw and is
/// interpreted by the validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub kind: ConstraintKind,
    pub value: String,
}

impl Constraint {
    pub fn new(kind: ConstraintKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

/// Metadata parsed from a `#prompt:` annotation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Annotation {
    /// The question shown to the user
    pub prompt_text: String,
    pub var_type: VariableType,
    /// In encounter order; duplicates are kept
    pub constraints: Vec<Constraint>,
    pub is_optional: bool,
    /// Input and output should be hidden
    pub is_secret: bool,
}

impl Annotation {
    /// Value of the first constraint of the given kind.
    pub fn constraint(&self, kind: ConstraintKind) -> Option<&str> {
        self.constraints
            .iter()
            .find(|c| c.kind == kind)
            .map(|c| c.value.as_str())
    }

    /// Lookup by textual name. Unknown names never match since they are
    /// never stored.
    pub fn constraint_named(&self, name: &str) -> Option<&str> {
        ConstraintKind::from_name(name).and_then(|kind| self.constraint(kind))
    }

    pub fn has_constraint(&self, kind: ConstraintKind) -> bool {
        self.constraints.iter().any(|c| c.kind == kind)
    }

    /// First non-empty constraint value of the given kind, as used by the
    /// validator where an empty value means "not set".
    pub(crate) fn constraint_value(&self, kind: ConstraintKind) -> Option<&str> {
        self.constraint(kind).filter(|v| !v.is_empty())
    }

    /// The enum options, split on `,` and trimmed.
    pub fn options(&self) -> Vec<&str> {
        match self.constraint_value(ConstraintKind::Options) {
            Some(options) => options.split(',').map(str::trim).collect(),
            None => Vec::new(),
        }
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}|{}", ANNOTATION_MARKER, self.prompt_text, self.var_type)?;
        for constraint in &self.constraints {
            write!(f, ";{}", constraint)?;
        }
        if self.is_optional {
            f.write_str(";optional")?;
        }
        if self.is_secret {
            f.write_str(";secret")?;
        }
        Ok(())
    }
}

/// Parse annotation text starting at `#prompt:`.
pub fn parse_annotation(text: &str) -> Result<Annotation, AnnotationError> {
    let content = text
        .trim()
        .strip_prefix(ANNOTATION_MARKER)
        .ok_or(AnnotationError::MissingPrefix)?;

    let (message, rest) = content
        .split_once('|')
        .ok_or(AnnotationError::MissingTypeSeparator)?;

    let mut parts = rest.split(';');
    let type_token = match parts.next() {
        Some(token) if !token.is_empty() => token.trim(),
        _ => return Err(AnnotationError::MissingType),
    };

    let mut annotation = Annotation {
        prompt_text: message.trim().to_string(),
        var_type: VariableType::from_token(type_token),
        ..Annotation::default()
    };

    for part in parts.map(str::trim).filter(|p| !p.is_empty()) {
        match part {
            "optional" => annotation.is_optional = true,
            "secret" => annotation.is_secret = true,
            _ => {
                // Bare modifiers without a colon are ignored
                let Some((name, value)) = part.split_once(':') else {
                    continue;
                };
                let name = name.trim();
                match ConstraintKind::from_name(name) {
                    Some(kind) => annotation
                        .constraints
                        .push(Constraint::new(kind, value.trim())),
                    None => warn!(constraint = name, "discarding unknown constraint"),
                }
            }
        }
    }

    if annotation.var_type == VariableType::Enum
        && annotation.constraint_value(ConstraintKind::Options).is_none()
    {
        annotation.var_type = VariableType::String;
    }

    Ok(annotation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        let ann = parse_annotation("#prompt:Database host?|string").unwrap();
        assert_eq!(ann.prompt_text, "Database host?");
        assert_eq!(ann.var_type, VariableType::String);
        assert!(ann.constraints.is_empty());
        assert!(!ann.is_optional);
        assert!(!ann.is_secret);
    }

    #[test]
    fn test_parse_constraints_and_modifiers() {
        let ann = parse_annotation("#prompt: Port? | int ; min: 1 ;max:65535;optional;secret ")
            .unwrap();
        assert_eq!(ann.prompt_text, "Port?");
        assert_eq!(ann.var_type, VariableType::Int);
        assert_eq!(
            ann.constraints,
            vec![
                Constraint::new(ConstraintKind::Min, "1"),
                Constraint::new(ConstraintKind::Max, "65535"),
            ]
        );
        assert!(ann.is_optional);
        assert!(ann.is_secret);
    }

    #[test]
    fn test_unknown_type_falls_back_to_string() {
        let ann = parse_annotation("#prompt:X|uuid").unwrap();
        assert_eq!(ann.var_type, VariableType::String);
    }

    #[test]
    fn test_unknown_constraint_is_discarded() {
        let ann = parse_annotation("#prompt:X?|string;bogus:1;minlen:2").unwrap();
        assert_eq!(ann.constraint_named("bogus"), None);
        assert_eq!(ann.constraint_named("minlen"), Some("2"));
        assert_eq!(ann.constraints.len(), 1);
    }

    #[test]
    fn test_bare_unknown_modifier_is_ignored() {
        let ann = parse_annotation("#prompt:X|string;required;;minlen:1").unwrap();
        assert_eq!(ann.constraints, vec![Constraint::new(ConstraintKind::MinLen, "1")]);
        assert!(!ann.is_optional);
    }

    #[test]
    fn test_duplicate_constraints_first_wins() {
        let ann = parse_annotation("#prompt:X|int;min:1;min:5").unwrap();
        assert_eq!(ann.constraints.len(), 2);
        assert_eq!(ann.constraint(ConstraintKind::Min), Some("1"));
    }

    #[test]
    fn test_constraint_value_keeps_colons() {
        let ann = parse_annotation(r"#prompt:Url|string;pattern:^https?://\w+$").unwrap();
        assert_eq!(ann.constraint(ConstraintKind::Pattern), Some(r"^https?://\w+$"));
    }

    #[test]
    fn test_prompt_stops_at_first_pipe() {
        let ann = parse_annotation("#prompt:A or B|string;pattern:a|b").unwrap();
        assert_eq!(ann.prompt_text, "A or B");
        assert_eq!(ann.constraint(ConstraintKind::Pattern), Some("a|b"));
    }

    #[test]
    fn test_enum_with_options() {
        let ann = parse_annotation("#prompt:Env?|enum;options:dev, staging ,prod").unwrap();
        assert_eq!(ann.var_type, VariableType::Enum);
        assert_eq!(ann.options(), vec!["dev", "staging", "prod"]);
    }

    #[test]
    fn test_enum_without_options_becomes_string() {
        let empty = parse_annotation("#prompt:X?|enum;options:").unwrap();
        assert_eq!(empty.var_type, VariableType::String);
        assert!(empty.has_constraint(ConstraintKind::Options));

        let missing = parse_annotation("#prompt:X?|enum").unwrap();
        assert_eq!(missing.var_type, VariableType::String);
    }

    #[test]
    fn test_constraint_applies_to_type() {
        assert!(ConstraintKind::Min.applies_to(VariableType::Numeric));
        assert!(!ConstraintKind::Min.applies_to(VariableType::String));
        assert!(ConstraintKind::Pattern.applies_to(VariableType::String));
        assert!(ConstraintKind::Options.applies_to(VariableType::Enum));
        assert!(!ConstraintKind::Format.applies_to(VariableType::Boolean));
    }

    #[test]
    fn test_syntax_errors() {
        assert_eq!(
            parse_annotation("prompt:X|string"),
            Err(AnnotationError::MissingPrefix)
        );
        assert_eq!(
            parse_annotation("#prompt:no separator"),
            Err(AnnotationError::MissingTypeSeparator)
        );
        assert_eq!(parse_annotation("#prompt:X|"), Err(AnnotationError::MissingType));
        assert_eq!(
            parse_annotation("#prompt:X|;optional"),
            Err(AnnotationError::MissingType)
        );
    }

    #[test]
    fn test_display_is_canonical() {
        let ann = parse_annotation("#prompt:Key?|string;secret;minlen:32;optional").unwrap();
        assert_eq!(ann.to_string(), "#prompt:Key?|string;minlen:32;optional;secret");
        assert_eq!(parse_annotation(&ann.to_string()).unwrap(), ann);
    }
}
