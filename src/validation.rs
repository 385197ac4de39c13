//! Type and constraint validation
//!
//! [`validate_value`] checks a raw value against an annotation. It is a pure
//! function dispatching on [`VariableType`]; every failure is a typed
//! [`ValueError`] whose message is meant for users.
//!
//! On top of it sit the document-level checks, which never stop at the first
//! problem and collect a [`ValidationOutcome`] per failure:
//! - [`validate_document`]: each variable against its own annotation
//! - [`validate_against`]: a target document against a distributable
//! - [`diagnose`]: the syntax problems the permissive assembler drops

use crate::annotation::{parse_annotation, Annotation, ConstraintKind, VariableType};
use crate::document::{classify_line, Document, LineKind, Variable};
use crate::error::TokenizeError;
use crate::lexing::tokenize_line;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;

/// Literals accepted for booleans, compared case-insensitively
const BOOLEAN_LITERALS: &[&str] = &["true", "false", "yes", "no", "1", "0", "on", "off"];

/// Why a value failed validation
#[derive(Debug, Clone, PartialEq)]
pub enum ValueError {
    /// Empty value for a type that needs one
    Required(VariableType),
    NotAnInteger(String),
    NotANumber(String),
    BelowMinimum { value: String, min: String },
    AboveMaximum { value: String, max: String },
    TooShort { len: usize, min: usize },
    TooLong { len: usize, max: usize },
    InvalidPattern(String),
    PatternMismatch { value: String, pattern: String },
    NoEnumOptions,
    NotAnOption { value: String, options: String },
    InvalidBoolean(String),
    InvalidJson(String),
    InvalidYaml(String),
    UnknownObjectFormat(String),
}

impl ValueError {
    /// Outcome category for this failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ValueError::Required(_) => ErrorKind::MissingRequired,
            ValueError::NotAnOption { .. } | ValueError::PatternMismatch { .. } => {
                ErrorKind::ConstraintViolation
            }
            ValueError::NotAnInteger(_)
            | ValueError::NotANumber(_)
            | ValueError::BelowMinimum { .. }
            | ValueError::AboveMaximum { .. }
            | ValueError::TooShort { .. }
            | ValueError::TooLong { .. }
            | ValueError::InvalidPattern(_)
            | ValueError::NoEnumOptions
            | ValueError::InvalidBoolean(_)
            | ValueError::InvalidJson(_)
            | ValueError::InvalidYaml(_)
            | ValueError::UnknownObjectFormat(_) => ErrorKind::InvalidType,
        }
    }
}

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueError::Required(var_type) => match var_type {
                VariableType::Int | VariableType::Numeric | VariableType::String => {
                    write!(f, "value is required")
                }
                other => write!(f, "value is required for {}", other),
            },
            ValueError::NotAnInteger(value) => write!(f, "expected integer, got {:?}", value),
            ValueError::NotANumber(value) => write!(f, "expected numeric, got {:?}", value),
            ValueError::BelowMinimum { value, min } => {
                write!(f, "value {} is below minimum {}", value, min)
            }
            ValueError::AboveMaximum { value, max } => {
                write!(f, "value {} exceeds maximum {}", value, max)
            }
            ValueError::TooShort { len, min } => {
                write!(f, "length {} is below minimum {}", len, min)
            }
            ValueError::TooLong { len, max } => write!(f, "length {} exceeds maximum {}", len, max),
            ValueError::InvalidPattern(err) => write!(f, "invalid pattern: {}", err),
            ValueError::PatternMismatch { value, pattern } => {
                write!(f, "value {:?} does not match pattern {}", value, pattern)
            }
            ValueError::NoEnumOptions => write!(f, "enum has no options defined"),
            ValueError::NotAnOption { value, options } => {
                write!(f, "value {:?} not in allowed options: {}", value, options)
            }
            ValueError::InvalidBoolean(value) => write!(
                f,
                "invalid boolean value {:?} (use: true/false, yes/no, 1/0, on/off)",
                value
            ),
            ValueError::InvalidJson(err) => write!(f, "invalid JSON: {}", err),
            ValueError::InvalidYaml(err) => write!(f, "invalid YAML: {}", err),
            ValueError::UnknownObjectFormat(format) => {
                write!(f, "unknown object format: {}", format)
            }
        }
    }
}

impl std::error::Error for ValueError {}

/// Validate a value. No annotation means no constraints.
///
/// Returns the first failure; [`value_errors`] returns all of them.
pub fn validate_value(value: &str, annotation: Option<&Annotation>) -> Result<(), ValueError> {
    match value_errors(value, annotation).into_iter().next() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Every failure of a value against an annotation.
///
/// A value that cannot be read as its type reports only that; constraint
/// failures are all reported.
pub fn value_errors(value: &str, annotation: Option<&Annotation>) -> Vec<ValueError> {
    let Some(annotation) = annotation else {
        return Vec::new();
    };
    if value.is_empty() && annotation.is_optional {
        return Vec::new();
    }

    match annotation.var_type {
        VariableType::Int => check_int(value, annotation),
        VariableType::Numeric => check_numeric(value, annotation),
        VariableType::String => check_string(value, annotation),
        VariableType::Enum => check_enum(value, annotation),
        VariableType::Boolean => check_boolean(value),
        VariableType::Object => check_object(value, annotation),
    }
}

/// Parse a bound; malformed bounds are skipped.
fn bound<T: std::str::FromStr>(annotation: &Annotation, kind: ConstraintKind) -> Option<T> {
    annotation
        .constraint_value(kind)
        .and_then(|raw| raw.parse().ok())
}

fn check_range<T>(value: &str, n: T, annotation: &Annotation) -> Vec<ValueError>
where
    T: std::str::FromStr + PartialOrd + fmt::Display + Copy,
{
    let mut errors = Vec::new();
    if let Some(min) = bound::<T>(annotation, ConstraintKind::Min) {
        if n < min {
            errors.push(ValueError::BelowMinimum {
                value: value.to_string(),
                min: min.to_string(),
            });
        }
    }
    if let Some(max) = bound::<T>(annotation, ConstraintKind::Max) {
        if n > max {
            errors.push(ValueError::AboveMaximum {
                value: value.to_string(),
                max: max.to_string(),
            });
        }
    }
    errors
}

fn check_int(value: &str, annotation: &Annotation) -> Vec<ValueError> {
    if value.is_empty() {
        return vec![ValueError::Required(VariableType::Int)];
    }
    match value.parse::<i64>() {
        Ok(n) => check_range(value, n, annotation),
        Err(_) => vec![ValueError::NotAnInteger(value.to_string())],
    }
}

fn check_numeric(value: &str, annotation: &Annotation) -> Vec<ValueError> {
    if value.is_empty() {
        return vec![ValueError::Required(VariableType::Numeric)];
    }
    match value.parse::<f64>() {
        Ok(n) => check_range(value, n, annotation),
        Err(_) => vec![ValueError::NotANumber(value.to_string())],
    }
}

fn check_string(value: &str, annotation: &Annotation) -> Vec<ValueError> {
    let mut errors = Vec::new();
    // Length in bytes
    let len = value.len();

    if let Some(min) = bound::<usize>(annotation, ConstraintKind::MinLen) {
        if len < min {
            errors.push(ValueError::TooShort { len, min });
        }
    }
    if let Some(max) = bound::<usize>(annotation, ConstraintKind::MaxLen) {
        if len > max {
            errors.push(ValueError::TooLong { len, max });
        }
    }
    if let Some(pattern) = annotation.constraint_value(ConstraintKind::Pattern) {
        match Regex::new(pattern) {
            Ok(re) if re.is_match(value) => {}
            Ok(_) => errors.push(ValueError::PatternMismatch {
                value: value.to_string(),
                pattern: pattern.to_string(),
            }),
            Err(err) => errors.push(ValueError::InvalidPattern(err.to_string())),
        }
    }

    errors
}

fn check_enum(value: &str, annotation: &Annotation) -> Vec<ValueError> {
    if value.is_empty() {
        return vec![ValueError::Required(VariableType::Enum)];
    }
    let Some(options) = annotation.constraint_value(ConstraintKind::Options) else {
        return vec![ValueError::NoEnumOptions];
    };
    if annotation.options().contains(&value) {
        Vec::new()
    } else {
        vec![ValueError::NotAnOption {
            value: value.to_string(),
            options: options.to_string(),
        }]
    }
}

fn check_boolean(value: &str) -> Vec<ValueError> {
    if value.is_empty() {
        return vec![ValueError::Required(VariableType::Boolean)];
    }
    let lowered = value.to_lowercase();
    if BOOLEAN_LITERALS.contains(&lowered.as_str()) {
        Vec::new()
    } else {
        vec![ValueError::InvalidBoolean(value.to_string())]
    }
}

fn check_object(value: &str, annotation: &Annotation) -> Vec<ValueError> {
    if value.is_empty() {
        return vec![ValueError::Required(VariableType::Object)];
    }
    let result = match object_format(annotation) {
        "json" => serde_json::from_str::<serde_json::Value>(value)
            .map(|_| ())
            .map_err(|err| ValueError::InvalidJson(err.to_string())),
        "yaml" => serde_yaml::from_str::<serde_yaml::Value>(value)
            .map(|_| ())
            .map_err(|err| ValueError::InvalidYaml(err.to_string())),
        other => Err(ValueError::UnknownObjectFormat(other.to_string())),
    };
    result.err().into_iter().collect()
}

fn object_format(annotation: &Annotation) -> &str {
    annotation
        .constraint_value(ConstraintKind::Format)
        .unwrap_or("json")
}

/// How to fix a value for this annotation.
pub fn suggestion(annotation: &Annotation) -> String {
    let min = annotation.constraint_value(ConstraintKind::Min);
    let max = annotation.constraint_value(ConstraintKind::Max);
    match annotation.var_type {
        VariableType::Int => match (min, max) {
            (Some(min), Some(max)) => format!("Enter an integer between {} and {}", min, max),
            (Some(min), None) => format!("Enter an integer >= {}", min),
            (None, Some(max)) => format!("Enter an integer <= {}", max),
            (None, None) => "Enter a valid integer".to_string(),
        },
        VariableType::Numeric => match (min, max) {
            (Some(min), Some(max)) => format!("Enter a number between {} and {}", min, max),
            _ => "Enter a valid number".to_string(),
        },
        VariableType::String => match annotation.constraint_value(ConstraintKind::Pattern) {
            Some(pattern) => format!("Enter a value matching pattern: {}", pattern),
            None => "Enter a valid string".to_string(),
        },
        VariableType::Enum => format!(
            "Choose one of: {}",
            annotation.constraint(ConstraintKind::Options).unwrap_or_default()
        ),
        VariableType::Boolean => "Enter true/false, yes/no, 1/0, or on/off".to_string(),
        VariableType::Object => format!("Enter valid {}", object_format(annotation)),
    }
}

/// An example of a valid value for this annotation.
pub fn example(annotation: &Annotation) -> String {
    match annotation.var_type {
        VariableType::Int => annotation
            .constraint_value(ConstraintKind::Min)
            .unwrap_or("42")
            .to_string(),
        VariableType::Numeric => "3.14".to_string(),
        VariableType::String => "example_value".to_string(),
        VariableType::Enum => annotation
            .options()
            .first()
            .map(|s| s.to_string())
            .unwrap_or_default(),
        VariableType::Boolean => "true".to_string(),
        VariableType::Object => match object_format(annotation) {
            "yaml" => "key: value".to_string(),
            _ => r#"{"key": "value"}"#.to_string(),
        },
    }
}

/// Category of a validation outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MissingRequired,
    InvalidType,
    ConstraintViolation,
    AnnotationSyntax,
    DuplicateVariable,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MissingRequired => "missing_required",
            ErrorKind::InvalidType => "invalid_type",
            ErrorKind::ConstraintViolation => "constraint_violation",
            ErrorKind::AnnotationSyntax => "annotation_syntax",
            ErrorKind::DuplicateVariable => "duplicate_variable",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single validation failure with everything needed to report it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub kind: ErrorKind,
    pub variable: String,
    /// 1-indexed; 0 when the variable is absent from the checked file
    pub line_number: usize,
    pub message: String,
    pub suggestion: String,
    pub example: String,
}

impl ValidationOutcome {
    /// Outcome for a value that failed its annotation.
    pub fn from_value_error(
        variable: &str,
        line_number: usize,
        err: &ValueError,
        annotation: &Annotation,
    ) -> Self {
        Self {
            kind: err.kind(),
            variable: variable.to_string(),
            line_number,
            message: err.to_string(),
            suggestion: suggestion(annotation),
            example: example(annotation),
        }
    }

    pub fn missing_required(variable: &str, line_number: usize, prompt: &str) -> Self {
        Self {
            kind: ErrorKind::MissingRequired,
            variable: variable.to_string(),
            line_number,
            message: "Required variable has no value".to_string(),
            suggestion: format!("Set a value for {}", variable),
            example: prompt.to_string(),
        }
    }

    pub fn annotation_syntax(variable: &str, line_number: usize, message: &str) -> Self {
        Self {
            kind: ErrorKind::AnnotationSyntax,
            variable: variable.to_string(),
            line_number,
            message: format!("Malformed annotation: {}", message),
            suggestion: "Check annotation syntax: #prompt:Message?|type;constraint:value"
                .to_string(),
            example: "#prompt:Enter value?|string;minlen:1".to_string(),
        }
    }

    pub fn invalid_name(name: &str, line_number: usize, err: &TokenizeError) -> Self {
        Self {
            kind: ErrorKind::AnnotationSyntax,
            variable: name.to_string(),
            line_number,
            message: err.to_string(),
            suggestion: "Rename the variable using uppercase letters, digits and underscores"
                .to_string(),
            example: name.to_uppercase().replace(|c: char| !c.is_ascii_alphanumeric(), "_"),
        }
    }

    pub fn unannotated(variable: &str, line_number: usize) -> Self {
        Self {
            kind: ErrorKind::AnnotationSyntax,
            variable: variable.to_string(),
            line_number,
            message: "Variable has no annotation (strict mode)".to_string(),
            suggestion: "Add an annotation to the distributable".to_string(),
            example: String::new(),
        }
    }

    pub fn duplicate_variable(variable: &str, line_number: usize, first_line: usize) -> Self {
        Self {
            kind: ErrorKind::DuplicateVariable,
            variable: variable.to_string(),
            line_number,
            message: format!("Variable already defined on line {}", first_line),
            suggestion: "Remove duplicate definition".to_string(),
            example: String::new(),
        }
    }

    /// Multi-line rendering: location, problem, fix and example.
    pub fn format(&self) -> String {
        let mut out = format!("  Line {}: {}\n", self.line_number, self.variable);
        out.push_str(&format!("    ✗ {}\n", self.message));
        if !self.suggestion.is_empty() {
            out.push_str(&format!("    → Fix: {}\n", self.suggestion));
        }
        if !self.example.is_empty() {
            out.push_str(&format!("    → Example: {}\n", self.example));
        }
        out
    }
}

impl fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (line {}): {}",
            self.variable, self.line_number, self.message
        )
    }
}

/// All outcomes of validating one file
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationReport {
    pub outcomes: Vec<ValidationOutcome>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, outcome: ValidationOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn is_valid(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.outcomes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationOutcome> {
        self.outcomes.iter()
    }

    /// Human readable report for `path`.
    pub fn format(&self, path: &str) -> String {
        if self.is_valid() {
            return format!("✓ VALIDATION PASSED: {}\n", path);
        }
        let mut out = format!("✗ VALIDATION FAILED: {}\n\n", path);
        for outcome in &self.outcomes {
            out.push_str(&outcome.format());
            out.push('\n');
        }
        out.push_str(&format!("Found {} error(s)\n", self.outcomes.len()));
        out
    }
}

impl Extend<ValidationOutcome> for ValidationReport {
    fn extend<T: IntoIterator<Item = ValidationOutcome>>(&mut self, iter: T) {
        self.outcomes.extend(iter);
    }
}

/// Outcomes for a variable checked against its own annotation.
pub fn validate_variable(variable: &Variable) -> Vec<ValidationOutcome> {
    check_against(variable, variable.annotation.as_ref())
}

fn check_against(variable: &Variable, annotation: Option<&Annotation>) -> Vec<ValidationOutcome> {
    let Some(annotation) = annotation else {
        return Vec::new();
    };
    value_errors(&variable.value, Some(annotation))
        .iter()
        .map(|err| {
            ValidationOutcome::from_value_error(
                &variable.name,
                variable.line_number,
                err,
                annotation,
            )
        })
        .collect()
}

/// Validate every variable of a document against its own annotation.
pub fn validate_document(document: &Document) -> ValidationReport {
    let mut report = ValidationReport::new();
    for variable in &document.variables {
        report.extend(validate_variable(variable));
    }
    report
}

/// Validate a target document against the annotations of a distributable.
///
/// Strict mode, requested here or by the distributable's config, also flags
/// target variables whose distributable entry has no annotation.
pub fn validate_against(dist: &Document, target: &Document, strict: bool) -> ValidationReport {
    let strict = strict || dist.config.as_ref().is_some_and(|c| c.strict);
    let mut report = ValidationReport::new();

    for dist_var in &dist.variables {
        let Some(target_var) = target.get_variable(&dist_var.name) else {
            if let Some(annotation) = dist_var.annotation.as_ref().filter(|a| !a.is_optional) {
                report.push(ValidationOutcome::missing_required(
                    &dist_var.name,
                    0,
                    &annotation.prompt_text,
                ));
            }
            continue;
        };

        match &dist_var.annotation {
            Some(annotation) => report.extend(check_against(target_var, Some(annotation))),
            None if strict => report.push(ValidationOutcome::unannotated(
                &dist_var.name,
                target_var.line_number,
            )),
            None => {}
        }
    }

    report
}

/// Report the problems the assembler tolerates: invalid variable names,
/// malformed annotations and duplicate definitions.
pub fn diagnose<I, S>(lines: I) -> Vec<ValidationOutcome>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut outcomes = Vec::new();
    let mut first_seen: HashMap<String, usize> = HashMap::new();

    for (idx, line) in lines.into_iter().enumerate() {
        let line = line.as_ref();
        let line_number = idx + 1;
        if classify_line(line) != LineKind::Variable {
            continue;
        }

        let tokens = match tokenize_line(line) {
            Ok(Some(tokens)) => tokens,
            Ok(None) => continue,
            Err(err) => {
                let TokenizeError::InvalidVariableName(name) = &err;
                outcomes.push(ValidationOutcome::invalid_name(name, line_number, &err));
                continue;
            }
        };

        if let Some(text) = tokens.annotation.as_deref() {
            if let Err(err) = parse_annotation(text) {
                outcomes.push(ValidationOutcome::annotation_syntax(
                    &tokens.name,
                    line_number,
                    &err.to_string(),
                ));
            }
        }

        match first_seen.get(&tokens.name) {
            Some(&first_line) => outcomes.push(ValidationOutcome::duplicate_variable(
                &tokens.name,
                line_number,
                first_line,
            )),
            None => {
                first_seen.insert(tokens.name, line_number);
            }
        }
    }

    outcomes
}
