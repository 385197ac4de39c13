//! Document assembler
//!
//! Folds the lines of an env file into a [`Document`]: ordered variables,
//! standalone comments and the optional project config block.
//!
//! Assembly never fails on individual lines. A line with an invalid variable
//! name is skipped; a malformed annotation is dropped and its variable kept
//! unannotated. Use [`crate::validation::diagnose`] to report what was
//! dropped.
//!
//! Duplicate variables resolve to the position of the first occurrence and
//! the data (value, annotation, line number) of the last.

use crate::annotation::{parse_annotation, Annotation};
use crate::error::DocumentError;
use crate::lexing::{
    extract_comment_text, is_annotation_line, is_comment, is_empty_line, tokenize_line,
};
use crate::project::{is_config_line, parse_config, ProjectConfig};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{debug, trace};

/// An environment variable with its optional annotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    /// Always trimmed; may be empty
    pub value: String,
    pub annotation: Option<Annotation>,
    /// 1-indexed
    pub line_number: usize,
    /// Whether the source line assigned a value, even an empty one
    pub is_set: bool,
}

impl Variable {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            name: name.into(),
            is_set: true,
            value,
            annotation: None,
            line_number: 0,
        }
    }

    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotation = Some(annotation);
        self
    }

    pub fn at_line(mut self, line_number: usize) -> Self {
        self.line_number = line_number;
        self
    }

    /// Whether a value must be supplied: annotated and not optional.
    pub fn is_required(&self) -> bool {
        self.annotation.as_ref().is_some_and(|a| !a.is_optional)
    }

    /// Render as `NAME=value`, optionally followed by the annotation.
    pub fn to_line(&self, include_annotation: bool) -> String {
        let mut line = format!("{}={}", self.name, quote_if_needed(&self.value));
        if include_annotation {
            if let Some(annotation) = &self.annotation {
                line.push(' ');
                line.push_str(&annotation.to_string());
            }
        }
        line
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line(true))
    }
}

/// Values that already look quoted would lose their quotes on the next
/// parse, so wrap them in the other quote character.
fn quote_if_needed(value: &str) -> String {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 && bytes[0] == bytes[bytes.len() - 1] {
        match bytes[0] {
            b'"' => return format!("'{value}'"),
            b'\'' => return format!("\"{value}\""),
            _ => {}
        }
    }
    value.to_string()
}

/// A standalone comment line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    /// Text without the leading `#`
    pub text: String,
    pub line_number: usize,
}

impl Comment {
    pub fn to_line(&self) -> String {
        format!("# {}", self.text)
    }
}

/// How the assembler treats a raw line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Config,
    Comment,
    Blank,
    Variable,
}

/// Classify a raw line.
///
/// Order matters:
/// 1. Config lines (`#krakenv:`)
/// 2. Standalone comments (start with `#` and carry no inline annotation)
/// 3. Blank lines
/// 4. Everything else is handed to the tokenizer
pub fn classify_line(line: &str) -> LineKind {
    if is_config_line(line) {
        LineKind::Config
    } else if is_comment(line) && !is_annotation_line(line) {
        LineKind::Comment
    } else if is_empty_line(line) {
        LineKind::Blank
    } else {
        LineKind::Variable
    }
}

/// A parsed env file
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    pub path: String,
    /// In first-seen order; names are unique
    pub variables: Vec<Variable>,
    pub comments: Vec<Comment>,
    /// Present only when the source had at least one config line
    pub config: Option<ProjectConfig>,
}

impl Document {
    /// Assemble a document from already split lines.
    pub fn parse_lines<I, S>(lines: I, path: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut document = Document {
            path: path.into(),
            ..Document::default()
        };
        let mut config_lines: Vec<String> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for (idx, line) in lines.into_iter().enumerate() {
            let line = line.as_ref();
            let line_number = idx + 1;

            let kind = classify_line(line);
            trace!(line = line_number, ?kind, "classified line");

            match kind {
                LineKind::Config => config_lines.push(line.to_string()),
                LineKind::Comment => {
                    let text = extract_comment_text(line);
                    if !text.is_empty() {
                        document.comments.push(Comment {
                            text: text.to_string(),
                            line_number,
                        });
                    }
                }
                LineKind::Blank => {}
                LineKind::Variable => {
                    let Some(variable) = assemble_variable(line, line_number) else {
                        continue;
                    };
                    match positions.get(&variable.name) {
                        Some(&existing) => document.variables[existing] = variable,
                        None => {
                            positions.insert(variable.name.clone(), document.variables.len());
                            document.variables.push(variable);
                        }
                    }
                }
            }
        }

        if !config_lines.is_empty() {
            document.config = Some(parse_config(&config_lines));
        }

        document
    }

    /// Assemble a document from file content.
    pub fn parse_str(content: &str, path: impl Into<String>) -> Self {
        Self::parse_lines(content.lines(), path)
    }

    /// Read and assemble a document from disk.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse_str(&content, path.display().to_string()))
    }

    pub fn get_variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.get_variable(name).is_some()
    }

    /// The project config, or the defaults when the document has none.
    pub fn config_or_default(&self) -> ProjectConfig {
        self.config.clone().unwrap_or_default()
    }

    /// Serialize back into lines: config block, then variables with the
    /// comments that preceded them.
    pub fn to_lines(&self, include_annotations: bool) -> Vec<String> {
        let mut lines = Vec::new();

        if let Some(config) = &self.config {
            lines.extend(config.to_lines());
            lines.push(String::new());
        }

        let mut comments = self.comments.iter().peekable();
        for variable in &self.variables {
            while let Some(comment) = comments.next_if(|c| c.line_number < variable.line_number) {
                lines.push(comment.to_line());
            }
            lines.push(variable.to_line(include_annotations));
        }
        lines.extend(comments.map(Comment::to_line));

        lines
    }
}

fn assemble_variable(line: &str, line_number: usize) -> Option<Variable> {
    let tokens = match tokenize_line(line) {
        Ok(Some(tokens)) => tokens,
        Ok(None) => return None,
        Err(err) => {
            debug!(line = line_number, %err, "skipping line");
            return None;
        }
    };

    let annotation = tokens
        .annotation
        .as_deref()
        .and_then(|text| match parse_annotation(text) {
            Ok(annotation) => Some(annotation),
            Err(err) => {
                debug!(line = line_number, %err, "dropping malformed annotation");
                None
            }
        });

    let value = tokens.value.trim().to_string();
    Some(Variable {
        is_set: !value.is_empty() || line.contains('='),
        name: tokens.name,
        value,
        annotation,
        line_number,
    })
}
