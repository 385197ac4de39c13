//! Distributable authoring
//!
//! Writes the skeleton of a new distributable and appends annotated
//! variables to an existing one.

use crate::annotation::Annotation;
use crate::document::{Document, Variable};
use crate::error::TokenizeError;
use crate::lexing::is_valid_variable_name;
use crate::project::{format_config_line, ProjectConfig};
use std::fmt;

const TEMPLATE_HEADER: &[&str] = &[
    "# ========================================",
    "# Environment template",
    "# ========================================",
    "#",
    "# Annotation syntax:",
    "#   VAR=default #prompt:Question?|type;constraint:value",
    "#",
    "# Types: string, int, numeric, boolean, enum, object",
    "# Modifiers: optional, secret",
    "#",
    "# Examples:",
    "#   PORT=3000 #prompt:Server port?|int;min:1;max:65535",
    "#   ENV= #prompt:Environment?|enum;options:dev,staging,prod",
    "#   API_KEY= #prompt:API key?|string;secret",
    "#",
    "# Run: krakenv generate .env.local",
    "# ========================================",
    "",
    "# Add your variables below:",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScaffoldError {
    InvalidName(TokenizeError),
    /// The distributable already declares this variable
    Duplicate(String),
}

impl fmt::Display for ScaffoldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScaffoldError::InvalidName(err) => write!(f, "{}", err),
            ScaffoldError::Duplicate(name) => write!(f, "variable {} already exists", name),
        }
    }
}

impl std::error::Error for ScaffoldError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScaffoldError::InvalidName(err) => Some(err),
            ScaffoldError::Duplicate(_) => None,
        }
    }
}

/// Lines of a new distributable: the config block (strict written out
/// explicitly), a blank line and a commented syntax header.
pub fn template_lines(config: &ProjectConfig) -> Vec<String> {
    let mut lines = vec![
        format_config_line("environments", &config.environments.join(",")),
        format_config_line("strict", if config.strict { "true" } else { "false" }),
        String::new(),
    ];
    lines.extend(TEMPLATE_HEADER.iter().map(|line| line.to_string()));
    lines
}

/// Build a variable to append to a distributable.
///
/// Constraints the validator would never read for the annotation's type are
/// dropped. An empty prompt becomes `Enter <type> value`.
pub fn new_variable(
    name: &str,
    default: &str,
    mut annotation: Annotation,
) -> Result<Variable, ScaffoldError> {
    if !is_valid_variable_name(name) {
        return Err(ScaffoldError::InvalidName(
            TokenizeError::InvalidVariableName(name.to_string()),
        ));
    }

    let var_type = annotation.var_type;
    annotation
        .constraints
        .retain(|c| c.kind.applies_to(var_type) && !c.value.is_empty());
    if annotation.prompt_text.trim().is_empty() {
        annotation.prompt_text = format!("Enter {} value", var_type);
    }

    Ok(Variable::new(name, default.trim()).with_annotation(annotation))
}

/// Append `variable` to distributable content, rejecting duplicates.
pub fn append_variable(content: &str, variable: &Variable) -> Result<String, ScaffoldError> {
    if Document::parse_str(content, "").has_variable(&variable.name) {
        return Err(ScaffoldError::Duplicate(variable.name.clone()));
    }

    let mut out = content.to_string();
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(&variable.to_line(true));
    out.push('\n');
    Ok(out)
}
