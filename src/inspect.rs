//! Distributable vs target comparison
//!
//! An inspection lists what a target file is missing, what it has that the
//! distributable does not know about, and which values fail their
//! annotations. Reports render as text or JSON.

use crate::document::{Document, Variable};
use crate::generate::GenerateError;
use crate::validation::{value_errors, ValidationOutcome};
use serde::Serialize;
use std::fmt::Write;

/// Result of comparing a target document with its distributable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectionReport {
    pub dist_path: String,
    pub target_path: String,
    /// In the distributable but not in the target
    pub missing: Vec<Variable>,
    /// In the target but not in the distributable
    pub extra: Vec<Variable>,
    pub invalid: Vec<InvalidValue>,
    pub valid_count: usize,
}

/// A target value failing its distributable annotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidValue {
    pub value: String,
    pub outcome: ValidationOutcome,
}

/// Compare a target document against a distributable.
pub fn inspect(dist: &Document, target: &Document) -> InspectionReport {
    let mut report = InspectionReport {
        dist_path: dist.path.clone(),
        target_path: target.path.clone(),
        missing: Vec::new(),
        extra: Vec::new(),
        invalid: Vec::new(),
        valid_count: 0,
    };

    for dist_var in &dist.variables {
        let Some(target_var) = target.get_variable(&dist_var.name) else {
            report.missing.push(dist_var.clone());
            continue;
        };

        let annotation = dist_var.annotation.as_ref();
        match (annotation, value_errors(&target_var.value, annotation).first()) {
            (Some(annotation), Some(err)) => report.invalid.push(InvalidValue {
                value: target_var.value.clone(),
                outcome: ValidationOutcome::from_value_error(
                    &dist_var.name,
                    target_var.line_number,
                    err,
                    annotation,
                ),
            }),
            _ => report.valid_count += 1,
        }
    }

    report.extra = target
        .variables
        .iter()
        .filter(|v| !dist.has_variable(&v.name))
        .cloned()
        .collect();

    report
}

impl InspectionReport {
    pub fn has_discrepancies(&self) -> bool {
        !self.missing.is_empty() || !self.extra.is_empty() || !self.invalid.is_empty()
    }

    /// Add the missing variables to `target` without asking for values.
    ///
    /// A missing variable takes its distributable default, or stays empty
    /// when it is not required. Required variables without a default make
    /// the whole sync fail and leave nothing changed.
    pub fn sync(&self, target: &Document) -> Result<Document, GenerateError> {
        let mut additions = Vec::with_capacity(self.missing.len());
        let mut unresolved = Vec::new();

        for variable in &self.missing {
            if !variable.value.is_empty() || !variable.is_required() {
                additions.push(Variable::new(&variable.name, &variable.value));
            } else {
                unresolved.push(variable.name.clone());
            }
        }

        if !unresolved.is_empty() {
            return Err(GenerateError::Unresolved(unresolved));
        }

        let mut synced = target.clone();
        synced.variables.extend(additions);
        Ok(synced)
    }

    /// Plain text report.
    pub fn format_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "INSPECTION REPORT: {} vs {}\n",
            self.target_path, self.dist_path
        );

        if !self.missing.is_empty() {
            let _ = writeln!(out, "MISSING IN {} ({}):", self.target_path, self.missing.len());
            for variable in &self.missing {
                let (prompt, var_type) = match &variable.annotation {
                    Some(a) => (a.prompt_text.as_str(), format!("[{}]", a.var_type)),
                    None => ("", String::new()),
                };
                let _ = writeln!(out, "  {:<20} {:?} {}", variable.name, prompt, var_type);
            }
            out.push('\n');
        }

        if !self.extra.is_empty() {
            let _ = writeln!(out, "EXTRA IN {} ({}):", self.target_path, self.extra.len());
            for variable in &self.extra {
                let _ = writeln!(out, "  {:<20} (not in distributable)", variable.name);
            }
            out.push('\n');
        }

        if !self.invalid.is_empty() {
            let _ = writeln!(out, "INVALID VALUES ({}):", self.invalid.len());
            for invalid in &self.invalid {
                let _ = writeln!(
                    out,
                    "  {:<20} {}",
                    invalid.outcome.variable, invalid.outcome.message
                );
            }
            out.push('\n');
        }

        let _ = writeln!(
            out,
            "Summary: {} missing, {} extra, {} invalid, {} valid",
            self.missing.len(),
            self.extra.len(),
            self.invalid.len(),
            self.valid_count
        );
        out
    }

    /// Pretty-printed JSON report.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&JsonReport::from(self))
    }
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    missing: Vec<JsonVariable<'a>>,
    extra: Vec<JsonVariable<'a>>,
    invalid: Vec<JsonInvalid<'a>>,
}

#[derive(Debug, Serialize)]
struct JsonVariable<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    prompt: &'a str,
    #[serde(rename = "type", skip_serializing_if = "str::is_empty")]
    var_type: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct JsonInvalid<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    value: &'a str,
    error: &'a str,
}

impl<'a> From<&'a InspectionReport> for JsonReport<'a> {
    fn from(report: &'a InspectionReport) -> Self {
        let missing = report
            .missing
            .iter()
            .map(|v| JsonVariable {
                name: &v.name,
                prompt: v
                    .annotation
                    .as_ref()
                    .map(|a| a.prompt_text.as_str())
                    .unwrap_or_default(),
                var_type: v
                    .annotation
                    .as_ref()
                    .map(|a| a.var_type.as_str())
                    .unwrap_or_default(),
                value: "",
            })
            .collect();

        let extra = report
            .extra
            .iter()
            .map(|v| JsonVariable {
                name: &v.name,
                prompt: "",
                var_type: "",
                value: &v.value,
            })
            .collect();

        let invalid = report
            .invalid
            .iter()
            .map(|i| JsonInvalid {
                name: &i.outcome.variable,
                value: &i.value,
                error: &i.outcome.message,
            })
            .collect();

        Self {
            missing,
            extra,
            invalid,
        }
    }
}
