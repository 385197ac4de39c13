//! Target file generation
//!
//! Builds the variables of a target file from a distributable, an optional
//! existing target and user-supplied values, then renders them back to lines.
//!
//! Value priority, highest first:
//! 1. user-supplied values (validated against the distributable annotation)
//! 2. non-empty values already present in the target
//! 3. distributable defaults

use crate::document::{Document, Variable};
use crate::validation::{value_errors, ValidationOutcome};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateError {
    /// A user value names a variable the distributable does not declare
    UnknownVariable(String),
    /// User values failing their annotations
    InvalidValues(Vec<ValidationOutcome>),
    /// Required variables left without a value
    Unresolved(Vec<String>),
}

impl fmt::Display for GenerateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerateError::UnknownVariable(name) => {
                write!(f, "{} is not declared in the distributable", name)
            }
            GenerateError::InvalidValues(outcomes) => {
                write!(f, "{} invalid value(s)", outcomes.len())?;
                for outcome in outcomes {
                    write!(f, "\n  {}", outcome)?;
                }
                Ok(())
            }
            GenerateError::Unresolved(names) => write!(
                f,
                "the following variables require values: {}",
                names.join(", ")
            ),
        }
    }
}

impl std::error::Error for GenerateError {}

/// Merges a distributable with existing and user-supplied values
#[derive(Debug, Clone)]
pub struct Generator<'a> {
    dist: &'a Document,
    target: Option<&'a Document>,
    keep_annotations: bool,
}

impl<'a> Generator<'a> {
    pub fn new(dist: &'a Document) -> Self {
        Self {
            dist,
            target: None,
            keep_annotations: false,
        }
    }

    /// Use an existing target file as a source of values.
    pub fn with_target(mut self, target: &'a Document) -> Self {
        self.target = Some(target);
        self
    }

    /// Copy annotations into the rendered output.
    pub fn keep_annotations(mut self, keep: bool) -> Self {
        self.keep_annotations = keep;
        self
    }

    fn existing_value(&self, name: &str) -> Option<&'a str> {
        self.target
            .and_then(|target| target.get_variable(name))
            .map(|v| v.value.as_str())
            .filter(|value| !value.is_empty())
    }

    /// Annotated variables with neither a distributable default nor an
    /// existing target value.
    pub fn variables_to_prompt(&self) -> Vec<&'a Variable> {
        self.dist
            .variables
            .iter()
            .filter(|v| v.annotation.is_some())
            .filter(|v| v.value.is_empty())
            .filter(|v| self.existing_value(&v.name).is_none())
            .collect()
    }

    /// Variables still needing a value once `user_values` are applied.
    pub fn pending(&self, user_values: &HashMap<String, String>) -> Vec<&'a Variable> {
        self.variables_to_prompt()
            .into_iter()
            .filter(|v| !user_values.contains_key(&v.name))
            .collect()
    }

    /// Fail when a required variable would still be written empty.
    pub fn check_complete(
        &self,
        user_values: &HashMap<String, String>,
    ) -> Result<(), GenerateError> {
        let unresolved: Vec<String> = self
            .pending(user_values)
            .into_iter()
            .filter(|v| v.is_required())
            .map(|v| v.name.clone())
            .collect();
        if unresolved.is_empty() {
            Ok(())
        } else {
            Err(GenerateError::Unresolved(unresolved))
        }
    }

    /// Build the final variable list, in distributable order.
    pub fn merge(
        &self,
        user_values: &HashMap<String, String>,
    ) -> Result<Vec<Variable>, GenerateError> {
        if let Some(unknown) = user_values.keys().find(|name| !self.dist.has_variable(name)) {
            return Err(GenerateError::UnknownVariable(unknown.clone()));
        }

        let mut invalid = Vec::new();
        let mut merged = Vec::with_capacity(self.dist.variables.len());

        for dist_var in &self.dist.variables {
            let mut variable = dist_var.clone();

            if let Some(value) = user_values.get(&dist_var.name) {
                let value = value.trim();
                if let Some(annotation) = &dist_var.annotation {
                    invalid.extend(value_errors(value, Some(annotation)).iter().map(|err| {
                        ValidationOutcome::from_value_error(
                            &dist_var.name,
                            dist_var.line_number,
                            err,
                            annotation,
                        )
                    }));
                }
                variable.value = value.to_string();
                variable.is_set = true;
            } else if let Some(existing) = self.existing_value(&dist_var.name) {
                variable.value = existing.to_string();
                variable.is_set = true;
            } else {
                variable.is_set = !variable.value.is_empty();
            }

            merged.push(variable);
        }

        if invalid.is_empty() {
            Ok(merged)
        } else {
            Err(GenerateError::InvalidValues(invalid))
        }
    }

    /// Render merged variables with the distributable's config block and
    /// comments.
    pub fn render(&self, variables: &[Variable]) -> Vec<String> {
        let output = Document {
            path: String::new(),
            variables: variables.to_vec(),
            comments: self.dist.comments.clone(),
            config: self.dist.config.clone(),
        };
        output.to_lines(self.keep_annotations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dist() -> Document {
        Document::parse_lines(
            [
                "#krakenv:environments=local,prod",
                "# Database",
                "DB_HOST=localhost #prompt:Host?|string",
                "DB_PORT= #prompt:Port?|int;min:1;max:65535",
                "DB_NAME= #prompt:Name?|string",
                "STATIC=1",
            ],
            ".env.dist",
        )
    }

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_variables_to_prompt() {
        let dist = dist();
        let names: Vec<_> = Generator::new(&dist)
            .variables_to_prompt()
            .iter()
            .map(|v| v.name.as_str())
            .collect();
        assert_eq!(names, vec!["DB_PORT", "DB_NAME"]);

        let target = Document::parse_lines(["DB_PORT=5432", "DB_NAME="], ".env");
        let generator = Generator::new(&dist).with_target(&target);
        let names: Vec<_> = generator
            .variables_to_prompt()
            .iter()
            .map(|v| v.name.as_str())
            .collect();
        assert_eq!(names, vec!["DB_NAME"]);
        assert!(generator.pending(&values(&[("DB_NAME", "app")])).is_empty());
    }

    #[test]
    fn test_merge_priority() {
        let dist = dist();
        let target = Document::parse_lines(["DB_HOST=db.internal", "DB_PORT=5432"], ".env");
        let merged = Generator::new(&dist)
            .with_target(&target)
            .merge(&values(&[("DB_PORT", "6543")]))
            .unwrap();

        let pairs: Vec<_> = merged
            .iter()
            .map(|v| (v.name.as_str(), v.value.as_str(), v.is_set))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("DB_HOST", "db.internal", true),
                ("DB_PORT", "6543", true),
                ("DB_NAME", "", false),
                ("STATIC", "1", true),
            ]
        );
    }

    #[test]
    fn test_merge_rejects_invalid_and_unknown_values() {
        let dist = dist();
        let generator = Generator::new(&dist);

        let err = generator.merge(&values(&[("DB_PORT", "0")])).unwrap_err();
        match err {
            GenerateError::InvalidValues(outcomes) => {
                assert_eq!(outcomes.len(), 1);
                assert_eq!(outcomes[0].variable, "DB_PORT");
            }
            other => panic!("unexpected error: {other}"),
        }

        assert_eq!(
            generator.merge(&values(&[("NOPE", "1")])),
            Err(GenerateError::UnknownVariable("NOPE".to_string()))
        );
    }

    #[test]
    fn test_merge_checks_the_value_it_stores() {
        let dist = Document::parse_lines(
            [
                "NAME= #prompt:Name?|string;minlen:2",
                "PORT= #prompt:Port?|int",
            ],
            ".env.dist",
        );
        let generator = Generator::new(&dist);

        let merged = generator
            .merge(&values(&[("NAME", "ab "), ("PORT", " 80")]))
            .unwrap();
        assert_eq!(merged[0].value, "ab");
        assert_eq!(merged[1].value, "80");

        let err = generator
            .merge(&values(&[("NAME", "a "), ("PORT", "80")]))
            .unwrap_err();
        match err {
            GenerateError::InvalidValues(outcomes) => {
                assert_eq!(outcomes.len(), 1);
                assert_eq!(outcomes[0].message, "length 1 is below minimum 2");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_check_complete() {
        let dist = Document::parse_lines(
            [
                "HOST= #prompt:Host?|string",
                "DEBUG= #prompt:Debug?|boolean;optional",
                "PORT=80 #prompt:Port?|int",
            ],
            ".env.dist",
        );
        let generator = Generator::new(&dist);

        assert_eq!(
            generator.check_complete(&HashMap::new()),
            Err(GenerateError::Unresolved(vec!["HOST".to_string()]))
        );
        assert_eq!(generator.check_complete(&values(&[("HOST", "h")])), Ok(()));
    }

    #[test]
    fn test_render() {
        let dist = dist();
        let generator = Generator::new(&dist);
        let merged = generator
            .merge(&values(&[("DB_PORT", "5432"), ("DB_NAME", "app")]))
            .unwrap();

        assert_eq!(
            generator.render(&merged),
            vec![
                "#krakenv:environments=local,prod",
                "",
                "# Database",
                "DB_HOST=localhost",
                "DB_PORT=5432",
                "DB_NAME=app",
                "STATIC=1",
            ]
        );

        let annotated = generator.keep_annotations(true).render(&merged);
        assert_eq!(annotated[4], "DB_PORT=5432 #prompt:Port?|int;min:1;max:65535");
    }
}
