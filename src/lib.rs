//! # krakenv
//!
//! Parser and validator for annotated environment files.
//!
//! A distributable (`.env.dist`) carries inline annotations that describe how
//! each variable should be prompted for and validated:
//!
//! ```text
//! #krakenv:environments=local,prod
//! # Database
//! DB_HOST=localhost #prompt:Host?|string
//! DB_PORT= #prompt:Port?|int;min:1;max:65535
//! ```
//!
//! The crate is layered bottom-up:
//! - [`lexing`]: single-line tokenizer and line classification
//! - [`project`]: the `#krakenv:KEY=VALUE` project config block
//! - [`annotation`]: the `#prompt:MESSAGE|TYPE;MODIFIER;...` mini-language
//! - [`document`]: assembles lines into a [`document::Document`]
//! - [`validation`]: type and constraint checks producing structured outcomes
//!
//! On top of the core sit [`inspect`] (distributable vs target comparison),
//! [`generate`] (value merging and rendering), [`scaffold`] (authoring
//! distributables) and [`settings`] (tool-level settings for the CLI).

pub mod annotation;
pub mod document;
pub mod error;
pub mod generate;
pub mod inspect;
pub mod lexing;
pub mod project;
pub mod scaffold;
pub mod settings;
pub mod validation;

pub use annotation::{parse_annotation, Annotation, Constraint, ConstraintKind, VariableType};
pub use project::ProjectConfig;
pub use document::{Comment, Document, Variable};
pub use error::{AnnotationError, DocumentError, TokenizeError};
pub use validation::{validate_value, ErrorKind, ValidationOutcome, ValidationReport, ValueError};
