//! Tool settings for the krakenv CLI.
//!
//! `defaults/krakenv.default.toml` is embedded into the binary so that docs and
//! runtime behavior stay in sync. On top of it [`Loader`] layers, in order:
//! `.krakenv.toml` in the working directory (if present), the file passed with
//! `--config` (must exist) and the command-line [`Overrides`].
//!
//! These are distinct from the per-project `#krakenv:` block parsed by
//! [`crate::project`], which lives inside the distributable itself.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_TOML: &str = include_str!("../defaults/krakenv.default.toml");

/// Settings file looked up in the working directory
pub const LOCAL_SETTINGS_FILE: &str = ".krakenv.toml";

/// Top-level settings consumed by the CLI.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub dist_path: String,
    pub keep_annotations: bool,
    pub validate: ValidateSettings,
    pub inspect: InspectSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidateSettings {
    pub strict: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InspectSettings {
    pub format: ReportFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Text => "text",
            ReportFormat::Json => "json",
        }
    }
}

/// Values given on the command line. `None` leaves the file layers alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub dist_path: Option<String>,
    pub strict: Option<bool>,
    pub keep_annotations: Option<bool>,
    /// Raw so that unknown formats fail at deserialization like file values
    pub format: Option<String>,
}

/// Layers settings files and command-line values over the embedded defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Defaults, then `.krakenv.toml` in `dir`, then `config_file`.
    pub fn in_dir(dir: impl AsRef<Path>, config_file: Option<&Path>) -> Self {
        let mut builder = Config::builder()
            .add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml))
            .add_source(
                File::from(dir.as_ref().join(LOCAL_SETTINGS_FILE))
                    .format(FileFormat::Toml)
                    .required(false),
            );
        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }
        Self { builder }
    }

    /// [`Loader::in_dir`] for the working directory.
    pub fn discover(config_file: Option<&Path>) -> Self {
        Self::in_dir(".", config_file)
    }

    /// Apply the values given on the command line.
    pub fn with_overrides(mut self, overrides: &Overrides) -> Result<Self, ConfigError> {
        if let Some(dist_path) = &overrides.dist_path {
            self.builder = self.builder.set_override("dist_path", dist_path.as_str())?;
        }
        if let Some(strict) = overrides.strict {
            self.builder = self.builder.set_override("validate.strict", strict)?;
        }
        if let Some(keep) = overrides.keep_annotations {
            self.builder = self.builder.set_override("keep_annotations", keep)?;
        }
        if let Some(format) = &overrides.format {
            self.builder = self.builder.set_override("inspect.format", format.as_str())?;
        }
        Ok(self)
    }

    pub fn build(self) -> Result<Settings, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

/// Settings from the embedded defaults alone.
pub fn load_defaults() -> Result<Settings, ConfigError> {
    Config::builder()
        .add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml))
        .build()?
        .try_deserialize()
}
