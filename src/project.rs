//! Project config block
//!
//! A distributable can carry project-level settings as special comments:
//!
//! ```text
//! #krakenv:environments=local,testing,production
//! #krakenv:strict=true
//! #krakenv:distPath=config/.env.dist
//! ```
//!
//! Lines are independent; when a key repeats, the last one wins. Unknown keys
//! are ignored.

use tracing::debug;

/// Marker that opens a config line
pub const CONFIG_MARKER: &str = "#krakenv:";

pub const DEFAULT_ENVIRONMENT: &str = "local";
pub const DEFAULT_DIST_PATH: &str = ".env.dist";

/// Project-level configuration extracted from a distributable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    pub environments: Vec<String>,
    /// Unannotated variables are errors when set
    pub strict: bool,
    pub dist_path: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            environments: vec![DEFAULT_ENVIRONMENT.to_string()],
            strict: false,
            dist_path: DEFAULT_DIST_PATH.to_string(),
        }
    }
}

impl ProjectConfig {
    /// Render the config back into `#krakenv:` lines.
    ///
    /// The environments line is always written so that an explicitly empty
    /// list parses back as empty instead of falling back to the default.
    pub fn to_lines(&self) -> Vec<String> {
        let mut lines = vec![format_config_line(
            "environments",
            &self.environments.join(","),
        )];
        if self.strict {
            lines.push(format_config_line("strict", "true"));
        }
        if self.dist_path != DEFAULT_DIST_PATH {
            lines.push(format_config_line("distPath", &self.dist_path));
        }
        lines
    }

    /// Target files for every configured environment, `.env.<name>` each.
    /// Falls back to the default environment when the list is empty.
    pub fn environment_files(&self) -> Vec<String> {
        if self.environments.is_empty() {
            return vec![format!(".env.{DEFAULT_ENVIRONMENT}")];
        }
        self.environments
            .iter()
            .map(|env| format!(".env.{env}"))
            .collect()
    }
}

pub fn is_config_line(line: &str) -> bool {
    line.trim().starts_with(CONFIG_MARKER)
}

/// Split a config line into its trimmed key and value.
///
/// Returns `None` for lines without the marker or without an `=`.
pub fn parse_config_line(line: &str) -> Option<(&str, &str)> {
    let content = line.trim().strip_prefix(CONFIG_MARKER)?;
    let (key, value) = content.split_once('=')?;
    Some((key.trim(), value.trim()))
}

/// Fold config lines over the defaults. Non-config lines are skipped.
pub fn parse_config<I, S>(lines: I) -> ProjectConfig
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut config = ProjectConfig::default();

    for line in lines {
        let Some((key, value)) = parse_config_line(line.as_ref()) else {
            continue;
        };

        match key {
            "environments" => config.environments = parse_environments(value),
            "strict" => config.strict = matches!(value, "true" | "1" | "yes"),
            "distPath" => {
                if !value.is_empty() {
                    config.dist_path = value.to_string();
                }
            }
            _ => debug!(key, "ignoring unknown config key"),
        }
    }

    config
}

/// Split a comma-separated environment list, dropping empty entries.
pub fn parse_environments(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|env| !env.is_empty())
        .map(String::from)
        .collect()
}

pub fn format_config_line(key: &str, value: &str) -> String {
    format!("{CONFIG_MARKER}{key}={value}")
}
