//! # Configuration
//!
//! Where the library and the scene document live, and how to log.
//!
//! Sources, highest precedence first:
//! 1. Command-line flags (`--library`, `--document`)
//! 2. Environment (`POWERLIB_LIBRARY`, `POWERLIB_DOCUMENT`, `POWERLIB_LOG_FORMAT`)
//! 3. The TOML config file (`powerlib.toml` unless `--config` is given)
//! 4. Defaults (nothing configured, text logs)
//!
//! ```toml
//! library = "lib/library.json"
//! document = "shots/010/shot.json"
//! log_format = "json"
//! ```
//!
//! Relative paths in the file are relative to the file's directory. A missing
//! default file is fine; a missing explicit `--config` file or a malformed
//! file is an error.

use powerlib_core::{PathResolver, PowerlibError};
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Config file looked for in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "powerlib.toml";

/// Environment variable overriding the catalog file.
pub const ENV_LIBRARY: &str = "POWERLIB_LIBRARY";

/// Environment variable overriding the scene document file.
pub const ENV_DOCUMENT: &str = "POWERLIB_DOCUMENT";

/// Environment variable selecting the log format (`json` or `text`).
pub const ENV_LOG_FORMAT: &str = "POWERLIB_LOG_FORMAT";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    /// `json` (any case) selects JSON; anything else is text.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub library: Option<PathBuf>,
    pub document: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    library: Option<PathBuf>,
    document: Option<PathBuf>,
    log_format: Option<String>,
}

/// Fully resolved configuration. Paths are absolute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub library: Option<PathBuf>,
    pub document: Option<PathBuf>,
    pub log_format: LogFormat,
    /// The config file that was read, if any.
    pub source: Option<PathBuf>,
}

impl Config {
    /// Resolve configuration from the process environment.
    pub fn load(overrides: &Overrides) -> Result<Self, PowerlibError> {
        Self::load_with_env(overrides, |key| std::env::var_os(key))
    }

    /// Resolve configuration with an explicit environment lookup.
    pub fn load_with_env(
        overrides: &Overrides,
        env: impl Fn(&str) -> Option<OsString>,
    ) -> Result<Self, PowerlibError> {
        let mut config = Self::default();

        let (path, explicit) = match &overrides.config {
            Some(path) => (path.clone(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        if path.is_file() {
            let file = read_file_config(&path)?;
            let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
            config.library = file.library.map(|p| base.join(p));
            config.document = file.document.map(|p| base.join(p));
            if let Some(format) = file.log_format {
                config.log_format = LogFormat::parse(&format);
            }
            config.source = Some(absolute(&path)?);
        } else if explicit {
            return Err(PowerlibError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }

        let non_empty = |key: &str| env(key).filter(|v| !v.is_empty());
        if let Some(library) = non_empty(ENV_LIBRARY) {
            config.library = Some(PathBuf::from(library));
        }
        if let Some(document) = non_empty(ENV_DOCUMENT) {
            config.document = Some(PathBuf::from(document));
        }
        if let Some(format) = non_empty(ENV_LOG_FORMAT) {
            config.log_format = LogFormat::parse(&format.to_string_lossy());
        }

        if let Some(library) = &overrides.library {
            config.library = Some(library.clone());
        }
        if let Some(document) = &overrides.document {
            config.document = Some(document.clone());
        }

        config.library = config.library.as_deref().map(absolute).transpose()?;
        config.document = config.document.as_deref().map(absolute).transpose()?;
        Ok(config)
    }

    /// A path resolver for the configured library and document.
    #[must_use]
    pub fn resolver(&self) -> PathResolver {
        PathResolver::new(self.library.clone(), self.document.clone())
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig, PowerlibError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| PowerlibError::Config(format!("{}: {e}", path.display())))?;
    toml::from_str(&text).map_err(|e| PowerlibError::Config(format!("{}: {e}", path.display())))
}

fn absolute(path: &Path) -> Result<PathBuf, PowerlibError> {
    if path.as_os_str().is_empty() {
        return Ok(PathBuf::new());
    }
    std::path::absolute(path)
        .map_err(|e| PowerlibError::Config(format!("{}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_parses_json_in_any_case() {
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse("text"), LogFormat::Text);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Text);
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let overrides = Overrides {
            config: Some(PathBuf::from("/definitely/not/here/powerlib.toml")),
            ..Overrides::default()
        };
        let err = Config::load_with_env(&overrides, |_| None).expect_err("missing");
        assert!(matches!(err, PowerlibError::Config(_)));
    }
}
