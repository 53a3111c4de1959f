//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use crate::index::{IndexConfig, Resolution};
use crate::report::{ReportFormat, ReportOptions, View};
use crate::storage::GeohashKey;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub filter: FilterConfig,

    #[serde(default)]
    pub report: ReportConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Geohash allow-list
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterConfig {
    /// Keys admitted to the geohash index; empty admits every key
    #[serde(default)]
    pub geohashes: Vec<String>,
}

/// Report defaults
#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_view")]
    pub view: View,

    #[serde(default = "default_resolution")]
    pub resolution: Resolution,

    #[serde(default = "default_format")]
    pub format: ReportFormat,

    #[serde(default)]
    pub chronological: bool,
}

fn default_view() -> View {
    View::Time
}

fn default_resolution() -> Resolution {
    Resolution::Day
}

fn default_format() -> ReportFormat {
    ReportFormat::Records
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            view: default_view(),
            resolution: default_resolution(),
            format: default_format(),
            chronological: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

/// Log line layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(ConfigError::UnknownValue {
                field: "logging.format",
                value: other.to_string(),
            }),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load from default locations or environment
    ///
    /// A config file that exists but cannot be read or parsed is an error;
    /// only the absence of every default file falls back to the environment.
    pub fn load_default() -> Result<Self, ConfigError> {
        let config_paths: Vec<PathBuf> = [
            dirs::config_dir().map(|p| p.join("geodemand").join("config.toml")),
            Some(PathBuf::from("./geodemand.toml")),
        ]
        .into_iter()
        .flatten()
        .collect();

        Self::load_first(&config_paths)
    }

    /// Load the first existing file of `paths`
    fn load_first(paths: &[PathBuf]) -> Result<Self, ConfigError> {
        match paths.iter().find(|path| path.exists()) {
            Some(path) => {
                let config = Self::load_with_env(path)?;
                tracing::debug!("Loaded config from {:?}", path);
                Ok(config)
            }
            None => Self::from_env(),
        }
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides looked up by variable name
    fn apply_overrides<F>(&mut self, var: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(list) = var("GEODEMAND_GEOHASHES") {
            self.filter.geohashes = split_list(&list);
        }

        if let Some(level) = var("GEODEMAND_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("GEODEMAND_LOG_FORMAT") {
            self.logging.format = format.parse()?;
        }

        Ok(())
    }

    /// Validated allow-list for the index manager
    pub fn index_config(&self) -> Result<IndexConfig, ConfigError> {
        self.index_config_with(None)
    }

    /// Validated allow-list, with a command line list replacing `[filter]`
    pub fn index_config_with(&self, cli_list: Option<&str>) -> Result<IndexConfig, ConfigError> {
        let keys = match cli_list {
            Some(list) => parse_geohash_list(&split_list(list))?,
            None => parse_geohash_list(&self.filter.geohashes)?,
        };
        Ok(IndexConfig::with_allow_list(keys))
    }

    /// Report options seeded from the `[report]` section
    pub fn report_options(&self) -> ReportOptions {
        ReportOptions {
            view: self.report.view,
            resolution: self.report.resolution,
            format: self.report.format,
            chronological: self.report.chronological,
            ..ReportOptions::default()
        }
    }
}

/// Split a comma separated list, dropping surrounding whitespace
pub fn split_list(list: &str) -> Vec<String> {
    list.split(',').map(|s| s.trim().to_string()).collect()
}

/// Validate geohash keys: non-empty, at most six bytes each
pub fn parse_geohash_list<S: AsRef<str>>(keys: &[S]) -> Result<Vec<GeohashKey>, ConfigError> {
    keys.iter()
        .map(|k| {
            let k = k.as_ref();
            if k.is_empty() {
                return Err(ConfigError::InvalidFilter("empty geohash in list".to_string()));
            }
            k.parse().map_err(ConfigError::InvalidFilter)
        })
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid geohash filter: {0}")]
    InvalidFilter(String),

    #[error("Unknown value for {field}: {value}")]
    UnknownValue { field: &'static str, value: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Geodemand Configuration
#
# Environment variables override these settings:
# - GEODEMAND_GEOHASHES   (comma separated)
# - GEODEMAND_LOG_LEVEL
# - GEODEMAND_LOG_FORMAT

[filter]
# Only these geohashes are placed in the geohash index.
# Leave empty to index every key.
geohashes = []

[report]
# Index to walk: time or geohash
view = "time"

# Time slot granularity: day, hour or quarter
resolution = "day"

# Output: records, summary or json
format = "records"

# Visit each slot oldest block first
chronological = false

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_parses() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();

        assert!(config.filter.geohashes.is_empty());
        assert_eq!(config.report.view, View::Time);
        assert_eq!(config.report.resolution, Resolution::Day);
        assert_eq!(config.report.format, ReportFormat::Records);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("geodemand.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[filter]\ngeohashes = [\"qp03wc\", \"qp09sw\"]\n\n[report]\nview = \"geohash\"\nresolution = \"quarter\"\nformat = \"json\""
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.filter.geohashes, vec!["qp03wc", "qp09sw"]);
        assert_eq!(config.report.view, View::Geohash);
        assert_eq!(config.report.resolution, Resolution::Quarter);

        let options = config.report_options();
        assert_eq!(options.format, ReportFormat::Json);
        assert!(!options.chronological);

        let index = config.index_config().unwrap();
        assert_eq!(index.allow_list.len(), 2);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let err = Config::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_bad_enum_value() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[report]\nresolution = \"week\"\n").unwrap();

        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_geohash_list_validation() {
        let keys = parse_geohash_list(&split_list("a1b2c3, d4e5f6")).unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[1].to_string(), "d4e5f6");

        assert!(matches!(
            parse_geohash_list(&split_list("a1b2c3,toolong")),
            Err(ConfigError::InvalidFilter(_))
        ));
        assert!(parse_geohash_list(&split_list("a1b2c3,,d4e5f6")).is_err());
    }

    #[test]
    fn test_broken_default_file_is_an_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("config.toml");
        let broken = dir.path().join("geodemand.toml");
        std::fs::write(&broken, "[filter]\ngeohashes = [\"a1b2c3\"\n").unwrap();

        let result = Config::load_first(&[missing, broken]);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_first_existing_default_file_wins() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("config.toml");
        let first = dir.path().join("first.toml");
        let second = dir.path().join("second.toml");
        std::fs::write(&first, "[report]\nview = \"geohash\"\n").unwrap();
        std::fs::write(&second, "[report]\nview = \"time\"\n").unwrap();

        let config = Config::load_first(&[missing, first, second]).unwrap();
        assert_eq!(config.report.view, View::Geohash);
    }

    #[test]
    fn test_no_default_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_first(&[dir.path().join("absent.toml")]).unwrap();
        assert_eq!(config.report.resolution, Resolution::Day);
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::default();
        config.filter.geohashes = vec!["qp03wc".to_string()];

        config
            .apply_overrides(|name| match name {
                "GEODEMAND_GEOHASHES" => Some("a1b2c3, d4e5f6".to_string()),
                "GEODEMAND_LOG_LEVEL" => Some("debug".to_string()),
                "GEODEMAND_LOG_FORMAT" => Some("JSON".to_string()),
                _ => None,
            })
            .unwrap();

        assert_eq!(config.filter.geohashes, vec!["a1b2c3", "d4e5f6"]);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_unknown_log_format_override() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(|name| (name == "GEODEMAND_LOG_FORMAT").then(|| "xml".to_string()))
            .unwrap_err();

        assert!(matches!(
            err,
            ConfigError::UnknownValue {
                field: "logging.format",
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_log_format_in_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("geodemand.toml");
        std::fs::write(&path, "[logging]\nformat = \"xml\"\n").unwrap();

        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_geohashes_env_var() {
        std::env::set_var("GEODEMAND_GEOHASHES", "qp09sw");
        let config = Config::from_env();
        std::env::remove_var("GEODEMAND_GEOHASHES");

        assert_eq!(config.unwrap().filter.geohashes, vec!["qp09sw"]);
    }

    #[test]
    fn test_cli_list_replaces_config_filter() {
        let mut config = Config::default();
        config.filter.geohashes = vec!["qp03wc".to_string(), "qp09sw".to_string()];

        let from_config = config.index_config_with(None).unwrap();
        assert_eq!(from_config.allow_list.len(), 2);

        let from_cli = config.index_config_with(Some("a1b2c3")).unwrap();
        assert_eq!(from_cli.allow_list, vec!["a1b2c3".parse::<GeohashKey>().unwrap()]);

        assert!(matches!(
            config.index_config_with(Some("a1b2c3,toolong")),
            Err(ConfigError::InvalidFilter(_))
        ));
    }
}
