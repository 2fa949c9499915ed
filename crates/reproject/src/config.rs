//! Configuration for reprojection runs.
//!
//! Sources, later overriding earlier: defaults, a YAML file, `TABPROJ_*`
//! environment variables, then command-line flags (applied by the caller).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ReprojectError, Result};

/// Log levels accepted by `log_level`.
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration for a reprojection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReprojectConfig {
    /// Resample output rows on the rayon thread pool.
    pub parallel: bool,

    /// Print the mapped input pixel of every resolved output sample.
    pub list_coordinates: bool,

    /// Minimum level for log output.
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub log_json: bool,
}

impl Default for ReprojectConfig {
    fn default() -> Self {
        Self {
            parallel: false,
            list_coordinates: false,
            log_level: "warn".to_string(),
            log_json: false,
        }
    }
}

impl ReprojectConfig {
    /// Defaults, then the YAML file at `path` (if any), then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        config.validate().map_err(ReprojectError::Config)?;
        Ok(config)
    }

    /// Parse a YAML document; absent fields keep their defaults.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ReprojectError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&text)
    }

    /// Override fields from `TABPROJ_*` environment variables.
    pub fn apply_env(&mut self) {
        if let Ok(val) = std::env::var("TABPROJ_PARALLEL") {
            self.parallel = parse_flag(&val);
        }

        if let Ok(val) = std::env::var("TABPROJ_LIST") {
            self.list_coordinates = parse_flag(&val);
        }

        if let Ok(val) = std::env::var("TABPROJ_LOG_LEVEL") {
            self.log_level = val.to_lowercase();
        }

        if let Ok(val) = std::env::var("TABPROJ_LOG_JSON") {
            self.log_json = parse_flag(&val);
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(format!(
                "log_level must be one of {}, got '{}'",
                LOG_LEVELS.join(", "),
                self.log_level
            ));
        }
        Ok(())
    }
}

fn parse_flag(val: &str) -> bool {
    val.eq_ignore_ascii_case("true") || val == "1"
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = ReprojectConfig::default();
        assert!(!config.parallel);
        assert!(!config.list_coordinates);
        assert_eq!(config.log_level, "warn");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = ReprojectConfig::from_yaml_str("parallel: true\n").unwrap();
        assert!(config.parallel);
        assert_eq!(config.log_level, "warn");

        let config = ReprojectConfig::from_yaml_str("").unwrap();
        assert_eq!(config, ReprojectConfig::default());
    }

    #[test]
    fn test_yaml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "list_coordinates: true\nlog_level: debug\nlog_json: true").unwrap();
        let config = ReprojectConfig::from_yaml_file(file.path()).unwrap();
        assert!(config.list_coordinates);
        assert!(config.log_json);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(
            ReprojectConfig::from_yaml_str("parallel: [1, 2"),
            Err(ReprojectError::Config(_))
        ));
    }

    #[test]
    fn test_validate_log_level() {
        let config = ReprojectConfig {
            log_level: "loud".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ReprojectConfig {
            log_level: "DEBUG".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("1"));
        assert!(parse_flag("TRUE"));
        assert!(!parse_flag("yes"));
        assert!(!parse_flag("0"));
    }
}
