//! qcss.toml configuration parser.
//!
//! The configuration is read once at process start and handed to the
//! subsystems that need it. Every section has defaults, so an empty file
//! is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors produced while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QcssConfig {
    pub css: CssConfig,
    pub watcher: WatcherConfig,
    pub placement: PlacementConfig,
}

/// Which KV tree backend holds the CSS.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CssBackend {
    /// Process-local tree, lost on exit. Useful for dry runs.
    Memory,
    /// redb file on local disk.
    #[default]
    Redb,
}

/// redb file used when `css.path` is not set.
pub const DEFAULT_CSS_PATH: &str = "/var/lib/qcss/css.redb";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CssConfig {
    pub backend: CssBackend,
    /// redb file; [`DEFAULT_CSS_PATH`] when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl CssConfig {
    /// The redb file to open.
    pub fn redb_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CSS_PATH))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Sleep between reconciliation passes in continuous mode.
    pub interval_secs: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self { interval_secs: 3 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Candidate workers for round-robin placement of new chunks.
    pub workers: Vec<String>,
}

impl QcssConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: QcssConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.watcher.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "watcher.interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.css.path.as_ref().is_some_and(|p| p.as_os_str().is_empty()) {
            return Err(ConfigError::Invalid("css.path must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = QcssConfig::from_toml_str("").unwrap();
        assert_eq!(config, QcssConfig::default());
        assert_eq!(config.watcher.interval_secs, 3);
        assert_eq!(config.css.backend, CssBackend::Redb);
    }

    #[test]
    fn parse_full() {
        let toml_str = r#"
[css]
backend = "memory"

[watcher]
interval_secs = 10

[placement]
workers = ["worker1", "worker2"]
"#;
        let config = QcssConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.css.backend, CssBackend::Memory);
        assert_eq!(config.watcher.interval_secs, 10);
        assert_eq!(config.placement.workers, vec!["worker1", "worker2"]);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = QcssConfig::from_toml_str("[watcher]\ninterval_secs = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn redb_path_defaults_when_unset() {
        let config = QcssConfig::from_toml_str("[css]\nbackend = \"redb\"\n").unwrap();
        assert_eq!(config.css.path, None);
        assert_eq!(config.css.redb_path(), PathBuf::from(DEFAULT_CSS_PATH));

        let config =
            QcssConfig::from_toml_str("[css]\npath = \"/tmp/qcss/css.redb\"\n").unwrap();
        assert_eq!(config.css.redb_path(), PathBuf::from("/tmp/qcss/css.redb"));
    }

    #[test]
    fn empty_path_is_rejected() {
        let err = QcssConfig::from_toml_str("[css]\npath = \"\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn render_round_trips() {
        let mut config = QcssConfig::default();
        config.placement.workers = vec!["w1".to_string()];
        let rendered = config.to_toml_string().unwrap();
        assert!(rendered.contains("w1"));
        assert_eq!(QcssConfig::from_toml_str(&rendered).unwrap(), config);
    }
}
