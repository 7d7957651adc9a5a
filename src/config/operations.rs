//! Config loading, validation, and utility operations.

use super::model::{Config, MAX_SECONDS, Settings};
use crate::error::{CoordError, Result};
use crate::fs::atomic_write_file;
use crate::patterns::compile_glob;
use std::path::Path;
use std::time::Duration;

/// File name of the config inside a coordination root.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

impl Config {
    /// Load config from a YAML file.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(CoordError::UserError)` - Read error, parse error, or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            CoordError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load config from a YAML file, falling back to defaults when the file
    /// does not exist. Any other failure is still an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Parse config from a YAML string.
    ///
    /// Zero-valued settings are replaced with their defaults before
    /// validation.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let mut config: Config = if yaml.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(yaml)
                .map_err(|e| CoordError::UserError(format!("failed to parse config YAML: {}", e)))?
        };

        config.settings.apply_defaults();
        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            CoordError::UserError(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Write the config into `coord_dir/config.yaml`.
    pub fn save<P: AsRef<Path>>(&self, coord_dir: P) -> Result<()> {
        let yaml = self.to_yaml()?;
        atomic_write_file(coord_dir.as_ref().join(CONFIG_FILE_NAME), &yaml)
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - every protected pattern must be non-empty
    /// - every protected pattern must be a valid glob
    pub fn validate(&self) -> Result<()> {
        for (index, protected) in self.protected.iter().enumerate() {
            if protected.pattern.trim().is_empty() {
                return Err(CoordError::UserError(format!(
                    "config validation failed: protected[{}].pattern must be non-empty",
                    index
                )));
            }

            compile_glob(&protected.pattern).map_err(|e| {
                CoordError::UserError(format!(
                    "config validation failed: protected[{}].pattern '{}' is not a valid glob: {}",
                    index, protected.pattern, e
                ))
            })?;
        }

        let settings = [
            ("default_ttl", self.settings.default_ttl),
            ("stale_threshold", self.settings.stale_threshold),
            ("heartbeat_interval", self.settings.heartbeat_interval),
        ];
        for (name, value) in settings {
            if value > MAX_SECONDS {
                return Err(CoordError::UserError(format!(
                    "config validation failed: settings.{} must be at most {} seconds",
                    name, MAX_SECONDS
                )));
            }
        }

        Ok(())
    }

    /// The protected pattern strings, in match order.
    pub fn pattern_strings(&self) -> Vec<&str> {
        self.protected.iter().map(|p| p.pattern.as_str()).collect()
    }
}

impl Settings {
    /// Replace zero values with defaults.
    pub fn apply_defaults(&mut self) {
        let defaults = Settings::default();
        if self.default_ttl == 0 {
            self.default_ttl = defaults.default_ttl;
        }
        if self.stale_threshold == 0 {
            self.stale_threshold = defaults.stale_threshold;
        }
        if self.heartbeat_interval == 0 {
            self.heartbeat_interval = defaults.heartbeat_interval;
        }
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval)
    }
}
