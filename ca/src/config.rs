//! Configuration for the `ca` fan-out runner

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::fanout::{FanoutOptions, Mode};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Number of producers to start
    #[serde(default = "default_producers")]
    pub producers: usize,

    /// Values each producer collects
    #[serde(default = "default_values_per_producer")]
    pub values_per_producer: usize,

    /// Scope segments the aggregator is registered under
    #[serde(default = "default_segments")]
    pub segments: Vec<String>,

    /// How producers are scheduled
    #[serde(default)]
    pub mode: Mode,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default)]
    pub log_level: Option<String>,
}

fn default_producers() -> usize {
    crate::DEFAULT_PRODUCERS
}

fn default_values_per_producer() -> usize {
    1
}

fn default_segments() -> Vec<String> {
    vec![crate::DEFAULT_SEGMENT.to_string()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            producers: default_producers(),
            values_per_producer: default_values_per_producer(),
            segments: default_segments(),
            mode: Mode::default(),
            log_level: None,
        }
    }
}

impl Config {
    /// Load config from file, or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            debug!(?config_path, "Config::load: explicit path");
            return Self::load_from(config_path);
        }

        // Try default locations
        let default_paths = [
            dirs::config_dir().map(|p| p.join("ctxagg").join("config.yml")),
            Some(PathBuf::from("ctxagg.yml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                debug!(?path, "Config::load: found default config");
                return Self::load_from(path);
            }
        }

        debug!("Config::load: no config file, using defaults");
        Ok(Config::default())
    }

    fn load_from(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).context(format!("Failed to read config file: {}", path.display()))?;
        let config: Config =
            serde_yaml::from_str(&content).context(format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Runner options built from this config
    pub fn fanout_options(&self) -> FanoutOptions {
        FanoutOptions {
            producers: self.producers,
            values_per_producer: self.values_per_producer,
            segments: self.segments.clone(),
            mode: self.mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.producers, crate::DEFAULT_PRODUCERS);
        assert_eq!(config.segments, vec!["run".to_string()]);
        assert_eq!(config.mode, Mode::Tasks);
        assert!(config.log_level.is_none());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yml");
        std::fs::write(&path, "producers: 12\nmode: threads\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.producers, 12);
        assert_eq!(config.mode, Mode::Threads);
        assert_eq!(config.values_per_producer, 1);
        assert_eq!(config.segments, default_segments());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yml");
        let config = Config {
            producers: 3,
            values_per_producer: 5,
            segments: vec!["req1".to_string(), "field".to_string()],
            mode: Mode::Sequential,
            log_level: Some("debug".to_string()),
        };

        config.save(&path).unwrap();
        assert_eq!(Config::load(Some(&path)).unwrap(), config);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("absent.yml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_fanout_options_from_config() {
        let config = Config {
            producers: 2,
            ..Config::default()
        };
        let options = config.fanout_options();
        assert_eq!(options.producers, 2);
        assert_eq!(options.segments, config.segments);
    }
}
