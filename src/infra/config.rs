//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml
//!
//! A file that cannot be read or parsed is logged and replaced by defaults.

use crate::domain::types::SensorType;
use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Config file used when neither `--config` nor `CONFIG_FILE` is given
pub const DEFAULT_CONFIG_PATH: &str = "config/dev.toml";

/// Confidence threshold handed to the cat detector when none is configured
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 50.0;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SiteConfig {
    /// Unique site identifier
    #[serde(default = "default_site_id")]
    pub id: String,
}

fn default_site_id() -> String {
    "catpoint".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectorConfig {
    /// Minimum confidence (0-100) for an image to count as showing a cat
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self { confidence_threshold: default_confidence_threshold() }
    }
}

fn default_confidence_threshold() -> f32 {
    DEFAULT_CONFIDENCE_THRESHOLD
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// JSON file holding sensors and status
    #[serde(default = "default_store_path")]
    pub path: String,
    /// Keep state in memory only (nothing survives a restart)
    #[serde(default)]
    pub in_memory: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { path: default_store_path(), in_memory: false }
    }
}

fn default_store_path() -> String {
    "catpoint.json".to_string()
}

/// Sensor registered at startup if the store does not know it yet
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SensorSeed {
    pub name: String,
    #[serde(rename = "type")]
    pub sensor_type: SensorType,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_interval")]
    pub interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval() }
    }
}

fn default_metrics_interval() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub sensors: Vec<SensorSeed>,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    site_id: String,
    confidence_threshold: f32,
    store_path: String,
    store_in_memory: bool,
    sensors: Vec<SensorSeed>,
    metrics_interval_secs: u64,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site_id: default_site_id(),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            store_path: default_store_path(),
            store_in_memory: false,
            sensors: Vec::new(),
            metrics_interval_secs: default_metrics_interval(),
            config_file: "default".to_string(),
        }
    }
}

fn choose_config_path(cli_path: Option<&str>, env_path: Option<String>) -> String {
    match (cli_path, env_path) {
        (Some(path), _) => path.to_string(),
        (None, Some(path)) if !path.is_empty() => path,
        _ => DEFAULT_CONFIG_PATH.to_string(),
    }
}

impl Config {
    /// Determine config file path: `--config`, then `CONFIG_FILE`, then the default
    pub fn resolve_config_path(cli_path: Option<&str>) -> String {
        choose_config_path(cli_path, env::var("CONFIG_FILE").ok())
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        let threshold = toml_config.detector.confidence_threshold;
        if !(0.0..=100.0).contains(&threshold) {
            anyhow::bail!(
                "Invalid confidence_threshold {} in {} (expected 0..=100)",
                threshold,
                path.display()
            );
        }

        let mut seen = std::collections::HashSet::new();
        for seed in &toml_config.sensors {
            if !seen.insert(seed.name.as_str()) {
                anyhow::bail!("Duplicate sensor '{}' in {}", seed.name, path.display());
            }
        }

        Ok(Self {
            site_id: toml_config.site.id,
            confidence_threshold: threshold,
            store_path: toml_config.store.path,
            store_in_memory: toml_config.store.in_memory,
            sensors: toml_config.sensors,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            config_file: path.display().to_string(),
        })
    }

    /// Load configuration from a path, falling back to defaults on error
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path, error = %format!("{:#}", e), "config_load_failed_using_defaults");
                Self::default()
            }
        }
    }

    /// Load configuration from the resolved path, falling back to defaults
    pub fn load(cli_path: Option<&str>) -> Self {
        Self::load_from_path(&Self::resolve_config_path(cli_path))
    }

    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    pub fn store_path(&self) -> &str {
        &self.store_path
    }

    pub fn store_in_memory(&self) -> bool {
        self.store_in_memory
    }

    pub fn sensors(&self) -> &[SensorSeed] {
        &self.sensors
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.site_id(), "catpoint");
        assert_eq!(config.confidence_threshold(), 50.0);
        assert_eq!(config.store_path(), "catpoint.json");
        assert!(!config.store_in_memory());
        assert!(config.sensors().is_empty());
        assert_eq!(config.metrics_interval_secs(), 60);
    }

    #[test]
    fn test_choose_config_path_precedence() {
        assert_eq!(choose_config_path(None, None), "config/dev.toml");
        assert_eq!(choose_config_path(None, Some(String::new())), "config/dev.toml");
        assert_eq!(
            choose_config_path(None, Some("/etc/catpoint/home.toml".to_string())),
            "/etc/catpoint/home.toml"
        );
        assert_eq!(
            choose_config_path(Some("config/cabin.toml"), Some("/etc/catpoint/home.toml".to_string())),
            "config/cabin.toml"
        );
    }

    // Only test in this binary that touches CONFIG_FILE
    #[test]
    fn test_load_reads_config_file_env_var() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cabin.toml");
        fs::write(&path, "[site]\nid = \"cabin\"\n").unwrap();

        env::set_var("CONFIG_FILE", &path);
        let from_env = Config::load(None);
        let from_cli = Config::load(Some("/nonexistent/catpoint.toml"));
        env::remove_var("CONFIG_FILE");

        assert_eq!(from_env.site_id(), "cabin");
        assert_eq!(from_env.config_file(), path.display().to_string());
        assert_eq!(from_cli.site_id(), "catpoint");
    }

    #[test]
    fn test_toml_sections_default_when_missing() {
        let parsed: TomlConfig = toml::from_str("[site]\nid = \"flat\"\n").unwrap();
        assert_eq!(parsed.site.id, "flat");
        assert_eq!(parsed.detector.confidence_threshold, DEFAULT_CONFIDENCE_THRESHOLD);
        assert_eq!(parsed.store.path, "catpoint.json");
        assert!(parsed.sensors.is_empty());
    }

    #[test]
    fn test_sensor_seed_parses_type() {
        let parsed: TomlConfig = toml::from_str(
            r#"
[[sensors]]
name = "Kitchen Window"
type = "window"
"#,
        )
        .unwrap();
        assert_eq!(
            parsed.sensors,
            vec![SensorSeed { name: "Kitchen Window".to_string(), sensor_type: SensorType::Window }]
        );
    }
}
