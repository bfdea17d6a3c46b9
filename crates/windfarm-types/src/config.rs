//! Configuration loading for the analytics query layer.
//!
//! Layered config: defaults -> config file -> explicit file -> env vars.
//! The default config file lives at ~/.config/windfarm-analytics/config.toml.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::WindfarmError;

const APP_NAME: &str = "windfarm-analytics";

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory holding the pre-computed result files
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Directory holding the guidance documents
    #[serde(default = "default_guidance_dir")]
    pub guidance_dir: String,

    /// Maximum number of cached result records
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Per-lookup time budget in milliseconds
    #[serde(default = "default_read_budget_ms")]
    pub read_budget_ms: u64,

    /// Result files larger than this exceed the read budget outright
    #[serde(default = "default_max_source_bytes")]
    pub max_source_bytes: u64,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn data_local_dir(leaf: &str) -> String {
    ProjectDirs::from("", "", APP_NAME)
        .map(|p| p.data_local_dir().join(leaf))
        .unwrap_or_else(|| PathBuf::from("./data").join(leaf))
        .to_string_lossy()
        .to_string()
}

fn default_data_dir() -> String {
    data_local_dir("processed")
}

fn default_guidance_dir() -> String {
    data_local_dir("prompts")
}

fn default_cache_capacity() -> usize {
    256
}

fn default_read_budget_ms() -> u64 {
    2000
}

fn default_max_source_bytes() -> u64 {
    64 * 1024 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            guidance_dir: default_guidance_dir(),
            cache_capacity: default_cache_capacity(),
            read_budget_ms: default_read_budget_ms(),
            max_source_bytes: default_max_source_bytes(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/windfarm-analytics/config.toml)
    /// 3. Explicit config file (optional)
    /// 4. Environment variables (WINDFARM_*)
    pub fn load(config_path: Option<&str>) -> Result<Self, WindfarmError> {
        let config_dir = ProjectDirs::from("", "", APP_NAME)
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("data_dir", default_data_dir())
            .map_err(|e| WindfarmError::Config(e.to_string()))?
            .set_default("guidance_dir", default_guidance_dir())
            .map_err(|e| WindfarmError::Config(e.to_string()))?
            .set_default("cache_capacity", default_cache_capacity() as i64)
            .map_err(|e| WindfarmError::Config(e.to_string()))?
            .set_default("read_budget_ms", default_read_budget_ms() as i64)
            .map_err(|e| WindfarmError::Config(e.to_string()))?
            .set_default("max_source_bytes", default_max_source_bytes() as i64)
            .map_err(|e| WindfarmError::Config(e.to_string()))?
            .set_default("log_level", default_log_level())
            .map_err(|e| WindfarmError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // WINDFARM_DATA_DIR, WINDFARM_CACHE_CAPACITY, ...
        builder = builder.add_source(
            Environment::with_prefix("WINDFARM")
                .prefix_separator("_")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| WindfarmError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| WindfarmError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), WindfarmError> {
        if self.cache_capacity == 0 {
            return Err(WindfarmError::Config("cache_capacity must be > 0".to_string()));
        }
        if self.read_budget_ms == 0 {
            return Err(WindfarmError::Config("read_budget_ms must be > 0".to_string()));
        }
        if self.max_source_bytes == 0 {
            return Err(WindfarmError::Config(
                "max_source_bytes must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Per-lookup read budget.
    pub fn read_budget(&self) -> Duration {
        Duration::from_millis(self.read_budget_ms)
    }

    pub fn data_path(&self) -> PathBuf {
        expand_home(&self.data_dir)
    }

    pub fn guidance_path(&self) -> PathBuf {
        expand_home(&self.guidance_dir)
    }
}

/// Expand a leading `~/` to the user's home directory.
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()) {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.cache_capacity, 256);
        assert_eq!(settings.read_budget_ms, 2000);
        assert_eq!(settings.log_level, "info");
        assert!(settings.data_dir.ends_with("processed"));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_explicit_file_overrides_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("windfarm.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "data_dir = \"/srv/results\"").unwrap();
        writeln!(file, "cache_capacity = 8").unwrap();
        writeln!(file, "read_budget_ms = 150").unwrap();

        let settings = Settings::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(settings.data_dir, "/srv/results");
        assert_eq!(settings.cache_capacity, 8);
        assert_eq!(settings.read_budget(), Duration::from_millis(150));
        assert_eq!(settings.max_source_bytes, 64 * 1024 * 1024);
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let result = Settings::load(Some("/definitely/not/here/windfarm.toml"));
        assert!(matches!(result, Err(WindfarmError::Config(_))));
    }

    #[test]
    fn test_validation() {
        let mut settings = Settings::default();
        settings.cache_capacity = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.read_budget_ms = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
        let expanded = expand_home("~/results");
        assert!(expanded.ends_with("results"));
    }
}
