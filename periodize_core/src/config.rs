//! Configuration file support for periodize.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/periodize/config.toml`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub import: ImportConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Defaults applied while expanding an imported program
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ImportConfig {
    #[serde(default = "default_program_name")]
    pub default_program_name: String,

    /// Sets created for an exercise row that omits its set count
    #[serde(default = "default_set_count")]
    pub default_set_count: u32,

    /// Weeks assumed per schedule entry when a block has no explicit duration
    #[serde(default = "default_weeks_per_schedule_entry")]
    pub weeks_per_schedule_entry: u32,

    /// Duration of a block with neither a duration nor schedule entries
    #[serde(default = "default_fallback_block_weeks")]
    pub fallback_block_weeks: u32,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            default_program_name: default_program_name(),
            default_set_count: default_set_count(),
            weeks_per_schedule_entry: default_weeks_per_schedule_entry(),
            fallback_block_weeks: default_fallback_block_weeks(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        PathBuf::from(home).join(".local/share")
    });
    base.join("periodize")
}

fn default_program_name() -> String {
    "Imported Program".into()
}

fn default_set_count() -> u32 {
    3
}

fn default_weeks_per_schedule_entry() -> u32 {
    2
}

fn default_fallback_block_weeks() -> u32 {
    4
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
            PathBuf::from(home).join(".config")
        });
        base.join("periodize").join("config.toml")
    }

    /// Reject settings the expander cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.import.default_set_count == 0 {
            return Err(Error::Config(
                "import.default_set_count must be at least 1".into(),
            ));
        }
        if self.import.default_program_name.trim().is_empty() {
            return Err(Error::Config(
                "import.default_program_name must not be empty".into(),
            ));
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, self.to_toml()?)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.import.default_program_name, "Imported Program");
        assert_eq!(config.import.default_set_count, 3);
        assert_eq!(config.import.weeks_per_schedule_entry, 2);
        assert_eq!(config.import.fallback_block_weeks, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut config = Config::default();
        config.import.default_set_count = 5;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.import, config.import);
        assert_eq!(loaded.data.data_dir, config.data.data_dir);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[import]
default_set_count = 4
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.import.default_set_count, 4);
        assert_eq!(config.import.fallback_block_weeks, 4); // default
    }

    #[test]
    fn test_zero_set_count_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[import]\ndefault_set_count = 0\n").unwrap();

        let result = Config::load_from(&path);
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
