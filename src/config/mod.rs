//! Configuration system
//!
//! Handles TOML config file parsing and CLI argument merging.

pub mod builder;
pub mod file;

pub use builder::ConfigBuilder;
pub use file::ConfigFile;

use crate::cli::args::OutputFormat;
use crate::nvml::{BindStrategy, LoadOptions};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Native library settings
    pub library: LibraryConfig,
    /// Output settings
    pub output: OutputConfig,
    /// Device selection settings
    pub device: DeviceConfig,
}

impl Config {
    /// How to load the native library
    pub fn load_options(&self) -> LoadOptions {
        let options = LoadOptions::default().with_strategy(self.library.strategy());
        match &self.library.path {
            Some(path) => options.with_path(path.clone()),
            None => options,
        }
    }
}

/// Native library configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Explicit library path; the platform search list is used when unset
    pub path: Option<PathBuf>,
    /// Fail at load time if any known symbol is missing
    pub strict: bool,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            path: None,
            strict: true,
        }
    }
}

impl LibraryConfig {
    pub fn strategy(&self) -> BindStrategy {
        if self.strict {
            BindStrategy::Strict
        } else {
            BindStrategy::Lenient
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

/// Device selection; UUID wins over index when both are set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Target GPU by index
    pub index: Option<u32>,
    /// Target GPU by UUID
    pub uuid: Option<String>,
}

impl DeviceConfig {
    pub fn selector(&self) -> DeviceSelector {
        match (&self.uuid, self.index) {
            (Some(uuid), _) => DeviceSelector::Uuid(uuid.clone()),
            (None, Some(index)) => DeviceSelector::Index(index),
            (None, None) => DeviceSelector::All,
        }
    }
}

/// Which devices a command operates on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSelector {
    All,
    Index(u32),
    Uuid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.library.strict);
        assert!(config.library.path.is_none());
        assert!(matches!(config.output.format, OutputFormat::Table));
        assert_eq!(config.device.selector(), DeviceSelector::All);
    }

    #[test]
    fn test_parse_full_config() {
        let config: Config = toml::from_str(
            r#"
            [library]
            path = "/usr/lib/x86_64-linux-gnu/libnvidia-ml.so.1"
            strict = false

            [output]
            format = "json"

            [device]
            index = 1
            "#,
        )
        .unwrap();

        assert_eq!(
            config.library.path,
            Some(PathBuf::from("/usr/lib/x86_64-linux-gnu/libnvidia-ml.so.1"))
        );
        assert_eq!(config.library.strategy(), BindStrategy::Lenient);
        assert!(matches!(config.output.format, OutputFormat::Json));
        assert_eq!(config.device.selector(), DeviceSelector::Index(1));
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: Config = toml::from_str("[device]\nuuid = \"GPU-1234\"\n").unwrap();
        assert!(config.library.strict);
        assert_eq!(
            config.device.selector(),
            DeviceSelector::Uuid("GPU-1234".to_string())
        );
    }

    #[test]
    fn test_uuid_wins_over_index() {
        let device = DeviceConfig {
            index: Some(0),
            uuid: Some("GPU-abcd".to_string()),
        };
        assert_eq!(device.selector(), DeviceSelector::Uuid("GPU-abcd".to_string()));
    }

    #[test]
    fn test_unknown_format_rejected() {
        let result: Result<Config, _> = toml::from_str("[output]\nformat = \"xml\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_options() {
        let mut config = Config::default();
        config.library.path = Some(PathBuf::from("/opt/nvml/libnvidia-ml.so"));
        config.library.strict = false;

        let options = config.load_options();
        assert_eq!(options.path, Some(PathBuf::from("/opt/nvml/libnvidia-ml.so")));
        assert_eq!(options.strategy, BindStrategy::Lenient);
    }
}
