//! Dashboard configuration.
//!
//! Loaded from JSON. Lookup order: `--config <path>`, `$QUAYSIDE_CONFIG`,
//! then `<config dir>/quayside/config.json`. A missing file means defaults.

use log::info;
use quay_widgets::ManagerConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_ENV: &str = "QUAYSIDE_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Missing value for {0}")]
    MissingArgument(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShipDataConfig {
    pub poll_interval_ms: u64,
    /// JSON snapshot file. Synthetic progress when unset.
    pub source_file: Option<PathBuf>,
    pub vessel: String,
    pub total_vehicles: u32,
    pub expected_rate: u32,
}

impl Default for ShipDataConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
            source_file: None,
            vessel: "MV Unnamed".to_string(),
            total_vehicles: 1_600,
            expected_rate: 150,
        }
    }
}

impl ShipDataConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(100))
    }
}

/// One widget slot on the dashboard.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WidgetLayout {
    pub id: String,
    /// Factory type name, e.g. `deck-progress`.
    pub kind: String,
    /// Overrides the type's default dependencies.
    #[serde(default)]
    pub dependencies: Option<Vec<String>>,
    #[serde(default = "default_true")]
    pub auto_update: bool,
}

fn default_true() -> bool {
    true
}

impl WidgetLayout {
    pub fn new(id: &str, kind: &str) -> Self {
        Self {
            id: id.to_string(),
            kind: kind.to_string(),
            dependencies: None,
            auto_update: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub manager: ManagerConfig,
    pub ship_data: ShipDataConfig,
    /// Target discharge rate for the hourly tracker, vehicles per hour.
    pub target_rate: u32,
    pub widgets: Vec<WidgetLayout>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            manager: ManagerConfig::default(),
            ship_data: ShipDataConfig::default(),
            target_rate: 150,
            widgets: vec![
                WidgetLayout::new("ship-data", "ship-data"),
                WidgetLayout::new("hourly-productivity", "hourly-productivity"),
                WidgetLayout::new("deck-progress", "deck-progress"),
                WidgetLayout::new("zone-allocation", "zone-allocation"),
                WidgetLayout::new("hourly-tracker", "hourly-tracker"),
                WidgetLayout::new("charts", "generic"),
                WidgetLayout::new("forms", "generic"),
            ],
        }
    }
}

impl AppConfig {
    /// Load from `path`, or return defaults if the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Save to config file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(io_err)
    }
}

/// Default config file location.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("quayside")
        .join("config.json")
}

/// Resolve the config path from command-line arguments (without the program
/// name) and the environment.
pub fn resolve_config_path<I>(args: I, env_value: Option<String>) -> Result<PathBuf, ConfigError>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args
                .next()
                .map(PathBuf::from)
                .ok_or_else(|| ConfigError::MissingArgument("--config".to_string()));
        }
        if let Some(value) = arg.strip_prefix("--config=") {
            return Ok(PathBuf::from(value));
        }
    }

    Ok(env_value
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path))
}
