//! Configuration types for the particulate monitor

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PmsError, Result};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub acquisition: AcquisitionConfig,
    #[serde(default = "default_windows")]
    pub windows: Vec<WindowConfig>,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

/// Serial port configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub mode: SensorMode,
}

/// Reporting mode of the sensor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorMode {
    /// Sensor streams frames on its own
    #[default]
    Active,
    /// Sensor answers one frame per read request
    Passive,
}

/// Acquisition loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    #[serde(default = "default_polling_interval")]
    pub polling_interval_ms: u64,
}

/// One rolling statistics window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    pub name: String,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
}

/// CSV persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

/// Terminal dashboard configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_timeout() -> u64 {
    5
}

fn default_polling_interval() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("sensor_readings.csv")
}

fn default_windows() -> Vec<WindowConfig> {
    [
        ("1m", 60),
        ("5m", 300),
        ("10m", 600),
        ("1h", 3_600),
        ("12h", 43_200),
    ]
    .into_iter()
    .map(|(name, secs)| WindowConfig {
        name: name.to_string(),
        duration: Duration::from_secs(secs),
    })
    .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            serial: SerialConfig::default(),
            acquisition: AcquisitionConfig::default(),
            windows: default_windows(),
            storage: StorageConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyAMA0".to_string(),
            baud_rate: default_baud_rate(),
            timeout_seconds: default_timeout(),
            mode: SensorMode::default(),
        }
    }
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            polling_interval_ms: default_polling_interval(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_storage_path(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl AcquisitionConfig {
    pub fn cadence(&self) -> Duration {
        Duration::from_millis(self.polling_interval_ms)
    }
}

impl SerialConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Config {
    /// Reject configurations the tracker and acquisition loop cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.acquisition.polling_interval_ms == 0 {
            return Err(PmsError::Config(
                "polling_interval_ms must be greater than zero".to_string(),
            ));
        }

        if self.windows.is_empty() {
            return Err(PmsError::Config(
                "at least one window must be configured".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for window in &self.windows {
            if window.duration.is_zero() {
                return Err(PmsError::Config(format!(
                    "window '{}' has a zero duration",
                    window.name
                )));
            }
            if !seen.insert(window.name.as_str()) {
                return Err(PmsError::Config(format!(
                    "duplicate window name '{}'",
                    window.name
                )));
            }
        }

        Ok(())
    }
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(config)
}
