//! Monitor Configuration - thresholds and runtime settings as TOML values
//!
//! Each struct implements `Default` with the built-in values, so a missing
//! or partial config file behaves exactly like the defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;
use crate::condition_engine::{EngineSettings, NORMAL_SAMPLE_RATE, DEFAULT_CAPACITY};
use crate::types::{GaugeSettings, Thresholds};

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "COMPRESSOR_MONITOR_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "monitor_config.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for one monitored machine.
///
/// Load with `MonitorConfig::load()` which searches:
/// 1. `$COMPRESSOR_MONITOR_CONFIG`
/// 2. `./monitor_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Machine identification
    #[serde(default)]
    pub machine: MachineInfo,

    /// Fault limits
    #[serde(default)]
    pub thresholds: Thresholds,

    /// Event log sizing and sampling
    #[serde(default)]
    pub event_log: EventLogConfig,

    /// RUL gauge scale and maintenance advice
    #[serde(default)]
    pub gauge: GaugeSettings,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Reading history storage
    #[serde(default)]
    pub storage: StorageConfig,
}

impl MonitorConfig {
    /// Load configuration using the standard search order.
    pub fn load() -> Self {
        // 1. Check env var
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), machine = %config.machine.name, "Loaded monitor config from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        // 2. Check ./monitor_config.toml
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(machine = %config.machine.name, "Loaded monitor config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        // 3. Defaults
        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, err) => ConfigError::Parse(path.to_path_buf(), err),
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    ///
    /// Unknown keys are reported as warnings, never as errors.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(contents)
            .map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Inputs for the per-reading engine.
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            thresholds: self.thresholds,
            gauge: self.gauge,
        }
    }

    /// Validate all values for internal consistency.
    ///
    /// Rules:
    /// - Thresholds must be finite and > 0
    /// - Event log capacity must be > 0, sample rate within [0, 1]
    /// - Gauge full scale must be > 0, maintenance level finite and >= 0
    /// - Retention and cleanup cadence must be > 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        let t = &self.thresholds;
        Self::check_positive(t.vibration_g, "thresholds.vibration_g", &mut errors);
        Self::check_positive(t.temperature_c, "thresholds.temperature_c", &mut errors);
        Self::check_positive(t.current_a, "thresholds.current_a", &mut errors);

        let log = &self.event_log;
        if log.capacity == 0 {
            errors.push("event_log.capacity must be > 0".to_string());
        }
        if !(0.0..=1.0).contains(&log.normal_sample_rate) {
            errors.push(format!(
                "event_log.normal_sample_rate ({}) must be within [0, 1]",
                log.normal_sample_rate
            ));
        }

        let g = &self.gauge;
        Self::check_positive(g.rul_full_scale_hours, "gauge.rul_full_scale_hours", &mut errors);
        if !g.maintenance_rul_hours.is_finite() || g.maintenance_rul_hours < 0.0 {
            errors.push(format!(
                "gauge.maintenance_rul_hours ({}) must be a finite number >= 0",
                g.maintenance_rul_hours
            ));
        }

        if self.server.addr.trim().is_empty() {
            errors.push("server.addr must not be empty".to_string());
        }

        let s = &self.storage;
        if s.retention_days == 0 {
            errors.push("storage.retention_days must be > 0".to_string());
        }
        if s.cleanup_every == 0 {
            errors.push("storage.cleanup_every must be > 0".to_string());
        }

        let (range_errors, range_warnings) = super::validation::validate_physical_ranges(self);
        errors.extend(range_errors);
        for w in &range_warnings {
            warn!("{}", w);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_positive(value: f64, name: &str, errors: &mut Vec<String>) {
        // NaN fails every comparison, so test finiteness explicitly
        if !value.is_finite() || value <= 0.0 {
            errors.push(format!("{name} must be a finite number > 0 (got {value})"));
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Machine Info
// ============================================================================

/// Identification metadata, shown in logs and the status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineInfo {
    /// Machine name / tag
    #[serde(default = "default_machine_name")]
    pub name: String,

    /// Plant location
    #[serde(default)]
    pub location: String,
}

fn default_machine_name() -> String {
    "AIR-COMPRESSOR-01".to_string()
}

impl Default for MachineInfo {
    fn default() -> Self {
        Self {
            name: default_machine_name(),
            location: String::new(),
        }
    }
}

// ============================================================================
// Event Log
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogConfig {
    /// Maximum retained entries
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Probability that a NORMAL reading is logged
    #[serde(default = "default_normal_sample_rate")]
    pub normal_sample_rate: f64,
}

fn default_capacity() -> usize { DEFAULT_CAPACITY }
fn default_normal_sample_rate() -> f64 { NORMAL_SAMPLE_RATE }

impl Default for EventLogConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            normal_sample_rate: default_normal_sample_rate(),
        }
    }
}

// ============================================================================
// Server
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server bind address.
    ///
    /// Can be overridden by `COMPRESSOR_MONITOR_ADDR` env var or `--addr` CLI flag.
    #[serde(default = "default_server_addr")]
    pub addr: String,
}

fn default_server_addr() -> String {
    defaults::SERVER_ADDR.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_server_addr(),
        }
    }
}

// ============================================================================
// Storage
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Persist every reading to the history database
    #[serde(default = "default_storage_enabled")]
    pub enabled: bool,

    /// Sled database directory
    #[serde(default = "default_storage_path")]
    pub path: String,

    /// Readings older than this are deleted (days)
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Run retention cleanup every N readings
    #[serde(default = "default_cleanup_every")]
    pub cleanup_every: u64,
}

fn default_storage_enabled() -> bool { true }
fn default_storage_path() -> String { defaults::STORAGE_PATH.to_string() }
fn default_retention_days() -> u32 { defaults::RETENTION_DAYS }
fn default_cleanup_every() -> u64 { defaults::CLEANUP_EVERY_READINGS }

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: default_storage_enabled(),
            path: default_storage_path(),
            retention_days: default_retention_days(),
            cleanup_every: default_cleanup_every(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = MonitorConfig::default();
        assert!(config.validate().is_ok(), "Default config must always validate");
    }

    #[test]
    fn test_empty_toml_produces_defaults() {
        let config: MonitorConfig = toml::from_str("").expect("empty TOML should parse");
        assert_eq!(config.thresholds.vibration_g, 1.2);
        assert_eq!(config.thresholds.temperature_c, 60.0);
        assert_eq!(config.thresholds.current_a, 5.0);
        assert_eq!(config.event_log.capacity, 10);
        assert_eq!(config.event_log.normal_sample_rate, 0.05);
        assert_eq!(config.gauge.rul_full_scale_hours, 500.0);
        assert_eq!(config.storage.retention_days, 7);
    }

    #[test]
    fn test_partial_toml_override() {
        let toml_str = r#"
[machine]
name = "Compressor-B"

[thresholds]
temperature_c = 70.0
"#;
        let config = MonitorConfig::from_toml_str(toml_str).expect("partial TOML should parse");
        assert_eq!(config.machine.name, "Compressor-B");
        assert_eq!(config.thresholds.temperature_c, 70.0);
        // Non-overridden values retain defaults
        assert_eq!(config.thresholds.vibration_g, 1.2);
        assert_eq!(config.server.addr, "0.0.0.0:8000");
    }

    #[test]
    fn test_validation_catches_bad_sample_rate() {
        let mut config = MonitorConfig::default();
        config.event_log.normal_sample_rate = 1.5;
        match config.validate() {
            Err(ConfigError::Validation(errors)) => {
                assert!(errors.iter().any(|e| e.contains("normal_sample_rate")));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_validation_catches_nan_threshold() {
        let mut config = MonitorConfig::default();
        config.thresholds.current_a = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_catches_zero_capacity() {
        let mut config = MonitorConfig::default();
        config.event_log.capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_roundtrip_keeps_thresholds() {
        let mut config = MonitorConfig::default();
        config.thresholds.vibration_g = 0.9;
        let text = config.to_toml().unwrap();
        let back = MonitorConfig::from_toml_str(&text).unwrap();
        assert_eq!(back.thresholds, config.thresholds);
    }

    #[test]
    fn test_engine_settings_follow_config() {
        let mut config = MonitorConfig::default();
        config.gauge.maintenance_rul_hours = 150.0;
        let settings = config.engine_settings();
        assert_eq!(settings.gauge.maintenance_rul_hours, 150.0);
        assert_eq!(settings.thresholds, config.thresholds);
    }
}
