//! Monitor Configuration Module
//!
//! Per-deployment configuration loaded from TOML, covering fault
//! thresholds, event log sizing, gauge scale, server and storage settings.
//!
//! ## Loading Order
//!
//! 1. `COMPRESSOR_MONITOR_CONFIG` environment variable (path to TOML file)
//! 2. `monitor_config.toml` in the current working directory
//! 3. Built-in defaults
//!
//! The loaded [`MonitorConfig`] is handed to the components that need it;
//! there is no global accessor.

mod monitor_config;
pub mod defaults;
pub mod validation;

pub use monitor_config::*;
