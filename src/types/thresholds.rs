//! Fault thresholds and gauge constants

use serde::{Deserialize, Serialize};

/// Built-in limits for compressor fault detection
pub mod compressor_thresholds {
    /// Per-axis vibration magnitude limit (g)
    pub const VIBRATION_G: f64 = 1.2;
    /// Motor temperature limit (°C)
    pub const TEMPERATURE_C: f64 = 60.0;
    /// Motor current limit (A)
    pub const CURRENT_A: f64 = 5.0;
}

/// RUL gauge geometry
pub mod gauge {
    /// RUL value rendered as a full circle (hours)
    pub const RUL_FULL_SCALE_HOURS: f64 = 500.0;
    /// Gauge circumference in SVG units (2πr for r = 45)
    pub const CIRCUMFERENCE: f64 = 283.0;
    /// Below this RUL the machine needs inspection (hours)
    pub const MAINTENANCE_RUL_HOURS: f64 = 100.0;
}

/// Fault limits applied to every reading.
///
/// Fixed at startup; the classifier only ever borrows them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Per-axis vibration magnitude limit (g)
    #[serde(default = "default_vibration_g")]
    pub vibration_g: f64,
    /// Temperature limit (°C)
    #[serde(default = "default_temperature_c")]
    pub temperature_c: f64,
    /// Current limit (A)
    #[serde(default = "default_current_a")]
    pub current_a: f64,
}

fn default_vibration_g() -> f64 { compressor_thresholds::VIBRATION_G }
fn default_temperature_c() -> f64 { compressor_thresholds::TEMPERATURE_C }
fn default_current_a() -> f64 { compressor_thresholds::CURRENT_A }

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            vibration_g: default_vibration_g(),
            temperature_c: default_temperature_c(),
            current_a: default_current_a(),
        }
    }
}

/// RUL gauge and maintenance advice settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaugeSettings {
    /// RUL rendered as a full gauge (hours)
    #[serde(default = "default_rul_full_scale_hours")]
    pub rul_full_scale_hours: f64,
    /// RUL below which inspection is recommended (hours)
    #[serde(default = "default_maintenance_rul_hours")]
    pub maintenance_rul_hours: f64,
}

fn default_rul_full_scale_hours() -> f64 { gauge::RUL_FULL_SCALE_HOURS }
fn default_maintenance_rul_hours() -> f64 { gauge::MAINTENANCE_RUL_HOURS }

impl Default for GaugeSettings {
    fn default() -> Self {
        Self {
            rul_full_scale_hours: default_rul_full_scale_hours(),
            maintenance_rul_hours: default_maintenance_rul_hours(),
        }
    }
}
