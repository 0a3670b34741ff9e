//! Config validation: unknown-key detection with Levenshtein suggestions
//! and physical range checks.
//!
//! The raw TOML is first parsed into a `toml::Value`, its key tree is walked
//! and compared against the known field names, and warnings carry a
//! "did you mean?" suggestion. Serde deserialization runs afterwards.
//! Warnings never break an existing config.

use std::collections::HashSet;

use super::MonitorConfig;

/// Full-scale range of the accelerometer on the sensor board (g).
pub const ACCELEROMETER_RANGE_G: f64 = 16.0;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Every valid dotted key path in `MonitorConfig`.
///
/// New fields in monitor_config.rs must be listed here as well.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [machine]
        "machine",
        "machine.name",
        "machine.location",
        // [thresholds]
        "thresholds",
        "thresholds.vibration_g",
        "thresholds.temperature_c",
        "thresholds.current_a",
        // [event_log]
        "event_log",
        "event_log.capacity",
        "event_log.normal_sample_rate",
        // [gauge]
        "gauge",
        "gauge.rul_full_scale_hours",
        "gauge.maintenance_rul_hours",
        // [server]
        "server",
        "server.addr",
        // [storage]
        "storage",
        "storage.enabled",
        "storage.path",
        "storage.retention_days",
        "storage.cleanup_every",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// A table `{ a = { b = 1, c = 2 } }` yields `["a", "a.b", "a.c"]`.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|&k| (k, levenshtein(unknown, k)))
        .filter(|&(_, dist)| dist <= 3)
        // Tie-break on the key so the suggestion does not depend on hash order
        .min_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)))
        .map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are reported by serde
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Physical Range Validation
// ============================================================================

/// Range checks on a parsed `MonitorConfig`.
///
/// Returns (errors, warnings). Errors are values the sensor board can never
/// produce, which would make a fault class unreachable.
pub fn validate_physical_ranges(
    config: &MonitorConfig,
) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let t = &config.thresholds;

    if t.vibration_g >= ACCELEROMETER_RANGE_G {
        errors.push(format!(
            "thresholds.vibration_g = {:.2} is beyond the accelerometer range (±{ACCELEROMETER_RANGE_G} g)",
            t.vibration_g
        ));
    }

    if t.temperature_c > 150.0 {
        warnings.push(ValidationWarning {
            field: "thresholds.temperature_c".to_string(),
            message: format!(
                "thresholds.temperature_c = {:.1} is above the typical motor range (<= 150 °C)",
                t.temperature_c
            ),
            suggestion: None,
        });
    }

    if t.current_a > 100.0 {
        warnings.push(ValidationWarning {
            field: "thresholds.current_a".to_string(),
            message: format!(
                "thresholds.current_a = {:.1} is above the typical compressor range (<= 100 A)",
                t.current_a
            ),
            suggestion: None,
        });
    }

    let g = &config.gauge;
    if g.maintenance_rul_hours >= g.rul_full_scale_hours {
        warnings.push(ValidationWarning {
            field: "gauge.maintenance_rul_hours".to_string(),
            message: format!(
                "gauge.maintenance_rul_hours = {:.0} is not below rul_full_scale_hours = {:.0}; maintenance will always be advised",
                g.maintenance_rul_hours, g.rul_full_scale_hours
            ),
            suggestion: None,
        });
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_identical() {
        assert_eq!(levenshtein("gauge", "gauge"), 0);
    }

    #[test]
    fn test_levenshtein_one_edit() {
        assert_eq!(levenshtein("temprature_c", "temperature_c"), 1);
    }

    #[test]
    fn test_levenshtein_empty() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn test_walk_toml_keys_nested() {
        let toml: toml::Value = r#"
            [thresholds]
            vibration_g = 1.0
        "#
        .parse()
        .unwrap();
        let keys = walk_toml_keys(&toml, "");
        assert!(keys.contains(&"thresholds".to_string()));
        assert!(keys.contains(&"thresholds.vibration_g".to_string()));
    }

    #[test]
    fn test_typo_key_produces_warning_with_suggestion() {
        let toml_str = r#"
[thresholds]
temprature_c = 70.0
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "thresholds.temprature_c");
        assert_eq!(
            warnings[0].suggestion.as_deref(),
            Some("thresholds.temperature_c")
        );
    }

    #[test]
    fn test_all_valid_keys_produce_zero_warnings() {
        let toml_str = r#"
[machine]
name = "Compressor-A"

[thresholds]
vibration_g = 1.2
current_a = 5.0

[event_log]
capacity = 20

[storage]
retention_days = 3
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert!(warnings.is_empty(), "Expected 0 warnings, got: {warnings:?}");
    }

    #[test]
    fn test_unknown_section_produces_warning() {
        let warnings = validate_unknown_keys("[mqtt]\nbroker = \"localhost\"\n");
        assert!(warnings.iter().any(|w| w.field == "mqtt"));
    }

    #[test]
    fn test_suggest_correction_no_match_for_garbage() {
        let known = known_config_keys();
        assert!(suggest_correction("completely_unrelated_garbage_key_xyz", &known).is_none());
    }

    #[test]
    fn test_physical_range_defaults_clean() {
        let (errors, warnings) = validate_physical_ranges(&MonitorConfig::default());
        assert!(errors.is_empty(), "Defaults should produce no errors: {errors:?}");
        assert!(warnings.is_empty(), "Defaults should produce no warnings: {warnings:?}");
    }

    #[test]
    fn test_vibration_beyond_sensor_range_is_error() {
        let mut config = MonitorConfig::default();
        config.thresholds.vibration_g = 20.0;
        let (errors, _) = validate_physical_ranges(&config);
        assert!(errors.iter().any(|e| e.contains("vibration_g")));
    }

    #[test]
    fn test_maintenance_above_full_scale_warns() {
        let mut config = MonitorConfig::default();
        config.gauge.maintenance_rul_hours = 600.0;
        let (_, warnings) = validate_physical_ranges(&config);
        assert!(warnings.iter().any(|w| w.field == "gauge.maintenance_rul_hours"));
    }
}
