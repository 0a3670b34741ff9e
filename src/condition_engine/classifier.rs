//! Reading classifier and derived display metrics
//!
//! Faults are checked in a fixed order and the first match wins:
//! 1. Vibration: any axis magnitude above the vibration limit
//! 2. Temperature: above the temperature limit
//! 3. Current: above the current limit

use crate::types::{gauge, FaultCategory, MaintenanceAdvice, Reading, Thresholds, Verdict};

use super::ReadingError;

/// Reject readings carrying NaN or infinite channels.
///
/// NaN compares false against every limit, so an unvalidated NaN reading
/// would silently classify as NORMAL.
pub fn validate_reading(reading: &Reading) -> Result<(), ReadingError> {
    for (field, value) in reading.channels() {
        if !value.is_finite() {
            return Err(ReadingError::InvalidReading { field, value });
        }
    }
    Ok(())
}

/// Classify one reading against the fault limits.
pub fn classify(reading: &Reading, thresholds: &Thresholds) -> Verdict {
    if is_vibration_high(reading, thresholds) {
        return Verdict::Fault {
            category: FaultCategory::Vibration,
            message: "High Vibration Detected".to_string(),
        };
    }

    if reading.temp > thresholds.temperature_c {
        return Verdict::Fault {
            category: FaultCategory::Temperature,
            message: format!("Temp Elevated > {}°C", thresholds.temperature_c),
        };
    }

    if reading.amp > thresholds.current_a {
        return Verdict::Fault {
            category: FaultCategory::Overcurrent,
            message: "Motor Overcurrent".to_string(),
        };
    }

    Verdict::Normal
}

/// Largest absolute acceleration across the three axes (g).
pub fn peak_vibration(reading: &Reading) -> f64 {
    reading.ax.abs().max(reading.ay.abs()).max(reading.az.abs())
}

/// Whether any axis exceeds the vibration limit.
pub fn is_vibration_high(reading: &Reading, thresholds: &Thresholds) -> bool {
    peak_vibration(reading) > thresholds.vibration_g
}

/// Fraction of the RUL gauge to fill, clamped to [0, 1].
pub fn rul_gauge_fraction(rul_predict: f64, full_scale_hours: f64) -> f64 {
    (rul_predict / full_scale_hours).clamp(0.0, 1.0)
}

/// Stroke offset of the RUL arc for a gauge of [`gauge::CIRCUMFERENCE`].
///
/// The fraction is clamped again so the offset stays within
/// `[0, CIRCUMFERENCE]` whatever the caller passes.
pub fn rul_gauge_offset(fraction: f64) -> f64 {
    gauge::CIRCUMFERENCE * (1.0 - fraction.clamp(0.0, 1.0))
}

/// Maintenance recommendation for a predicted RUL.
pub fn maintenance_advice(rul_predict: f64, maintenance_rul_hours: f64) -> MaintenanceAdvice {
    if rul_predict < maintenance_rul_hours {
        MaintenanceAdvice::MaintenanceRequired
    } else {
        MaintenanceAdvice::Healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::gauge::RUL_FULL_SCALE_HOURS;

    fn reading(ax: f64, ay: f64, az: f64, temp: f64, amp: f64, rul: f64) -> Reading {
        Reading { ax, ay, az, temp, amp, rul_predict: rul }
    }

    #[test]
    fn test_normal_reading() {
        let verdict = classify(&reading(0.1, 0.1, 0.1, 55.0, 2.0, 300.0), &Thresholds::default());
        assert_eq!(verdict, Verdict::Normal);
        assert_eq!(verdict.message(), "Routine check. All parameters within optimal range.");
    }

    #[test]
    fn test_vibration_on_any_axis() {
        let t = Thresholds::default();
        for r in [
            reading(1.5, 0.0, 0.0, 20.0, 1.0, 300.0),
            reading(0.0, -1.3, 0.0, 20.0, 1.0, 300.0),
            reading(0.0, 0.0, 1.21, 20.0, 1.0, 300.0),
        ] {
            let verdict = classify(&r, &t);
            assert_eq!(verdict.category(), Some(FaultCategory::Vibration));
            assert_eq!(verdict.message(), "High Vibration Detected");
        }
    }

    #[test]
    fn test_vibration_wins_over_temp_and_current() {
        let verdict = classify(&reading(-1.4, 0.0, 0.0, 90.0, 9.0, 10.0), &Thresholds::default());
        assert_eq!(verdict.category(), Some(FaultCategory::Vibration));
    }

    #[test]
    fn test_temperature_wins_over_current() {
        let verdict = classify(&reading(0.0, 0.0, 0.0, 65.0, 9.0, 50.0), &Thresholds::default());
        assert_eq!(verdict.category(), Some(FaultCategory::Temperature));
        assert_eq!(verdict.message(), "Temp Elevated > 60°C");
    }

    #[test]
    fn test_temperature_message_uses_configured_limit() {
        let t = Thresholds { temperature_c: 72.5, ..Thresholds::default() };
        let verdict = classify(&reading(0.0, 0.0, 0.0, 80.0, 1.0, 50.0), &t);
        assert_eq!(verdict.message(), "Temp Elevated > 72.5°C");
    }

    #[test]
    fn test_overcurrent() {
        let verdict = classify(&reading(0.2, 0.2, 1.0, 60.0, 5.01, 200.0), &Thresholds::default());
        assert_eq!(verdict.category(), Some(FaultCategory::Overcurrent));
        assert_eq!(verdict.message(), "Motor Overcurrent");
    }

    #[test]
    fn test_limits_are_exclusive() {
        let verdict = classify(&reading(1.2, -1.2, 1.2, 60.0, 5.0, 200.0), &Thresholds::default());
        assert_eq!(verdict, Verdict::Normal);
    }

    #[test]
    fn test_peak_vibration() {
        assert_eq!(peak_vibration(&reading(0.3, -0.9, 0.5, 0.0, 0.0, 0.0)), 0.9);
        assert_eq!(peak_vibration(&reading(-1.7, 1.1, 0.0, 0.0, 0.0, 0.0)), 1.7);
        assert_eq!(peak_vibration(&reading(0.0, 0.0, 0.0, 0.0, 0.0, 0.0)), 0.0);
    }

    #[test]
    fn test_rul_gauge_fraction_clamped() {
        let cases = [(-10.0, 0.0), (0.0, 0.0), (250.0, 0.5), (500.0, 1.0), (600.0, 1.0)];
        for (rul, expected) in cases {
            assert_eq!(rul_gauge_fraction(rul, RUL_FULL_SCALE_HOURS), expected, "rul = {rul}");
        }
    }

    #[test]
    fn test_rul_gauge_offset_bounds() {
        assert_eq!(rul_gauge_offset(0.0), 283.0);
        assert_eq!(rul_gauge_offset(1.0), 0.0);
        assert!((rul_gauge_offset(0.5) - 141.5).abs() < 1e-9);
        assert_eq!(rul_gauge_offset(1.2), 0.0);
        assert_eq!(rul_gauge_offset(-0.3), 283.0);
    }

    #[test]
    fn test_maintenance_advice() {
        assert_eq!(maintenance_advice(99.0, 100.0), MaintenanceAdvice::MaintenanceRequired);
        assert_eq!(maintenance_advice(100.0, 100.0), MaintenanceAdvice::Healthy);
        assert_eq!(maintenance_advice(350.0, 100.0), MaintenanceAdvice::Healthy);
    }

    #[test]
    fn test_validate_rejects_nan_and_infinity() {
        let err = validate_reading(&reading(0.1, f64::NAN, 0.1, 50.0, 2.0, 100.0)).unwrap_err();
        assert!(matches!(err, ReadingError::InvalidReading { field: "ay", .. }));

        let err = validate_reading(&reading(0.1, 0.1, 0.1, 50.0, 2.0, f64::INFINITY)).unwrap_err();
        assert!(matches!(err, ReadingError::InvalidReading { field: "rul_predict", .. }));

        assert!(validate_reading(&reading(-3.0, 0.1, 0.1, -20.0, 0.0, -5.0)).is_ok());
    }
}
