//! Dashboard state and the per-reading update
//!
//! `DashboardState` is owned by exactly one controller (the processing
//! loop). Each reading is validated, classified, offered to the event log
//! and folded into the display snapshot before the next one is accepted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::types::{
    gauge, GaugeSettings, LogEntry, MaintenanceAdvice, Reading, ReadingMessage, SystemStatus,
    Thresholds, Verdict,
};

use super::classifier::{
    classify, is_vibration_high, maintenance_advice, peak_vibration, rul_gauge_fraction,
    rul_gauge_offset, validate_reading,
};
use super::event_log::{AdmissionSampler, EventLog};
use super::status::aggregate_status;
use super::ReadingError;

/// Fixed inputs to the per-reading update.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineSettings {
    pub thresholds: Thresholds,
    pub gauge: GaugeSettings,
}

/// RUL gauge geometry for the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaugeGeometry {
    /// Filled fraction in [0, 1]
    pub fraction: f64,
    pub dash_array: f64,
    /// Arc offset in [0, dash_array]
    pub dash_offset: f64,
}

impl GaugeGeometry {
    pub fn for_rul(rul_predict: f64, full_scale_hours: f64) -> Self {
        let fraction = rul_gauge_fraction(rul_predict, full_scale_hours);
        Self {
            fraction,
            dash_array: gauge::CIRCUMFERENCE,
            dash_offset: rul_gauge_offset(fraction),
        }
    }
}

/// Everything the presentation layer needs about the latest reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplaySnapshot {
    pub reading: Reading,
    /// Timestamp text sent by the board, if any
    pub source_timestamp: Option<String>,
    pub received_at: DateTime<Utc>,
    pub status: SystemStatus,
    pub verdict: Verdict,
    /// max(|ax|, |ay|, |az|) in g
    pub peak_vibration: f64,
    pub vibration_high: bool,
    pub rul_gauge: GaugeGeometry,
    pub maintenance: MaintenanceAdvice,
}

/// Result of applying one reading.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingOutcome {
    pub verdict: Verdict,
    pub status: SystemStatus,
    /// Whether the event log took an entry for this reading
    pub admitted: bool,
}

/// Latest display state plus the event log.
#[derive(Debug, Clone)]
pub struct DashboardState {
    latest: Option<DisplaySnapshot>,
    status: SystemStatus,
    event_log: EventLog,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::new(EventLog::default())
    }
}

impl DashboardState {
    pub fn new(event_log: EventLog) -> Self {
        Self {
            latest: None,
            status: SystemStatus::Optimal,
            event_log,
        }
    }

    /// Validate, classify and record one reading.
    ///
    /// An invalid reading leaves the state untouched.
    pub fn handle_reading(
        &mut self,
        message: &ReadingMessage,
        settings: &EngineSettings,
        sampler: &mut dyn AdmissionSampler,
        at: DateTime<Utc>,
    ) -> Result<ReadingOutcome, ReadingError> {
        let reading = &message.reading;
        if let Err(e) = validate_reading(reading) {
            warn!(error = %e, "Rejected reading");
            return Err(e);
        }

        let verdict = classify(reading, &settings.thresholds);
        let status = aggregate_status(&verdict);
        let admitted = self.event_log.admit(&verdict, reading, at, sampler);
        let peak = peak_vibration(reading);

        if let Some(category) = verdict.category() {
            warn!(
                category = %category,
                peak_g = peak,
                temp_c = reading.temp,
                amp_a = reading.amp,
                "{}",
                verdict.message()
            );
        } else {
            debug!(peak_g = peak, temp_c = reading.temp, amp_a = reading.amp, admitted, "Reading normal");
        }

        self.status = status;
        self.latest = Some(DisplaySnapshot {
            reading: *reading,
            source_timestamp: message.timestamp.clone(),
            received_at: at,
            status,
            verdict: verdict.clone(),
            peak_vibration: peak,
            vibration_high: is_vibration_high(reading, &settings.thresholds),
            rul_gauge: GaugeGeometry::for_rul(reading.rul_predict, settings.gauge.rul_full_scale_hours),
            maintenance: maintenance_advice(reading.rul_predict, settings.gauge.maintenance_rul_hours),
        });

        Ok(ReadingOutcome {
            verdict,
            status,
            admitted,
        })
    }

    /// Drop the latest reading and the event log (upstream reconnect or
    /// operator reset).
    pub fn reset(&mut self) {
        self.latest = None;
        self.status = SystemStatus::Optimal;
        self.event_log.clear();
    }

    pub fn latest(&self) -> Option<&DisplaySnapshot> {
        self.latest.as_ref()
    }

    pub fn status(&self) -> SystemStatus {
        self.status
    }

    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    /// Event log contents, newest first.
    pub fn log_entries(&self) -> Vec<LogEntry> {
        self.event_log.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition_engine::event_log::FixedSampler;
    use crate::types::{FaultCategory, LogStatus};

    fn msg(ax: f64, ay: f64, az: f64, temp: f64, amp: f64, rul: f64) -> ReadingMessage {
        Reading { ax, ay, az, temp, amp, rul_predict: rul }.into()
    }

    fn apply(state: &mut DashboardState, m: &ReadingMessage) -> ReadingOutcome {
        state
            .handle_reading(m, &EngineSettings::default(), &mut FixedSampler(false), Utc::now())
            .unwrap()
    }

    #[test]
    fn test_normal_scenario() {
        let mut state = DashboardState::default();
        let outcome = apply(&mut state, &msg(0.1, 0.1, 0.1, 55.0, 2.0, 300.0));

        assert_eq!(outcome.verdict, Verdict::Normal);
        assert_eq!(outcome.status, SystemStatus::Optimal);
        assert!(!outcome.admitted);
        assert_eq!(state.status(), SystemStatus::Optimal);

        let snap = state.latest().unwrap();
        assert!((snap.peak_vibration - 0.1).abs() < 1e-12);
        assert!(!snap.vibration_high);
        assert_eq!(snap.rul_gauge.fraction, 0.6);
        assert_eq!(snap.maintenance, MaintenanceAdvice::Healthy);
    }

    #[test]
    fn test_vibration_scenario() {
        let mut state = DashboardState::default();
        let outcome = apply(&mut state, &msg(1.5, 0.0, 0.0, 55.0, 2.0, 300.0));

        assert_eq!(outcome.verdict.category(), Some(FaultCategory::Vibration));
        assert_eq!(outcome.verdict.message(), "High Vibration Detected");
        assert_eq!(outcome.status, SystemStatus::Warning);
        assert!(outcome.admitted);

        let entries = state.log_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, LogStatus::Warning);
        assert_eq!(entries[0].rul, 300.0);
        assert!(state.latest().unwrap().vibration_high);
    }

    #[test]
    fn test_temperature_scenario() {
        let mut state = DashboardState::default();
        let outcome = apply(&mut state, &msg(0.0, 0.0, 0.0, 65.0, 2.0, 50.0));

        assert_eq!(outcome.verdict.category(), Some(FaultCategory::Temperature));
        assert_eq!(outcome.status, SystemStatus::Warning);
        let snap = state.latest().unwrap();
        assert_eq!(snap.maintenance, MaintenanceAdvice::MaintenanceRequired);
        assert_eq!(snap.rul_gauge.fraction, 0.1);
    }

    #[test]
    fn test_clean_reading_clears_warning() {
        let mut state = DashboardState::default();
        apply(&mut state, &msg(0.0, 0.0, 0.0, 70.0, 2.0, 200.0));
        assert_eq!(state.status(), SystemStatus::Warning);
        apply(&mut state, &msg(0.0, 0.0, 0.0, 40.0, 2.0, 200.0));
        assert_eq!(state.status(), SystemStatus::Optimal);
        // The fault stays in the log.
        assert_eq!(state.event_log().len(), 1);
    }

    #[test]
    fn test_invalid_reading_leaves_state() {
        let mut state = DashboardState::default();
        apply(&mut state, &msg(1.5, 0.0, 0.0, 55.0, 2.0, 300.0));
        let before = state.latest().cloned();

        let result = state.handle_reading(
            &msg(0.0, 0.0, 0.0, f64::NAN, 2.0, 300.0),
            &EngineSettings::default(),
            &mut FixedSampler(true),
            Utc::now(),
        );
        assert!(matches!(result, Err(ReadingError::InvalidReading { field: "temp", .. })));
        assert_eq!(state.latest().cloned(), before);
        assert_eq!(state.event_log().len(), 1);
        assert_eq!(state.status(), SystemStatus::Warning);
    }

    #[test]
    fn test_reset() {
        let mut state = DashboardState::default();
        for _ in 0..4 {
            apply(&mut state, &msg(0.0, 0.0, 0.0, 65.0, 6.0, 10.0));
        }
        state.reset();
        assert!(state.latest().is_none());
        assert!(state.event_log().is_empty());
        assert_eq!(state.status(), SystemStatus::Optimal);
    }

    #[test]
    fn test_source_timestamp_carried() {
        let mut state = DashboardState::default();
        let mut m = msg(0.0, 0.0, 1.0, 50.0, 4.0, 250.0);
        m.timestamp = Some("2025-01-10 08:00:00.000".to_string());
        apply(&mut state, &m);
        assert_eq!(
            state.latest().unwrap().source_timestamp.as_deref(),
            Some("2025-01-10 08:00:00.000")
        );
    }
}
