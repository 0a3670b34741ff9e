//! Condition Engine Module
//!
//! Deterministic per-reading logic for compressor condition monitoring.
//! Nothing here performs I/O or touches shared state.
//!
//! ## Per-reading path
//! - `validate_reading()` - Reject non-finite channels
//! - `classify()` - Fixed-priority fault verdict (vibration > temperature > current)
//! - `EventLog::admit()` - Bounded, newest-first event history
//! - `aggregate_status()` - Headline OPTIMAL / WARNING
//! - `DashboardState::handle_reading()` - All of the above, in order
//!
//! ## Derived metrics
//! - `peak_vibration()` - Largest axis magnitude
//! - `rul_gauge_fraction()` / `rul_gauge_offset()` - RUL gauge geometry
//! - `maintenance_advice()` - Healthy vs. inspection required

pub mod classifier;
pub mod dashboard;
pub mod event_log;
pub mod status;

pub use classifier::{
    classify, is_vibration_high, maintenance_advice, peak_vibration, rul_gauge_fraction,
    rul_gauge_offset, validate_reading,
};
pub use dashboard::{DashboardState, DisplaySnapshot, EngineSettings, GaugeGeometry, ReadingOutcome};
pub use event_log::{
    AdmissionSampler, EventLog, FixedSampler, RandomSampler, DEFAULT_CAPACITY, NORMAL_SAMPLE_RATE,
};
pub use status::aggregate_status;

use thiserror::Error;

/// Reading rejected at the engine boundary
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ReadingError {
    #[error("Invalid reading: field '{field}' is not a finite number (got {value})")]
    InvalidReading { field: &'static str, value: f64 },
}
