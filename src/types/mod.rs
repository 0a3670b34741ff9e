//! Shared data structures for compressor condition monitoring
//!
//! This module defines the core types flowing through the monitor:
//! - Reading: one decoded sensor sample (vibration, temperature, current, RUL)
//! - Thresholds: fixed fault limits
//! - Verdict / FaultCategory: classification outcome for one reading
//! - LogEntry / LogStatus: retained event log records
//! - SystemStatus / MaintenanceAdvice: coarse display state

mod reading;
pub mod thresholds;
mod verdict;
mod log_entry;

pub use reading::*;
pub use thresholds::*;
pub use verdict::*;
pub use log_entry::*;
