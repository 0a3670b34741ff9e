//! Event log record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Verdict;

/// Status column of a log entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogStatus {
    Normal,
    Warning,
}

impl From<&Verdict> for LogStatus {
    fn from(verdict: &Verdict) -> Self {
        if verdict.is_fault() {
            LogStatus::Warning
        } else {
            LogStatus::Normal
        }
    }
}

/// One retained event for operator review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Admission time
    pub timestamp: DateTime<Utc>,
    pub status: LogStatus,
    pub message: String,
    /// RUL carried by the reading (hours)
    pub rul: f64,
}
