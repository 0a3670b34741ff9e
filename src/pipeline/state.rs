//! Application State
//!
//! Shared state for the monitor, written by the processing loop and read by
//! the API handlers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;

use crate::condition_engine::{DashboardState, DisplaySnapshot, EventLog};
use crate::types::{LogEntry, SystemStatus};

// ============================================================================
// Application State
// ============================================================================

/// Shared application state, wrapped in `Arc<RwLock<>>`.
///
/// The processing loop is the only writer except for the operator reset.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Latest display state and event log
    pub dashboard: DashboardState,

    /// Running counters
    pub stats: ProcessingStats,

    /// Process start
    pub uptime: Instant,

    /// Machine tag from config
    pub machine_name: String,

    /// Active reading source ("synthetic", "stdin", "board-TCP", "CSV")
    pub source_name: String,

    /// Arrival time of the last accepted reading
    pub last_reading_at: Option<DateTime<Utc>>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(EventLog::default(), "AIR-COMPRESSOR-01", "none")
    }
}

impl AppState {
    pub fn new(event_log: EventLog, machine_name: impl Into<String>, source_name: impl Into<String>) -> Self {
        Self {
            dashboard: DashboardState::new(event_log),
            stats: ProcessingStats::default(),
            uptime: Instant::now(),
            machine_name: machine_name.into(),
            source_name: source_name.into(),
            last_reading_at: None,
        }
    }

    /// Clear the display state and event log, counting the reset.
    pub fn reset_dashboard(&mut self, reason: ResetReason) {
        self.dashboard.reset();
        self.last_reading_at = None;
        self.stats.resets += 1;
        tracing::info!(reason = %reason, resets = self.stats.resets, "Dashboard state reset");
    }

    pub fn uptime_secs(&self) -> u64 {
        self.uptime.elapsed().as_secs()
    }

    /// Snapshot message for a newly connected WebSocket client.
    pub fn live_snapshot(&self) -> LiveUpdate {
        LiveUpdate::Snapshot {
            status: self.dashboard.status(),
            latest: self.dashboard.latest().cloned(),
            logs: self.dashboard.log_entries(),
        }
    }
}

// ============================================================================
// Counters
// ============================================================================

/// Processing counters, reported by the status endpoint and at shutdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProcessingStats {
    /// Readings accepted and classified
    pub readings_processed: u64,
    /// Readings rejected for non-finite values
    pub readings_rejected: u64,
    /// Readings classified as a fault
    pub faults_detected: u64,
    /// Entries admitted to the event log
    pub log_entries_admitted: u64,
    /// Dashboard resets (reconnect or operator)
    pub resets: u64,
    /// Readings persisted to history
    pub readings_stored: u64,
    /// History writes that failed
    pub storage_errors: u64,
}

/// Why the dashboard state was cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetReason {
    /// Upstream connection re-established
    Reconnected,
    /// `POST /api/v1/reset`
    Operator,
    /// Source gave up; nothing on screen is current any more
    SourceLost,
}

impl std::fmt::Display for ResetReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResetReason::Reconnected => write!(f, "reconnected"),
            ResetReason::Operator => write!(f, "operator"),
            ResetReason::SourceLost => write!(f, "source lost"),
        }
    }
}

// ============================================================================
// Live Updates
// ============================================================================

/// Message pushed to WebSocket clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveUpdate {
    /// Full state, sent once on connect
    Snapshot {
        status: SystemStatus,
        latest: Option<DisplaySnapshot>,
        logs: Vec<LogEntry>,
    },
    /// One processed reading
    Reading {
        snapshot: DisplaySnapshot,
        admitted: bool,
        logs: Vec<LogEntry>,
    },
    /// Dashboard state was cleared
    Reset { reason: ResetReason },
}
