//! System-wide default constants.
//!
//! Grouped by subsystem for easy discovery.

// ============================================================================
// Server
// ============================================================================

/// Default HTTP bind address.
pub const SERVER_ADDR: &str = "0.0.0.0:8000";

/// Capacity of the live-update broadcast channel (messages).
///
/// Slow WebSocket clients that fall further behind skip ahead.
pub const LIVE_CHANNEL_CAPACITY: usize = 64;

// ============================================================================
// Storage
// ============================================================================

/// Default reading history database path.
pub const STORAGE_PATH: &str = "./data/readings.db";

/// Readings older than this are deleted by the history cleaner (days).
pub const RETENTION_DAYS: u32 = 7;

/// Run retention cleanup every N processed readings.
pub const CLEANUP_EVERY_READINGS: u64 = 1_000;

// ============================================================================
// Processing
// ============================================================================

/// Emit a progress line every N readings.
pub const PROGRESS_LOG_INTERVAL: u64 = 100;

// ============================================================================
// Simulation / Replay
// ============================================================================

/// Mock board publish interval (ms). 100 ms = 10 Hz.
pub const SYNTHETIC_INTERVAL_MS: u64 = 100;

/// Base delay for `--speed` during CSV replay (ms).
pub const REPLAY_BASE_DELAY_MS: u64 = 100;
