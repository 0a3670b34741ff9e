//! Compressor Monitor: air compressor condition monitoring
//!
//! Classifies each sensor-board reading (vibration, temperature, current,
//! predicted RUL) against fixed limits, keeps a short event log and serves
//! the live dashboard state over HTTP and WebSocket.
//!
//! ## Architecture
//!
//! - **Condition engine**: pure per-reading classification, event log and display state
//! - **Pipeline**: reading sources and the single-writer processing loop
//! - **Storage**: sled-backed reading history with retention cleanup
//! - **API**: axum router with the `{data, meta}` envelope and a live WebSocket feed

pub mod acquisition;
pub mod api;
pub mod condition_engine;
pub mod config;
pub mod pipeline;
pub mod sensors;
pub mod storage;
pub mod types;

// Re-export configuration
pub use config::MonitorConfig;

// Re-export commonly used types
pub use types::{
    FaultCategory, LogEntry, LogStatus, MaintenanceAdvice, Reading, ReadingMessage, SystemStatus,
    Thresholds, Verdict,
};

// Re-export the engine
pub use condition_engine::{
    classify, DashboardState, DisplaySnapshot, EngineSettings, EventLog, ReadingError,
};

// Re-export storage
pub use storage::{ReadingHistory, StorageError, StoredReading};
