//! API route handlers
//!
//! Every handler takes a read lock on the shared [`AppState`] except the
//! operator reset, which takes the write lock between two readings.

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

use super::envelope::{ApiErrorResponse, ApiResponse};
use crate::condition_engine::{DisplaySnapshot, EngineSettings};
use crate::pipeline::{AppState, LiveUpdate, ProcessingStats, ResetReason};
use crate::storage::{HistoryStats, ReadingHistory};
use crate::types::{LogEntry, SystemStatus};

/// Default and maximum row counts for `/history`.
const DEFAULT_HISTORY_LIMIT: usize = 100;
const MAX_HISTORY_LIMIT: usize = 1_000;

// ============================================================================
// API State
// ============================================================================

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Application state from the pipeline
    pub app_state: Arc<RwLock<AppState>>,
    /// Reading history, `None` when storage is disabled
    pub history: Option<ReadingHistory>,
    /// Live updates fan-out (WebSocket clients subscribe)
    pub live_tx: broadcast::Sender<LiveUpdate>,
    /// Active thresholds and gauge settings
    pub settings: EngineSettings,
    /// Input mode label ("synthetic", "stdin", "tcp", "csv")
    pub mode: String,
}

impl ApiState {
    pub fn new(
        app_state: Arc<RwLock<AppState>>,
        live_tx: broadcast::Sender<LiveUpdate>,
        settings: EngineSettings,
        mode: impl Into<String>,
    ) -> Self {
        Self {
            app_state,
            history: None,
            live_tx,
            settings,
            mode: mode.into(),
        }
    }

    pub fn with_history(mut self, history: ReadingHistory) -> Self {
        self.history = Some(history);
        self
    }
}

// ============================================================================
// Root / Health
// ============================================================================

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub status: &'static str,
    pub mode: String,
    pub version: &'static str,
    pub uptime_seconds: u64,
}

/// GET / and GET /health
pub async fn root(State(state): State<ApiState>) -> Response {
    let uptime_seconds = state.app_state.read().await.uptime_secs();
    ApiResponse::ok(RootResponse {
        status: "Running",
        mode: state.mode.clone(),
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds,
    })
}

// ============================================================================
// Status
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub machine: String,
    pub system_status: SystemStatus,
    pub source: String,
    pub uptime_secs: u64,
    pub last_reading_at: Option<DateTime<Utc>>,
    pub log_entries: usize,
    pub stats: ProcessingStats,
    /// `None` when storage is disabled
    pub history: Option<HistoryStats>,
}

/// GET /api/v1/status
pub async fn get_status(State(state): State<ApiState>) -> Response {
    let app = state.app_state.read().await;
    ApiResponse::ok(StatusResponse {
        machine: app.machine_name.clone(),
        system_status: app.dashboard.status(),
        source: app.source_name.clone(),
        uptime_secs: app.uptime_secs(),
        last_reading_at: app.last_reading_at,
        log_entries: app.dashboard.event_log().len(),
        stats: app.stats,
        history: state.history.as_ref().map(ReadingHistory::stats),
    })
}

// ============================================================================
// Live
// ============================================================================

#[derive(Debug, Serialize)]
pub struct LiveResponse {
    pub status: SystemStatus,
    /// `None` until the first reading arrives (and after a reset)
    pub snapshot: Option<DisplaySnapshot>,
}

/// GET /api/v1/live
pub async fn get_live(State(state): State<ApiState>) -> Response {
    let app = state.app_state.read().await;
    ApiResponse::ok(LiveResponse {
        status: app.dashboard.status(),
        snapshot: app.dashboard.latest().cloned(),
    })
}

// ============================================================================
// Event Log
// ============================================================================

#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub capacity: usize,
    /// Newest first
    pub entries: Vec<LogEntry>,
}

/// GET /api/v1/logs
pub async fn get_logs(State(state): State<ApiState>) -> Response {
    let app = state.app_state.read().await;
    let log = app.dashboard.event_log();
    ApiResponse::ok(LogsResponse {
        capacity: log.capacity(),
        entries: log.to_vec(),
    })
}

/// GET /api/v1/thresholds
pub async fn get_thresholds(State(state): State<ApiState>) -> Response {
    ApiResponse::ok(state.settings)
}

// ============================================================================
// History
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
    /// Only rows whose verdict was a fault
    #[serde(default)]
    pub faults: bool,
}

/// GET /api/v1/history?limit=100&faults=true
pub async fn get_history(
    State(state): State<ApiState>,
    Query(q): Query<HistoryQuery>,
) -> Response {
    let Some(history) = state.history.clone() else {
        return ApiErrorResponse::service_unavailable("Reading history storage is disabled");
    };

    let limit = q.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    if limit == 0 {
        return ApiErrorResponse::bad_request("limit must be > 0");
    }
    let limit = limit.min(MAX_HISTORY_LIMIT);

    // sled reads are blocking
    let faults_only = q.faults;
    let rows = tokio::task::spawn_blocking(move || {
        if faults_only {
            history.recent_faults(limit)
        } else {
            history.recent(limit)
        }
    });
    match rows.await {
        Ok(Ok(rows)) => ApiResponse::ok(rows),
        Ok(Err(e)) => ApiErrorResponse::from(e).into_response(),
        Err(e) => ApiErrorResponse::internal(format!("History task failed: {e}")),
    }
}

// ============================================================================
// Reset
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub status: SystemStatus,
    pub resets: u64,
}

/// POST /api/v1/reset - clear the display state and event log
pub async fn reset_dashboard(State(state): State<ApiState>) -> Response {
    let response = {
        let mut app = state.app_state.write().await;
        app.reset_dashboard(ResetReason::Operator);
        ResetResponse {
            status: app.dashboard.status(),
            resets: app.stats.resets,
        }
    };
    let _ = state.live_tx.send(LiveUpdate::Reset { reason: ResetReason::Operator });
    ApiResponse::ok(response)
}

/// Fallback for unknown paths.
pub async fn not_found() -> Response {
    ApiErrorResponse::not_found("No such endpoint")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition_engine::FixedSampler;
    use crate::types::Reading;

    fn create_test_state() -> ApiState {
        let (tx, _) = broadcast::channel(8);
        ApiState::new(
            Arc::new(RwLock::new(AppState::default())),
            tx,
            EngineSettings::default(),
            "test",
        )
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_root_reports_running_and_mode() {
        let v = body_json(root(State(create_test_state())).await).await;
        assert_eq!(v["data"]["status"], "Running");
        assert_eq!(v["data"]["mode"], "test");
    }

    #[tokio::test]
    async fn test_live_empty_before_first_reading() {
        let v = body_json(get_live(State(create_test_state())).await).await;
        assert_eq!(v["data"]["status"], "OPTIMAL");
        assert!(v["data"]["snapshot"].is_null());
    }

    #[tokio::test]
    async fn test_reset_publishes_and_counts() {
        let state = create_test_state();
        let mut rx = state.live_tx.subscribe();
        {
            let mut app = state.app_state.write().await;
            let msg = Reading { ax: 1.5, ay: 0.0, az: 0.0, temp: 55.0, amp: 2.0, rul_predict: 300.0 }.into();
            app.dashboard
                .handle_reading(&msg, &state.settings, &mut FixedSampler(false), Utc::now())
                .unwrap();
        }

        let v = body_json(reset_dashboard(State(state.clone())).await).await;
        assert_eq!(v["data"]["status"], "OPTIMAL");
        assert_eq!(v["data"]["resets"], 1);
        assert_eq!(rx.recv().await.unwrap(), LiveUpdate::Reset { reason: ResetReason::Operator });
        assert!(state.app_state.read().await.dashboard.event_log().is_empty());
    }

    #[tokio::test]
    async fn test_history_unavailable_without_storage() {
        let resp = get_history(State(create_test_state()), Query(HistoryQuery::default())).await;
        assert_eq!(resp.status(), axum::http::StatusCode::SERVICE_UNAVAILABLE);
    }
}
