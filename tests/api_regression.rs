//! API Regression Tests
//!
//! In-process tests that build the Axum app via `create_app()` and exercise
//! the /api/v1/* endpoints using `tower::ServiceExt::oneshot()`.
//! No binary spawn and no network port.

use compressor_monitor::api::{create_app, ApiState};
use compressor_monitor::condition_engine::{EngineSettings, FixedSampler};
use compressor_monitor::pipeline::AppState;
use compressor_monitor::storage::{ReadingHistory, StoredReading};
use compressor_monitor::types::{Reading, ReadingMessage, Verdict};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tower::ServiceExt;

fn create_test_state() -> ApiState {
    let (tx, _) = broadcast::channel(16);
    ApiState::new(
        Arc::new(RwLock::new(AppState::default())),
        tx,
        EngineSettings::default(),
        "test",
    )
}

fn reading(ax: f64, temp: f64, amp: f64, rul: f64) -> ReadingMessage {
    Reading {
        ax,
        ay: 0.0,
        az: 0.0,
        temp,
        amp,
        rul_predict: rul,
    }
    .into()
}

async fn feed(state: &ApiState, message: &ReadingMessage) {
    let mut app = state.app_state.write().await;
    let mut sampler = FixedSampler(false);
    app.dashboard
        .handle_reading(message, &state.settings, &mut sampler, Utc::now())
        .unwrap();
}

async fn get_json(state: ApiState, uri: &str) -> (StatusCode, serde_json::Value) {
    let resp = create_app(state)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

/// All v1 GET endpoints that need no storage return 200.
#[tokio::test]
async fn test_v1_get_endpoints_return_200() {
    let endpoints = [
        "/",
        "/health",
        "/api/v1/status",
        "/api/v1/live",
        "/api/v1/logs",
        "/api/v1/thresholds",
    ];

    for endpoint in &endpoints {
        let (status, json) = get_json(create_test_state(), endpoint).await;
        assert!(status.is_success(), "GET {endpoint} returned status {status}");
        assert!(json["data"].is_object(), "GET {endpoint} has no data object");
        assert_eq!(json["meta"]["version"], "1", "GET {endpoint} meta");
    }
}

/// A vibration fault shows up as WARNING on /live and at the head of /logs.
#[tokio::test]
async fn test_fault_reading_reaches_live_and_logs() {
    let state = create_test_state();
    feed(&state, &reading(0.1, 55.0, 2.0, 300.0)).await;
    feed(&state, &reading(1.5, 55.0, 2.0, 300.0)).await;

    let (_, live) = get_json(state.clone(), "/api/v1/live").await;
    assert_eq!(live["data"]["status"], "WARNING");
    assert_eq!(live["data"]["snapshot"]["verdict"]["category"], "vibration");
    assert_eq!(live["data"]["snapshot"]["peak_vibration"], 1.5);

    let (_, logs) = get_json(state, "/api/v1/logs").await;
    let entries = logs["data"]["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["status"], "WARNING");
    assert_eq!(entries[0]["message"], "High Vibration Detected");
    assert_eq!(logs["data"]["capacity"], 10);
}

/// A clean reading after a fault clears WARNING immediately.
#[tokio::test]
async fn test_status_clears_on_next_clean_reading() {
    let state = create_test_state();
    feed(&state, &reading(0.0, 65.0, 2.0, 50.0)).await;
    let (_, live) = get_json(state.clone(), "/api/v1/live").await;
    assert_eq!(live["data"]["status"], "WARNING");

    feed(&state, &reading(0.1, 55.0, 2.0, 300.0)).await;
    let (_, live) = get_json(state, "/api/v1/live").await;
    assert_eq!(live["data"]["status"], "OPTIMAL");
}

#[tokio::test]
async fn test_thresholds_endpoint_reports_defaults() {
    let (_, json) = get_json(create_test_state(), "/api/v1/thresholds").await;
    assert_eq!(json["data"]["thresholds"]["vibration_g"], 1.2);
    assert_eq!(json["data"]["thresholds"]["temperature_c"], 60.0);
    assert_eq!(json["data"]["thresholds"]["current_a"], 5.0);
    assert_eq!(json["data"]["gauge"]["rul_full_scale_hours"], 500.0);
}

/// POST /api/v1/reset empties the log and the snapshot.
#[tokio::test]
async fn test_reset_clears_dashboard() {
    let state = create_test_state();
    let mut rx = state.live_tx.subscribe();
    feed(&state, &reading(0.0, 0.0, 9.0, 200.0)).await;

    let resp = create_app(state.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/reset")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let (_, live) = get_json(state.clone(), "/api/v1/live").await;
    assert!(live["data"]["snapshot"].is_null());
    assert_eq!(live["data"]["status"], "OPTIMAL");

    let (_, logs) = get_json(state.clone(), "/api/v1/logs").await;
    assert!(logs["data"]["entries"].as_array().unwrap().is_empty());

    let (_, status) = get_json(state, "/api/v1/status").await;
    assert_eq!(status["data"]["stats"]["resets"], 1);

    let update = serde_json::to_value(rx.recv().await.unwrap()).unwrap();
    assert_eq!(update["type"], "reset");
    assert_eq!(update["reason"], "operator");
}

/// GET on the reset endpoint is not routed.
#[tokio::test]
async fn test_reset_requires_post() {
    let resp = create_app(create_test_state())
        .oneshot(Request::builder().uri("/api/v1/reset").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_history_unavailable_without_storage() {
    let (status, json) = get_json(create_test_state(), "/api/v1/history").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(json["error"]["code"].is_string());
}

/// History rows come back newest first and honour `limit`.
#[tokio::test]
async fn test_history_returns_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    let history = ReadingHistory::open(dir.path().join("history.db")).unwrap();
    let base = Utc::now();
    for (i, temp) in [50.0, 51.0, 62.0].into_iter().enumerate() {
        let r = reading(0.1, temp, 2.0, 300.0).reading;
        let verdict = if temp > 60.0 {
            Verdict::Fault {
                category: compressor_monitor::types::FaultCategory::Temperature,
                message: "Temp Elevated > 60°C".to_string(),
            }
        } else {
            Verdict::Normal
        };
        let at = base + chrono::Duration::milliseconds(i as i64 * 10);
        history.store(&StoredReading::new(r, &verdict, None, at)).unwrap();
    }

    let state = create_test_state().with_history(history);
    let (status, json) = get_json(state.clone(), "/api/v1/history?limit=2").await;
    assert_eq!(status, StatusCode::OK);
    let rows = json["data"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["temp"], 62.0);
    assert_eq!(rows[0]["status"], 1);
    assert_eq!(rows[1]["temp"], 51.0);

    let (status, json) = get_json(state.clone(), "/api/v1/history?faults=true").await;
    assert_eq!(status, StatusCode::OK);
    let rows = json["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["temp"], 62.0);

    let (status, _) = get_json(state, "/api/v1/history?limit=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_path_returns_enveloped_404() {
    let (status, json) = get_json(create_test_state(), "/api/v1/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"]["code"].is_string());
}
