//! Compressor Monitor - air compressor condition monitoring service
//!
//! Classifies sensor-board readings in real time and serves the live
//! dashboard state over HTTP and WebSocket.
//!
//! # Usage
//!
//! ```bash
//! # Run with the built-in mock board (10 Hz)
//! cargo run --release
//!
//! # Run with simulation input from stdin
//! simulation --scenario full | ./compressor-monitor --stdin
//!
//! # Connect to the sensor board bridge
//! ./compressor-monitor --tcp 192.168.1.50:9000
//!
//! # Replay a CSV export at 10x
//! ./compressor-monitor --csv readings.csv --speed 10
//! ```
//!
//! # Environment Variables
//!
//! - `COMPRESSOR_MONITOR_CONFIG`: Path to the TOML config file
//! - `COMPRESSOR_MONITOR_ADDR`: HTTP bind address (overridden by `--addr`)
//! - `COMPRESSOR_MONITOR_CORS_ORIGINS`: Comma-separated allowed origins
//! - `RUST_LOG`: Logging level (default: info)
//! - `RESET_DB`: Set to "true" to wipe the reading history on startup

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use axum::Router;
use compressor_monitor::api::{create_app, ApiState};
use compressor_monitor::condition_engine::{EventLog, RandomSampler};
use compressor_monitor::config::{defaults, MonitorConfig};
use compressor_monitor::pipeline::source::{
    ReadingSource, ReplaySource, StdinSource, SyntheticSource, TcpSource,
};
use compressor_monitor::pipeline::{AppState, ProcessingLoop, RetentionPolicy};
use compressor_monitor::sensors;
use compressor_monitor::storage::ReadingHistory;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "compressor-monitor")]
#[command(about = "Air compressor condition monitoring service")]
#[command(version)]
struct CliArgs {
    /// Read JSON readings from stdin instead of the mock board
    /// Use with the simulator: simulation | ./compressor-monitor --stdin
    #[arg(long)]
    stdin: bool,

    /// Connect to the sensor board over TCP (newline-delimited JSON)
    #[arg(long, value_name = "HOST:PORT")]
    tcp: Option<String>,

    /// Replay readings from a CSV file
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Speed multiplier for CSV replay (1 = 10 Hz, 10 = 100 Hz, 0 = no delay)
    #[arg(long, default_value = "1")]
    speed: u64,

    /// Seed for the mock board and log sampling (reproducible demos)
    #[arg(long)]
    seed: Option<u64>,

    /// Override the server address (default: "0.0.0.0:8000")
    #[arg(short, long, env = "COMPRESSOR_MONITOR_ADDR")]
    addr: Option<String>,

    /// Wipe the reading history on startup.
    /// Can also be set via RESET_DB=true environment variable.
    #[arg(long)]
    reset_db: bool,
}

// ============================================================================
// Database Reset
// ============================================================================

/// Check if history reset is requested via CLI flag or environment variable.
fn should_reset_db(cli_flag: bool) -> bool {
    if cli_flag {
        return true;
    }
    std::env::var("RESET_DB")
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// Remove the history database directory.
fn reset_history(path: &Path) -> Result<()> {
    if !path.exists() {
        info!("Reading history does not exist, nothing to reset");
        return Ok(());
    }

    warn!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    warn!("  RESET_DB DETECTED - WIPING READING HISTORY");
    warn!("  Removing: {}", path.display());
    warn!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    std::fs::remove_dir_all(path)
        .with_context(|| format!("Failed to remove {}", path.display()))?;
    Ok(())
}

/// Open the history store, or run without it when it cannot be opened.
fn open_history(config: &MonitorConfig) -> Option<ReadingHistory> {
    if !config.storage.enabled {
        info!("Reading history: disabled");
        return None;
    }

    let path = Path::new(&config.storage.path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = std::fs::create_dir_all(parent) {
            warn!(path = %parent.display(), error = %e, "Cannot create history directory, running without history");
            return None;
        }
    }

    match ReadingHistory::open(path) {
        Ok(history) => Some(history),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Cannot open reading history, running without history");
            None
        }
    }
}

// ============================================================================
// Task Names for Supervisor Logging
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum TaskName {
    HttpServer,
    ReadingProcessor,
}

impl std::fmt::Display for TaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskName::HttpServer => write!(f, "HttpServer"),
            TaskName::ReadingProcessor => write!(f, "ReadingProcessor"),
        }
    }
}

/// Spawn the HTTP server task into the JoinSet.
fn spawn_http_server(
    task_set: &mut JoinSet<Result<TaskName>>,
    listener: tokio::net::TcpListener,
    app: Router,
    cancel_token: CancellationToken,
) {
    task_set.spawn(async move {
        info!("[HttpServer] Task starting");

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                cancel_token.cancelled().await;
                info!("[HttpServer] Received shutdown signal");
            })
            .await;

        match result {
            Ok(()) => {
                info!("[HttpServer] Graceful shutdown complete");
                Ok(TaskName::HttpServer)
            }
            Err(e) => {
                error!("[HttpServer] Server error: {}", e);
                Err(anyhow::anyhow!("HTTP server error: {}", e))
            }
        }
    });
}

/// Run the supervisor loop: monitor tasks, cancel on failure.
async fn run_supervisor(
    task_set: &mut JoinSet<Result<TaskName>>,
    cancel_token: CancellationToken,
) -> Result<()> {
    info!("Supervisor: All tasks spawned, monitoring...");

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                info!("Supervisor: Shutdown signal received");
                break;
            }
            result = task_set.join_next() => {
                match result {
                    Some(Ok(Ok(task_name))) => {
                        info!("Supervisor: Task {} completed normally", task_name);
                    }
                    Some(Ok(Err(e))) => {
                        error!("Supervisor: Task failed with error: {}", e);
                        cancel_token.cancel();
                        return Err(e);
                    }
                    Some(Err(e)) => {
                        error!("Supervisor: Task panicked: {}", e);
                        cancel_token.cancel();
                        return Err(anyhow::anyhow!("Task panicked: {}", e));
                    }
                    None => {
                        info!("Supervisor: All tasks completed");
                        break;
                    }
                }
            }
        }
    }

    // Let the HTTP server drain
    while let Some(result) = task_set.join_next().await {
        if let Ok(Ok(task_name)) = result {
            info!("Supervisor: Task {} stopped", task_name);
        }
    }

    Ok(())
}

// ============================================================================
// Monitor Runner
// ============================================================================

/// Derive the log sampler's seed from `--seed`.
///
/// The mock board consumes the user seed directly; offsetting it here keeps
/// the sampler's draws independent of the generated readings.
fn sampler_seed(seed: u64) -> u64 {
    seed.wrapping_add(1)
}

/// Run the monitor with any reading source.
///
/// All input modes (mock board, stdin, TCP, CSV) flow through this function.
async fn run_monitor<S: ReadingSource>(
    mut source: S,
    mode: &str,
    config: &MonitorConfig,
    server_addr: &str,
    seed: Option<u64>,
    cancel_token: CancellationToken,
) -> Result<()> {
    let event_log = EventLog::new(config.event_log.capacity, config.event_log.normal_sample_rate);
    let app_state = Arc::new(RwLock::new(AppState::new(
        event_log,
        config.machine.name.clone(),
        source.source_name(),
    )));
    let settings = config.engine_settings();
    let history = open_history(config);
    let (live_tx, _) = broadcast::channel(defaults::LIVE_CHANNEL_CAPACITY);

    let mut api_state = ApiState::new(Arc::clone(&app_state), live_tx.clone(), settings, mode);
    if let Some(ref h) = history {
        api_state = api_state.with_history(h.clone());
    }
    let app = create_app(api_state);

    let listener = tokio::net::TcpListener::bind(server_addr)
        .await
        .with_context(|| format!("Failed to bind HTTP server to {server_addr}"))?;
    info!("Dashboard API listening on http://{}", server_addr);
    info!("   Live feed: ws://{}/ws/frontend", server_addr);

    info!("Supervisor: Initializing task monitoring");
    let mut task_set: JoinSet<Result<TaskName>> = JoinSet::new();

    // Task 1: HTTP Server
    spawn_http_server(&mut task_set, listener, app, cancel_token.clone());

    // Task 2: Reading Processor
    let sampler = match seed {
        Some(s) => RandomSampler::seeded(sampler_seed(s)),
        None => RandomSampler::new(),
    };
    let mut processing_loop = ProcessingLoop::new(
        Arc::clone(&app_state),
        settings,
        Box::new(sampler),
        cancel_token.clone(),
    )
    .with_live_updates(live_tx);
    if let Some(h) = history {
        processing_loop = processing_loop.with_history(
            h,
            RetentionPolicy {
                retention_days: config.storage.retention_days,
                cleanup_every: config.storage.cleanup_every,
            },
        );
    }

    task_set.spawn(async move {
        info!("[ReadingProcessor] Task starting");
        processing_loop.run(&mut source).await?;
        Ok(TaskName::ReadingProcessor)
    });

    run_supervisor(&mut task_set, cancel_token).await
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    let config = MonitorConfig::load();
    config.validate().context("Invalid monitor configuration")?;
    info!(
        "Machine: {} | Location: {} | Limits: vib {} g, temp {} °C, amp {} A",
        config.machine.name,
        if config.machine.location.is_empty() { "unset" } else { &config.machine.location },
        config.thresholds.vibration_g,
        config.thresholds.temperature_c,
        config.thresholds.current_a,
    );

    // Reset DB check, before the store is opened
    if should_reset_db(args.reset_db) {
        reset_history(Path::new(&config.storage.path))?;
    }

    let server_addr = args.addr.clone().unwrap_or_else(|| config.server.addr.clone());

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  Compressor Monitor");
    info!("  Air Compressor Condition Monitoring");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("");

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    if let Some(addr) = args.tcp {
        // --- TCP mode ---
        info!("Input: sensor board over TCP ({})", addr);
        let source = TcpSource::connect(&addr)
            .await
            .with_context(|| format!("Failed to connect to sensor board at {addr}"))?;
        run_monitor(source, "tcp", &config, &server_addr, args.seed, cancel_token).await?;
    } else if args.stdin {
        // --- Stdin mode ---
        info!("Input: stdin (JSON readings)");
        run_monitor(StdinSource::new(), "stdin", &config, &server_addr, args.seed, cancel_token).await?;
    } else if let Some(path) = args.csv {
        // --- CSV replay ---
        info!("Loading readings from CSV: {}", path.display());
        let readings = sensors::read_csv_data(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if readings.is_empty() {
            return Err(anyhow::anyhow!("No readings loaded from {}", path.display()));
        }
        let delay_ms = if args.speed == 0 { 0 } else { defaults::REPLAY_BASE_DELAY_MS / args.speed };
        info!(
            "Speed: {}x ({}ms delay between readings), {} readings queued",
            if args.speed == 0 { "max".to_string() } else { args.speed.to_string() },
            delay_ms,
            readings.len()
        );
        let source = ReplaySource::new(readings, Duration::from_millis(delay_ms));
        run_monitor(source, "csv", &config, &server_addr, args.seed, cancel_token).await?;
    } else {
        // --- Mock board ---
        info!("Input: mock board ({} ms interval)", defaults::SYNTHETIC_INTERVAL_MS);
        let source = SyntheticSource::new(Duration::from_millis(defaults::SYNTHETIC_INTERVAL_MS), args.seed);
        run_monitor(source, "synthetic", &config, &server_addr, args.seed, cancel_token).await?;
    }

    info!("");
    info!("Compressor Monitor shutdown complete");
    Ok(())
}
