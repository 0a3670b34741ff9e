//! Sensor Board TCP Client
//!
//! The board (or the bridge in front of it) publishes one JSON reading per
//! line:
//!
//! `{"timestamp":"2024-05-01 10:00:00.123","ax":0.12,"ay":-0.4,"az":1.01,"temp":52.3,"amp":4.21,"rul_predict":310}`
//!
//! The client reconnects with exponential backoff when the stream times out
//! or the peer closes it. Malformed lines are dropped with a warning.

use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::Instant;

use crate::sensors::parse_json_reading;
use crate::types::ReadingMessage;

/// Reading source errors
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Timeout waiting for data")]
    Timeout,

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Reconnection failed after {attempts} attempts")]
    ReconnectExhausted { attempts: u32 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read timeout per line. The board publishes at 10 Hz, so 30 s of silence
/// means the link is dead.
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Connect timeout for each attempt.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum reconnection attempts before giving up.
const MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Initial reconnection delay (doubles each attempt).
const INITIAL_RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Maximum reconnection delay cap.
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(60);

/// Board TCP client with reconnection and timeout resilience
pub struct BoardClient {
    addr: String,
    stream: Option<BufReader<TcpStream>>,
    line_buffer: Vec<u8>,
    read_timeout: Duration,
    initial_reconnect_delay: Duration,
    max_reconnect_attempts: u32,
    last_data: Option<Instant>,
    messages_received: u64,
    reconnections: u64,
    timeouts: u64,
    malformed_lines: u64,
}

impl BoardClient {
    /// Create a client for `host:port` with default settings
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            stream: None,
            line_buffer: Vec::with_capacity(256),
            read_timeout: DEFAULT_READ_TIMEOUT,
            initial_reconnect_delay: INITIAL_RECONNECT_DELAY,
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
            last_data: None,
            messages_received: 0,
            reconnections: 0,
            timeouts: 0,
            malformed_lines: 0,
        }
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Override the backoff schedule (initial delay, attempt budget).
    pub fn with_reconnect_policy(mut self, initial_delay: Duration, max_attempts: u32) -> Self {
        self.initial_reconnect_delay = initial_delay;
        self.max_reconnect_attempts = max_attempts;
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Connect to the board with timeout
    pub async fn connect(&mut self) -> Result<(), SourceError> {
        if self.stream.is_some() {
            return Ok(());
        }

        tracing::info!(address = %self.addr, "Connecting to sensor board");

        let stream = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| SourceError::Timeout)?
            .map_err(|e| SourceError::ConnectionFailed(e.to_string()))?;

        self.stream = Some(BufReader::new(stream));
        self.last_data = Some(Instant::now());

        tracing::info!(address = %self.addr, "Sensor board connection established");
        Ok(())
    }

    pub async fn disconnect(&mut self) {
        if let Some(mut reader) = self.stream.take() {
            let _ = reader.get_mut().shutdown().await;
            tracing::info!("Sensor board connection closed");
        }
    }

    /// Reconnect with exponential backoff.
    pub async fn reconnect(&mut self) -> Result<(), SourceError> {
        self.disconnect().await;

        for attempt in 1..=self.max_reconnect_attempts {
            let delay = self
                .initial_reconnect_delay
                .saturating_mul(2u32.saturating_pow(attempt - 1))
                .min(MAX_RECONNECT_DELAY);

            tracing::warn!(
                attempt = attempt,
                max_attempts = self.max_reconnect_attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "Sensor board reconnecting after failure"
            );

            tokio::time::sleep(delay).await;

            match self.connect().await {
                Ok(()) => {
                    self.reconnections += 1;
                    tracing::info!(
                        attempt = attempt,
                        total_reconnections = self.reconnections,
                        "Sensor board reconnection successful"
                    );
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(attempt = attempt, error = %e, "Reconnection attempt failed");
                }
            }
        }

        tracing::error!(
            max_attempts = self.max_reconnect_attempts,
            "Sensor board reconnection exhausted, all attempts failed"
        );
        Err(SourceError::ReconnectExhausted {
            attempts: self.max_reconnect_attempts,
        })
    }

    /// Read the next reading, reconnecting on timeout or connection drop.
    ///
    /// Returns `Err` only when reconnection is exhausted or a non-recoverable
    /// error occurs.
    pub async fn read_message(&mut self) -> Result<ReadingMessage, SourceError> {
        if self.stream.is_none() {
            self.connect().await?;
        }

        loop {
            match self.read_message_inner().await {
                Ok(message) => {
                    self.last_data = Some(Instant::now());
                    self.messages_received += 1;
                    return Ok(message);
                }
                Err(SourceError::Timeout) => {
                    self.timeouts += 1;
                    tracing::warn!(
                        timeout_secs = self.read_timeout.as_secs(),
                        total_timeouts = self.timeouts,
                        "Sensor board read timeout, attempting reconnect"
                    );
                    self.reconnect().await?;
                }
                Err(SourceError::ConnectionClosed | SourceError::Io(_)) => {
                    tracing::warn!("Sensor board connection lost, attempting reconnect");
                    self.reconnect().await?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Inner read with timeout; does NOT reconnect.
    async fn read_message_inner(&mut self) -> Result<ReadingMessage, SourceError> {
        let reader = self
            .stream
            .as_mut()
            .ok_or_else(|| SourceError::ConnectionFailed("Not connected".to_string()))?;

        loop {
            self.line_buffer.clear();

            // Raw bytes: a non-UTF-8 line is skipped, not a dead connection
            let bytes = tokio::time::timeout(
                self.read_timeout,
                reader.read_until(b'\n', &mut self.line_buffer),
            )
            .await
            .map_err(|_| SourceError::Timeout)??;

            if bytes == 0 {
                return Err(SourceError::ConnectionClosed);
            }

            let line = match std::str::from_utf8(&self.line_buffer) {
                Ok(text) => text.trim(),
                Err(e) => {
                    self.malformed_lines += 1;
                    tracing::warn!(error = %e, "Dropping non-UTF-8 board message");
                    continue;
                }
            };
            if line.is_empty() {
                continue;
            }

            match parse_json_reading(line) {
                Ok(message) => return Ok(message),
                Err(e) => {
                    self.malformed_lines += 1;
                    tracing::warn!(error = %e, "Dropping malformed board message");
                }
            }
        }
    }

    /// Total successful reconnections since creation
    pub fn reconnections(&self) -> u64 {
        self.reconnections
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Connection health statistics
    pub fn stats(&self) -> BoardClientStats {
        BoardClientStats {
            connected: self.is_connected(),
            messages_received: self.messages_received,
            reconnections: self.reconnections,
            timeouts: self.timeouts,
            malformed_lines: self.malformed_lines,
            last_data_secs_ago: self.last_data.map(|t| t.elapsed().as_secs()),
        }
    }
}

/// Connection health snapshot
#[derive(Debug, Clone, serde::Serialize)]
pub struct BoardClientStats {
    pub connected: bool,
    pub messages_received: u64,
    pub reconnections: u64,
    pub timeouts: u64,
    pub malformed_lines: u64,
    pub last_data_secs_ago: Option<u64>,
}
