//! Reading source abstraction.
//!
//! Provides a unified trait for reading compressor readings from different
//! places: a CSV replay, stdin (JSON lines), the board over TCP, or the
//! built-in mock board.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;

use crate::acquisition::BoardClient;
use crate::sensors::{generate_mock_reading, parse_json_reading};
use crate::types::ReadingMessage;

/// Events produced by a reading source.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadingEvent {
    /// A decoded reading.
    Reading(ReadingMessage),
    /// The upstream link was torn down and re-established. Everything
    /// derived from the previous session must be discarded.
    Reconnected,
    /// Source reached end of data (EOF for files/stdin).
    Eof,
}

/// Trait abstracting where readings come from.
///
/// Implementations handle decoding, reconnection, and pacing internally.
/// The processing loop calls [`next_reading`](ReadingSource::next_reading)
/// in a `select!` with cancellation.
#[async_trait]
pub trait ReadingSource: Send + 'static {
    /// Read the next event from the source.
    ///
    /// Returns `Err` on unrecoverable errors (e.g. failed reconnection).
    async fn next_reading(&mut self) -> Result<ReadingEvent>;

    /// Human-readable name for logging (e.g. "CSV", "stdin", "board-TCP").
    fn source_name(&self) -> &str;
}

// ============================================================================
// Replay Source (CSV file)
// ============================================================================

/// Replays pre-loaded readings with an optional inter-reading delay.
pub struct ReplaySource {
    readings: std::vec::IntoIter<ReadingMessage>,
    delay: Duration,
    yielded_first: bool,
}

impl ReplaySource {
    pub fn new(readings: Vec<ReadingMessage>, delay: Duration) -> Self {
        Self {
            readings: readings.into_iter(),
            delay,
            yielded_first: false,
        }
    }
}

#[async_trait]
impl ReadingSource for ReplaySource {
    async fn next_reading(&mut self) -> Result<ReadingEvent> {
        // No delay before the first reading
        if self.yielded_first && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.readings.next() {
            Some(r) => {
                self.yielded_first = true;
                Ok(ReadingEvent::Reading(r))
            }
            None => Ok(ReadingEvent::Eof),
        }
    }

    fn source_name(&self) -> &str {
        "CSV"
    }
}

// ============================================================================
// Stdin Source (JSON readings, one per line)
// ============================================================================

/// Reads JSON readings from any line-oriented async reader.
///
/// Used with the simulation harness:
/// `simulation --scenario full | compressor-monitor --stdin`
pub struct LineSource<R> {
    reader: R,
    line_buffer: Vec<u8>,
    name: &'static str,
}

/// Stdin flavour of [`LineSource`].
pub type StdinSource = LineSource<tokio::io::BufReader<tokio::io::Stdin>>;

impl StdinSource {
    pub fn new() -> Self {
        LineSource::from_reader(tokio::io::BufReader::new(tokio::io::stdin()), "stdin")
    }
}

impl Default for StdinSource {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> LineSource<R>
where
    R: tokio::io::AsyncBufRead + Unpin + Send + 'static,
{
    pub fn from_reader(reader: R, name: &'static str) -> Self {
        Self {
            reader,
            line_buffer: Vec::with_capacity(256),
            name,
        }
    }
}

#[async_trait]
impl<R> ReadingSource for LineSource<R>
where
    R: tokio::io::AsyncBufRead + Unpin + Send + 'static,
{
    async fn next_reading(&mut self) -> Result<ReadingEvent> {
        use tokio::io::AsyncBufReadExt;
        loop {
            self.line_buffer.clear();
            let bytes = self.reader.read_until(b'\n', &mut self.line_buffer).await?;
            if bytes == 0 {
                return Ok(ReadingEvent::Eof);
            }
            let line = match std::str::from_utf8(&self.line_buffer) {
                Ok(text) => text.trim(),
                Err(e) => {
                    tracing::warn!("[{}] Dropping non-UTF-8 line: {}", self.name, e);
                    continue;
                }
            };
            if line.is_empty() {
                continue;
            }
            match parse_json_reading(line) {
                Ok(message) => return Ok(ReadingEvent::Reading(message)),
                Err(e) => {
                    tracing::warn!("[{}] Failed to parse reading: {}", self.name, e);
                }
            }
        }
    }

    fn source_name(&self) -> &str {
        self.name
    }
}

// ============================================================================
// TCP Source (sensor board)
// ============================================================================

/// Reads JSON readings from the sensor board over TCP.
///
/// Wraps [`BoardClient`], which reconnects internally. A reading that
/// arrives over a fresh connection is preceded by
/// [`ReadingEvent::Reconnected`].
pub struct TcpSource {
    client: BoardClient,
    seen_reconnections: u64,
    pending: Option<ReadingMessage>,
}

impl TcpSource {
    /// Connect to the board and return a ready source.
    pub async fn connect(addr: &str) -> Result<Self> {
        Self::with_client(BoardClient::new(addr)).await
    }

    /// Connect using a pre-configured client.
    pub async fn with_client(mut client: BoardClient) -> Result<Self> {
        client
            .connect()
            .await
            .with_context(|| format!("sensor board at {} unreachable", client.addr()))?;
        Ok(Self {
            seen_reconnections: client.reconnections(),
            client,
            pending: None,
        })
    }
}

#[async_trait]
impl ReadingSource for TcpSource {
    async fn next_reading(&mut self) -> Result<ReadingEvent> {
        if let Some(message) = self.pending.take() {
            return Ok(ReadingEvent::Reading(message));
        }

        // On error the client has already exhausted its reconnect budget
        let message = self.client.read_message().await?;

        let reconnections = self.client.reconnections();
        if reconnections > self.seen_reconnections {
            self.seen_reconnections = reconnections;
            self.pending = Some(message);
            return Ok(ReadingEvent::Reconnected);
        }

        Ok(ReadingEvent::Reading(message))
    }

    fn source_name(&self) -> &str {
        "board-TCP"
    }
}

// ============================================================================
// Synthetic Source (mock board)
// ============================================================================

/// Mock board: random readings at a fixed rate, for demos without hardware.
pub struct SyntheticSource {
    rng: StdRng,
    interval: tokio::time::Interval,
    limit: Option<u64>,
    emitted: u64,
}

impl SyntheticSource {
    pub fn new(interval: Duration, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        let mut interval = tokio::time::interval(interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        Self {
            rng,
            interval,
            limit: None,
            emitted: 0,
        }
    }

    /// Stop with `Eof` after `n` readings.
    pub fn with_limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }
}

#[async_trait]
impl ReadingSource for SyntheticSource {
    async fn next_reading(&mut self) -> Result<ReadingEvent> {
        if self.limit.is_some_and(|n| self.emitted >= n) {
            return Ok(ReadingEvent::Eof);
        }
        self.interval.tick().await;
        self.emitted += 1;
        Ok(ReadingEvent::Reading(generate_mock_reading(&mut self.rng, Utc::now())))
    }

    fn source_name(&self) -> &str {
        "synthetic"
    }
}
