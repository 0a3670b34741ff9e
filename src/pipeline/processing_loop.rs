//! Reading processing loop shared across all input modes.
//!
//! One reading is taken to completion (validate, classify, admit, display
//! update, persist, broadcast) before the next one is pulled from the source.

use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::source::{ReadingEvent, ReadingSource};
use super::{AppState, LiveUpdate, ProcessingStats, ResetReason};
use crate::condition_engine::{AdmissionSampler, EngineSettings};
use crate::config::defaults::PROGRESS_LOG_INTERVAL;
use crate::storage::{ReadingHistory, StoredReading};
use crate::types::ReadingMessage;

/// When and how far back the history cleaner prunes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub retention_days: u32,
    /// Run every N processed readings
    pub cleanup_every: u64,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            retention_days: crate::config::defaults::RETENTION_DAYS,
            cleanup_every: crate::config::defaults::CLEANUP_EVERY_READINGS,
        }
    }
}

/// Owns everything the per-reading path needs.
///
/// Built with [`new()`](ProcessingLoop::new), optionally given a history
/// store and a live-update channel, then consumed by
/// [`run()`](ProcessingLoop::run).
pub struct ProcessingLoop {
    app_state: Arc<RwLock<AppState>>,
    settings: EngineSettings,
    sampler: Box<dyn AdmissionSampler>,
    cancel_token: CancellationToken,
    history: Option<ReadingHistory>,
    retention: RetentionPolicy,
    live_tx: Option<broadcast::Sender<LiveUpdate>>,
}

impl ProcessingLoop {
    pub fn new(
        app_state: Arc<RwLock<AppState>>,
        settings: EngineSettings,
        sampler: Box<dyn AdmissionSampler>,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            app_state,
            settings,
            sampler,
            cancel_token,
            history: None,
            retention: RetentionPolicy::default(),
            live_tx: None,
        }
    }

    /// Persist every processed reading and prune by `retention`.
    pub fn with_history(mut self, history: ReadingHistory, retention: RetentionPolicy) -> Self {
        self.history = Some(history);
        self.retention = retention;
        self
    }

    /// Publish a [`LiveUpdate`] per reading and per reset.
    pub fn with_live_updates(mut self, tx: broadcast::Sender<LiveUpdate>) -> Self {
        self.live_tx = Some(tx);
        self
    }

    /// Run until the source is exhausted or cancellation.
    ///
    /// Returns the final counters. A source error clears the dashboard,
    /// publishes a reset and is returned so the caller can fail the task.
    pub async fn run<S: ReadingSource + ?Sized>(
        mut self,
        source: &mut S,
    ) -> anyhow::Result<ProcessingStats> {
        info!("Processing readings from {}...", source.source_name());

        loop {
            let result = tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!("[ReadingProcessor] Shutdown signal received");
                    break;
                }
                result = source.next_reading() => result,
            };

            let event = match result {
                Ok(ev) => ev,
                Err(e) => {
                    error!("[ReadingProcessor] Source error: {:#}", e);
                    let stats = {
                        let mut app = self.app_state.write().await;
                        app.reset_dashboard(ResetReason::SourceLost);
                        app.stats
                    };
                    self.publish(LiveUpdate::Reset { reason: ResetReason::SourceLost });
                    log_final_stats(&stats);
                    return Err(e.context(format!("{} source lost", source.source_name())));
                }
            };

            match event {
                ReadingEvent::Reading(message) => self.process(&message).await,
                ReadingEvent::Reconnected => {
                    self.app_state.write().await.reset_dashboard(ResetReason::Reconnected);
                    self.publish(LiveUpdate::Reset { reason: ResetReason::Reconnected });
                }
                ReadingEvent::Eof => {
                    let processed = self.app_state.read().await.stats.readings_processed;
                    info!(
                        "[ReadingProcessor] Source reached end ({} readings processed)",
                        processed
                    );
                    break;
                }
            }
        }

        let stats = self.app_state.read().await.stats;
        log_final_stats(&stats);
        Ok(stats)
    }

    async fn process(&mut self, message: &ReadingMessage) {
        let at = Utc::now();

        let (outcome, snapshot, logs, processed) = {
            let mut state = self.app_state.write().await;
            let outcome = match state.dashboard.handle_reading(
                message,
                &self.settings,
                self.sampler.as_mut(),
                at,
            ) {
                Ok(outcome) => outcome,
                Err(_) => {
                    // Already logged by the dashboard; state unchanged
                    state.stats.readings_rejected += 1;
                    return;
                }
            };

            state.last_reading_at = Some(at);
            let stats = &mut state.stats;
            stats.readings_processed += 1;
            if outcome.verdict.is_fault() {
                stats.faults_detected += 1;
            }
            if outcome.admitted {
                stats.log_entries_admitted += 1;
            }
            let processed = stats.readings_processed;

            let snapshot = state.dashboard.latest().cloned();
            let logs = state.dashboard.log_entries();
            (outcome, snapshot, logs, processed)
        };

        if let Some(ref history) = self.history {
            let row = StoredReading::new(message.reading, &outcome.verdict, message.timestamp.clone(), at);
            let stored = history.store(&row);
            let mut state = self.app_state.write().await;
            match stored {
                Ok(()) => state.stats.readings_stored += 1,
                Err(e) => {
                    state.stats.storage_errors += 1;
                    warn!("Failed to persist reading to history: {}", e);
                }
            }
        }

        if let Some(snapshot) = snapshot {
            self.publish(LiveUpdate::Reading {
                snapshot,
                admitted: outcome.admitted,
                logs,
            });
        }

        if self.retention.cleanup_every > 0 && processed % self.retention.cleanup_every == 0 {
            self.cleanup_history();
        }

        if processed % PROGRESS_LOG_INTERVAL == 0 {
            let state = self.app_state.read().await;
            info!(
                "Progress: {} readings | Faults: {} | Rejected: {} | Status: {}",
                processed,
                state.stats.faults_detected,
                state.stats.readings_rejected,
                state.dashboard.status()
            );
        }
    }

    fn cleanup_history(&self) {
        let Some(ref history) = self.history else {
            return;
        };
        let cutoff = Utc::now() - ChronoDuration::days(i64::from(self.retention.retention_days));
        match history.cleanup_before(cutoff) {
            Ok(0) => debug!("[HistoryCleaner] Nothing older than {} days", self.retention.retention_days),
            Ok(deleted) => info!(
                "[HistoryCleaner] Deleted {} readings older than {} days",
                deleted, self.retention.retention_days
            ),
            Err(e) => warn!("[HistoryCleaner] Cleanup failed: {}", e),
        }
    }

    fn publish(&self, update: LiveUpdate) {
        if let Some(ref tx) = self.live_tx {
            // No subscribers is fine
            let _ = tx.send(update);
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn log_final_stats(stats: &ProcessingStats) {
    info!("");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("FINAL STATISTICS");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("   Readings Processed:   {}", stats.readings_processed);
    info!("   Readings Rejected:    {}", stats.readings_rejected);
    info!("   Faults Detected:      {}", stats.faults_detected);
    info!("   Log Entries Admitted: {}", stats.log_entries_admitted);
    info!("   Dashboard Resets:     {}", stats.resets);
    info!("   Readings Stored:      {}", stats.readings_stored);
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}
