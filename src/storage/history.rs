//! Reading History Storage
//!
//! Persists every processed reading with its fault flag to sled.
//! Keys are `received_at` milliseconds (big-endian) followed by a sled
//! generated id, so readings arriving in the same millisecond never
//! overwrite each other and the tree sorts chronologically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::types::{Reading, Verdict};

/// Error type for storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One persisted reading row.
///
/// `status` is 1 when the reading produced a fault verdict, 0 otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReading {
    pub received_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_timestamp: Option<String>,
    #[serde(flatten)]
    pub reading: Reading,
    pub status: u8,
}

impl StoredReading {
    pub fn new(
        reading: Reading,
        verdict: &Verdict,
        source_timestamp: Option<String>,
        received_at: DateTime<Utc>,
    ) -> Self {
        Self {
            received_at,
            source_timestamp,
            reading,
            status: u8::from(verdict.is_fault()),
        }
    }

    pub fn is_fault(&self) -> bool {
        self.status != 0
    }
}

/// History storage for processed readings
#[derive(Clone)]
pub struct ReadingHistory {
    db: Arc<sled::Db>,
}

fn time_prefix(at: DateTime<Utc>) -> [u8; 8] {
    // Pre-epoch times sort first
    u64::try_from(at.timestamp_millis()).unwrap_or(0).to_be_bytes()
}

fn key_millis(key: &[u8]) -> Option<u64> {
    let prefix: [u8; 8] = key.get(..8)?.try_into().ok()?;
    Some(u64::from_be_bytes(prefix))
}

impl ReadingHistory {
    /// Open or create the history database at the specified path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path_ref = path.as_ref();
        let db = sled::open(path_ref)?;
        info!(path = %path_ref.display(), readings = db.len(), "Reading history opened");
        Ok(Self { db: Arc::new(db) })
    }

    /// Store a reading.
    ///
    /// Does not flush on every write; sled flushes in the background and
    /// at most the last few readings are lost on a crash.
    pub fn store(&self, row: &StoredReading) -> Result<(), StorageError> {
        let mut key = Vec::with_capacity(16);
        key.extend_from_slice(&time_prefix(row.received_at));
        key.extend_from_slice(&self.db.generate_id()?.to_be_bytes());

        let value = serde_json::to_vec(row)?;
        self.db.insert(key, value)?;
        Ok(())
    }

    /// Most recent `limit` readings, newest first.
    ///
    /// Rows that fail to decode are skipped with a warning.
    pub fn recent(&self, limit: usize) -> Result<Vec<StoredReading>, StorageError> {
        self.recent_matching(limit, |_| true)
    }

    /// Most recent `limit` fault readings, newest first.
    pub fn recent_faults(&self, limit: usize) -> Result<Vec<StoredReading>, StorageError> {
        self.recent_matching(limit, StoredReading::is_fault)
    }

    fn recent_matching(
        &self,
        limit: usize,
        keep: impl Fn(&StoredReading) -> bool,
    ) -> Result<Vec<StoredReading>, StorageError> {
        let mut rows = Vec::with_capacity(limit.min(1024));

        for item in self.db.iter().rev() {
            if rows.len() >= limit {
                break;
            }
            let (_key, value) = item?;
            match serde_json::from_slice::<StoredReading>(&value) {
                Ok(row) if keep(&row) => rows.push(row),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Skipping undecodable history row"),
            }
        }

        debug!(count = rows.len(), "Retrieved recent readings");
        Ok(rows)
    }

    /// Delete every reading received strictly before `cutoff`.
    pub fn cleanup_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StorageError> {
        let cutoff_key = time_prefix(cutoff);
        let keys: Vec<sled::IVec> = self
            .db
            .range(..cutoff_key.as_slice())
            .keys()
            .collect::<Result<_, _>>()?;

        for key in &keys {
            self.db.remove(key)?;
        }

        if !keys.is_empty() {
            self.db.flush()?;
        }

        Ok(keys.len())
    }

    /// Total number of stored readings
    pub fn count(&self) -> usize {
        self.db.len()
    }

    /// Database size in bytes
    pub fn size_bytes(&self) -> u64 {
        self.db.size_on_disk().unwrap_or(0)
    }

    pub fn stats(&self) -> HistoryStats {
        let edge = |item: Option<sled::Result<(sled::IVec, sled::IVec)>>| {
            item.and_then(Result::ok)
                .and_then(|(k, _)| key_millis(&k))
                .and_then(|ms| i64::try_from(ms).ok())
                .and_then(DateTime::<Utc>::from_timestamp_millis)
        };

        HistoryStats {
            reading_count: self.count(),
            size_bytes: self.size_bytes(),
            oldest: edge(self.db.iter().next()),
            newest: edge(self.db.iter().next_back()),
        }
    }
}

/// Storage statistics
#[derive(Debug, Clone, Serialize)]
pub struct HistoryStats {
    pub reading_count: usize,
    pub size_bytes: u64,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}
