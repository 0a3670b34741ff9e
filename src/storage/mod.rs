//! Persistent storage for processed readings.
//!
//! A single sled tree keyed by arrival time, so iteration order is
//! chronological and retention cleanup is a prefix range scan.

pub mod history;

pub use history::{HistoryStats, ReadingHistory, StorageError, StoredReading};
