//! Bounded event log
//!
//! Newest entry first, at most `capacity` entries. Every fault verdict is
//! admitted; NORMAL verdicts are sampled so the log shows periodic
//! "all clear" evidence without being flooded by routine readings.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::types::{LogEntry, LogStatus, Reading, Verdict};

/// Default event log capacity
pub const DEFAULT_CAPACITY: usize = 10;

/// Default admission probability for NORMAL verdicts
pub const NORMAL_SAMPLE_RATE: f64 = 0.05;

/// Decides whether a NORMAL verdict makes it into the log.
pub trait AdmissionSampler: Send {
    /// Return `true` with probability `rate`.
    fn admit_normal(&mut self, rate: f64) -> bool;
}

/// Uniform random sampler.
pub struct RandomSampler {
    rng: StdRng,
}

impl RandomSampler {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible sampler for tests and replays.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl AdmissionSampler for RandomSampler {
    fn admit_normal(&mut self, rate: f64) -> bool {
        self.rng.gen::<f64>() < rate
    }
}

/// Sampler with a fixed answer.
#[derive(Debug, Clone, Copy)]
pub struct FixedSampler(pub bool);

impl AdmissionSampler for FixedSampler {
    fn admit_normal(&mut self, _rate: f64) -> bool {
        self.0
    }
}

/// Capacity-bounded, newest-first history of notable verdicts.
#[derive(Debug, Clone)]
pub struct EventLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    normal_sample_rate: f64,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, NORMAL_SAMPLE_RATE)
    }
}

impl EventLog {
    pub fn new(capacity: usize, normal_sample_rate: f64) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
            normal_sample_rate,
        }
    }

    /// Apply the admission rule for one classified reading.
    ///
    /// Returns `true` when an entry was added.
    pub fn admit(
        &mut self,
        verdict: &Verdict,
        reading: &Reading,
        at: DateTime<Utc>,
        sampler: &mut dyn AdmissionSampler,
    ) -> bool {
        if !verdict.is_fault() && !sampler.admit_normal(self.normal_sample_rate) {
            return false;
        }

        self.entries.push_front(LogEntry {
            timestamp: at,
            status: LogStatus::from(verdict),
            message: verdict.message().to_string(),
            rul: reading.rul_predict,
        });
        self.entries.truncate(self.capacity);
        true
    }

    /// Entries, newest first.
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
