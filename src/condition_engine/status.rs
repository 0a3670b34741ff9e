//! Headline status aggregation
//!
//! Stateless: each reading fully determines the status, so one clean
//! reading clears a WARNING immediately.

use crate::types::{SystemStatus, Verdict};

/// Reduce a verdict to the machine-wide status.
pub fn aggregate_status(verdict: &Verdict) -> SystemStatus {
    if verdict.is_fault() {
        SystemStatus::Warning
    } else {
        SystemStatus::Optimal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FaultCategory;

    #[test]
    fn test_normal_is_optimal() {
        assert_eq!(aggregate_status(&Verdict::Normal), SystemStatus::Optimal);
    }

    #[test]
    fn test_every_fault_is_warning() {
        for category in [FaultCategory::Vibration, FaultCategory::Temperature, FaultCategory::Overcurrent] {
            let verdict = Verdict::Fault { category, message: String::new() };
            assert_eq!(aggregate_status(&verdict), SystemStatus::Warning);
        }
    }
}
