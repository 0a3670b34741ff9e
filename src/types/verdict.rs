//! Classification outcome types: FaultCategory, Verdict, SystemStatus

use serde::{Deserialize, Serialize};

/// Message attached to every NORMAL verdict.
pub const ROUTINE_MESSAGE: &str = "Routine check. All parameters within optimal range.";

/// Fault category, in detection priority order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FaultCategory {
    /// At least one axis exceeded the vibration limit
    Vibration,
    /// Motor temperature above limit
    Temperature,
    /// Motor current above limit
    Overcurrent,
}

impl std::fmt::Display for FaultCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FaultCategory::Vibration => write!(f, "Vibration"),
            FaultCategory::Temperature => write!(f, "Temperature"),
            FaultCategory::Overcurrent => write!(f, "Overcurrent"),
        }
    }
}

/// Classification of one reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Verdict {
    Normal,
    Fault {
        category: FaultCategory,
        message: String,
    },
}

impl Verdict {
    pub fn is_fault(&self) -> bool {
        matches!(self, Verdict::Fault { .. })
    }

    pub fn category(&self) -> Option<FaultCategory> {
        match self {
            Verdict::Normal => None,
            Verdict::Fault { category, .. } => Some(*category),
        }
    }

    /// Operator-facing message.
    pub fn message(&self) -> &str {
        match self {
            Verdict::Normal => ROUTINE_MESSAGE,
            Verdict::Fault { message, .. } => message,
        }
    }
}

/// Headline status shown for the whole machine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SystemStatus {
    #[default]
    Optimal,
    Warning,
}

impl std::fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SystemStatus::Optimal => write!(f, "OPTIMAL"),
            SystemStatus::Warning => write!(f, "WARNING"),
        }
    }
}

/// Maintenance recommendation derived from the predicted RUL.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceAdvice {
    /// No immediate maintenance required
    Healthy,
    /// Schedule inspection immediately
    MaintenanceRequired,
}
