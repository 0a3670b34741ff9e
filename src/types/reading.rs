//! Sensor reading types

use serde::{Deserialize, Serialize};

/// One sample from the compressor board.
///
/// All six numeric channels are required on the wire. Extra fields sent by
/// the board (e.g. its own `status` flag) are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Acceleration, X axis (g)
    pub ax: f64,
    /// Acceleration, Y axis (g)
    pub ay: f64,
    /// Acceleration, Z axis (g)
    pub az: f64,
    /// Motor temperature (°C)
    pub temp: f64,
    /// Motor current (A)
    pub amp: f64,
    /// Predicted remaining useful life (hours)
    pub rul_predict: f64,
}

impl Reading {
    /// Named channel values, in wire order.
    pub fn channels(&self) -> [(&'static str, f64); 6] {
        [
            ("ax", self.ax),
            ("ay", self.ay),
            ("az", self.az),
            ("temp", self.temp),
            ("amp", self.amp),
            ("rul_predict", self.rul_predict),
        ]
    }
}

/// A reading as delivered by a source, with the board's own timestamp text
/// when it sent one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub reading: Reading,
}

impl From<Reading> for ReadingMessage {
    fn from(reading: Reading) -> Self {
        Self {
            timestamp: None,
            reading,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_board_message() {
        let json = r#"{"timestamp":"2025-01-10 12:00:00.123","ax":0.1,"ay":-0.2,"az":1.0,
            "temp":50.5,"amp":4.2,"rul_predict":300,"status":0}"#;
        let msg: ReadingMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.timestamp.as_deref(), Some("2025-01-10 12:00:00.123"));
        assert_eq!(msg.reading.ay, -0.2);
        assert_eq!(msg.reading.rul_predict, 300.0);
    }

    #[test]
    fn test_missing_field_rejected() {
        let json = r#"{"ax":0.1,"ay":0.1,"az":0.1,"temp":50.0,"amp":2.0}"#;
        assert!(serde_json::from_str::<ReadingMessage>(json).is_err());
    }

    #[test]
    fn test_non_numeric_field_rejected() {
        let json = r#"{"ax":"high","ay":0.1,"az":0.1,"temp":50.0,"amp":2.0,"rul_predict":1}"#;
        assert!(serde_json::from_str::<ReadingMessage>(json).is_err());
    }
}
