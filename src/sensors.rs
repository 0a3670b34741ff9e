//! Reading ingestion helpers: CSV files, JSON lines and the mock board generator

use chrono::{DateTime, Utc};
use rand::Rng;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::types::{Reading, ReadingMessage};

/// Header line written by the board logger and by `--export` tooling.
pub const CSV_HEADER: &str = "timestamp,ax,ay,az,temp,amp,rul_predict";

/// Timestamp format used by the board (millisecond precision).
pub const BOARD_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Read compressor readings from a CSV file.
///
/// Expected CSV format:
/// timestamp,ax,ay,az,temp,amp,rul_predict
///
/// The header line is optional. Extra trailing columns are ignored and an
/// empty timestamp column yields `timestamp: None`. Malformed lines are
/// skipped with a warning.
pub fn read_csv_data(path: &Path) -> std::io::Result<Vec<ReadingMessage>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut readings = Vec::new();

    for (idx, line_result) in reader.lines().enumerate() {
        let line_num = idx + 1;

        let line = match line_result {
            Ok(l) => l,
            Err(e) => {
                tracing::warn!(line = line_num, error = %e, "Error reading CSV line");
                continue;
            }
        };

        // Skip header line
        if line_num == 1 && line.starts_with("timestamp") {
            continue;
        }

        if line.trim().is_empty() {
            continue;
        }

        match parse_csv_line(&line) {
            Ok(message) => readings.push(message),
            Err(e) => {
                tracing::warn!(line = line_num, error = %e, "Error parsing CSV line");
            }
        }
    }

    tracing::info!(count = readings.len(), path = %path.display(), "Loaded readings from CSV");
    Ok(readings)
}

/// Parse a single CSV line into a reading message
fn parse_csv_line(line: &str) -> Result<ReadingMessage, String> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();

    if fields.len() < 7 {
        return Err(format!("Expected at least 7 fields, got {}", fields.len()));
    }

    let timestamp = Some(fields[0])
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    let reading = Reading {
        ax: parse_f64(fields[1], "ax")?,
        ay: parse_f64(fields[2], "ay")?,
        az: parse_f64(fields[3], "az")?,
        temp: parse_f64(fields[4], "temp")?,
        amp: parse_f64(fields[5], "amp")?,
        rul_predict: parse_f64(fields[6], "rul_predict")?,
    };

    Ok(ReadingMessage { timestamp, reading })
}

fn parse_f64(s: &str, field: &str) -> Result<f64, String> {
    s.parse::<f64>()
        .map_err(|e| format!("Failed to parse {field} '{s}': {e}"))
}

/// Decode one newline-delimited JSON reading as sent by the board.
pub fn parse_json_reading(line: &str) -> Result<ReadingMessage, serde_json::Error> {
    serde_json::from_str(line)
}

/// Generate one reading with the mock board's distributions.
///
/// Values are rounded to the precision the board reports.
pub fn generate_mock_reading<R: Rng>(rng: &mut R, at: DateTime<Utc>) -> ReadingMessage {
    let reading = Reading {
        ax: round_to(rng.gen_range(-1.5..=1.5), 3),
        ay: round_to(rng.gen_range(-1.5..=1.5), 3),
        az: round_to(rng.gen_range(0.9..=1.1), 3),
        temp: round_to(rng.gen_range(45.0..=65.0), 1),
        amp: round_to(rng.gen_range(3.5..=5.5), 2),
        rul_predict: rng.gen_range(50.0_f64..=400.0).round(),
    };

    ReadingMessage {
        timestamp: Some(at.format(BOARD_TIMESTAMP_FORMAT).to_string()),
        reading,
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::io::Write;

    #[test]
    fn test_read_csv_skips_header_and_bad_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{CSV_HEADER}").unwrap();
        writeln!(file, "2024-05-01 10:00:00.000,0.1,0.2,1.0,55.0,4.2,300").unwrap();
        writeln!(file, "2024-05-01 10:00:00.100,oops,0.2,1.0,55.0,4.2,300").unwrap();
        writeln!(file).unwrap();
        writeln!(file, ",1.5,0.0,0.0,55.0,2.0,300,1").unwrap();
        file.flush().unwrap();

        let readings = read_csv_data(file.path()).unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].timestamp.as_deref(), Some("2024-05-01 10:00:00.000"));
        assert_eq!(readings[0].reading.temp, 55.0);
        assert_eq!(readings[1].timestamp, None);
        assert_eq!(readings[1].reading.ax, 1.5);
    }

    #[test]
    fn test_read_csv_missing_file_is_error() {
        assert!(read_csv_data(Path::new("/nonexistent/readings.csv")).is_err());
    }

    #[test]
    fn test_short_line_rejected() {
        assert!(parse_csv_line("2024-05-01,0.1,0.2").is_err());
    }

    #[test]
    fn test_parse_json_reading_ignores_board_status() {
        let msg = parse_json_reading(
            r#"{"timestamp":"t","ax":0.1,"ay":0.2,"az":1.0,"temp":50,"amp":4,"rul_predict":200,"status":0}"#,
        )
        .unwrap();
        assert_eq!(msg.reading.rul_predict, 200.0);
    }

    #[test]
    fn test_mock_reading_within_ranges() {
        let mut rng = StdRng::seed_from_u64(7);
        let at = Utc::now();
        for _ in 0..1000 {
            let r = generate_mock_reading(&mut rng, at).reading;
            assert!((-1.5..=1.5).contains(&r.ax));
            assert!((-1.5..=1.5).contains(&r.ay));
            assert!((0.9..=1.1).contains(&r.az));
            assert!((45.0..=65.0).contains(&r.temp));
            assert!((3.5..=5.5).contains(&r.amp));
            assert!((50.0..=400.0).contains(&r.rul_predict));
            assert_eq!(r.rul_predict.fract(), 0.0);
        }
    }

    #[test]
    fn test_mock_timestamp_has_millis() {
        let mut rng = StdRng::seed_from_u64(1);
        let at = DateTime::<Utc>::from_timestamp_millis(1_714_557_600_123).unwrap();
        let msg = generate_mock_reading(&mut rng, at);
        assert_eq!(msg.timestamp.as_deref(), Some("2024-05-01 10:00:00.123"));
    }
}
