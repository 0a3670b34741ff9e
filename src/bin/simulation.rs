//! Compressor Board Simulation
//!
//! Generates compressor sensor readings for exercising the monitor without
//! hardware. Two scenarios are available:
//! - `random`: the mock board's uniform generator
//! - `full`: a phased run through normal operation, excessive vibration,
//!   overheating, overcurrent and recovery
//!
//! # Usage
//! ```bash
//! ./simulation --minutes 5 --speed 20 | ./compressor-monitor --stdin
//! ./simulation --format csv --speed 1000 --quiet > readings.csv
//! ```

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use clap::{Parser, ValueEnum};
use rand::prelude::*;
use rand_distr::{Distribution, Normal, NormalError};
use std::io::{self, Write};
use std::time::{Duration, Instant};

use compressor_monitor::sensors::{generate_mock_reading, BOARD_TIMESTAMP_FORMAT, CSV_HEADER};
use compressor_monitor::types::{Reading, ReadingMessage};

// ============================================================================
// Compressor Constants
// ============================================================================

/// Resting acceleration on the horizontal axes (g)
const BASE_LATERAL_G: f64 = 0.3;
/// Gravity on the vertical axis (g)
const BASE_VERTICAL_G: f64 = 1.0;
/// Motor temperature under normal load (°C)
const BASE_TEMP_C: f64 = 50.0;
/// Motor current under normal load (A)
const BASE_AMP: f64 = 4.0;
/// RUL reported by a freshly serviced machine (hours)
const FRESH_RUL_HOURS: f64 = 450.0;
/// RUL reached at the end of the overcurrent phase (hours)
const WORN_RUL_HOURS: f64 = 80.0;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Scenario {
    /// Uniform values from the mock board generator
    Random,
    /// Phased fault scenario
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

#[derive(Parser, Debug)]
#[command(name = "compressor-simulation")]
#[command(about = "Compressor board simulation for monitor testing")]
#[command(version = "1.0")]
struct Args {
    /// Simulated duration in minutes (1-1440)
    #[arg(short, long, default_value = "10", value_parser = clap::value_parser!(u32).range(1..=1440))]
    minutes: u32,

    /// Time compression factor (1 = real-time, 100 = 100x faster)
    #[arg(short, long, default_value = "10", value_parser = clap::value_parser!(u32).range(1..=1000))]
    speed: u32,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Suppress mission log (only output sensor data)
    #[arg(short, long)]
    quiet: bool,

    /// Board sample rate in Hz
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(u32).range(1..=1000))]
    sample_rate: u32,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Scenario to simulate
    #[arg(long, value_enum, default_value = "full")]
    scenario: Scenario,
}

// ============================================================================
// Simulation Phases
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Healthy machine (0-40%)
    Normal,
    /// Loose mounting or bearing wear (40-55%)
    Vibration,
    /// Cooling failure (55-70%)
    Overheating,
    /// Motor overload (70-85%)
    Overcurrent,
    /// After maintenance (85-100%)
    Recovery,
}

impl Phase {
    const fn name(self) -> &'static str {
        match self {
            Self::Normal => "Normal Operation",
            Self::Vibration => "Excessive Vibration (Bearing Wear)",
            Self::Overheating => "Overheating (Cooling Failure)",
            Self::Overcurrent => "Overcurrent (Motor Overload)",
            Self::Recovery => "Recovery (Post-Maintenance)",
        }
    }

    const fn expectation(self) -> &'static str {
        match self {
            Self::Normal | Self::Recovery => "Expected: status NORMAL, sampled log entries",
            Self::Vibration => "Expected: FAULT on vibration, every reading logged",
            Self::Overheating => "Expected: FAULT on temperature",
            Self::Overcurrent => "Expected: FAULT on current, maintenance advised",
        }
    }

    fn from_progress(progress: f64) -> Self {
        match progress {
            p if p < 0.40 => Self::Normal,
            p if p < 0.55 => Self::Vibration,
            p if p < 0.70 => Self::Overheating,
            p if p < 0.85 => Self::Overcurrent,
            _ => Self::Recovery,
        }
    }
}

// ============================================================================
// Simulation State
// ============================================================================

struct SimulationState {
    rng: StdRng,
    scenario: Scenario,
    current_phase: Phase,
    sim_time_seconds: f64,
    total_duration_seconds: f64,
    started_at: DateTime<Utc>,
    readings_generated: u64,
    fault_readings: u64,
    small_noise: Normal<f64>,
    medium_noise: Normal<f64>,
}

impl SimulationState {
    fn new(minutes: u32, scenario: Scenario, seed: Option<u64>) -> Result<Self, NormalError> {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            rng,
            scenario,
            current_phase: Phase::Normal,
            sim_time_seconds: 0.0,
            total_duration_seconds: f64::from(minutes) * 60.0,
            started_at: Utc::now(),
            readings_generated: 0,
            fault_readings: 0,
            small_noise: Normal::new(0.0, 0.02)?,
            medium_noise: Normal::new(0.0, 0.1)?,
        })
    }

    fn progress(&self) -> f64 {
        self.sim_time_seconds / self.total_duration_seconds
    }

    fn update_phase(&mut self) -> bool {
        let new_phase = Phase::from_progress(self.progress());
        if new_phase == self.current_phase {
            false
        } else {
            self.current_phase = new_phase;
            true
        }
    }

    fn timestamp(&self) -> DateTime<Utc> {
        // Millisecond resolution is all the board reports.
        self.started_at + ChronoDuration::milliseconds((self.sim_time_seconds * 1000.0) as i64)
    }

    /// Fraction of the way through the current phase's window.
    fn phase_progress(&self, start: f64, end: f64) -> f64 {
        ((self.progress() - start) / (end - start)).clamp(0.0, 1.0)
    }

    /// RUL declines linearly until maintenance at the start of recovery.
    fn rul_hours(&self) -> f64 {
        if self.current_phase == Phase::Recovery {
            FRESH_RUL_HOURS
        } else {
            let wear = (self.progress() / 0.85).clamp(0.0, 1.0);
            FRESH_RUL_HOURS - (FRESH_RUL_HOURS - WORN_RUL_HOURS) * wear
        }
    }

    fn phased_reading(&mut self) -> Reading {
        let small = self.small_noise.sample(&mut self.rng);
        let medium = self.medium_noise.sample(&mut self.rng);

        let mut reading = Reading {
            ax: BASE_LATERAL_G * (1.0 + medium),
            ay: -BASE_LATERAL_G * (1.0 + medium),
            az: BASE_VERTICAL_G * (1.0 + small),
            temp: BASE_TEMP_C * (1.0 + small),
            amp: BASE_AMP * (1.0 + small),
            rul_predict: self.rul_hours() * (1.0 + small * 0.1),
        };

        match self.current_phase {
            Phase::Normal | Phase::Recovery => {}
            Phase::Vibration => {
                // Lateral amplitude grows from 0.5 g to 1.8 g over the phase.
                let ramp = self.phase_progress(0.40, 0.55);
                let amplitude = 0.5 + 1.3 * ramp;
                let sign = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
                reading.ax = sign * amplitude * (1.0 + medium);
                reading.ay = -sign * amplitude * 0.8 * (1.0 + medium);
            }
            Phase::Overheating => {
                let ramp = self.phase_progress(0.55, 0.70);
                reading.temp = (BASE_TEMP_C + 25.0 * ramp) * (1.0 + small);
            }
            Phase::Overcurrent => {
                let ramp = self.phase_progress(0.70, 0.85);
                reading.temp = (BASE_TEMP_C + 5.0) * (1.0 + small);
                reading.amp = (BASE_AMP + 3.0 * ramp) * (1.0 + small);
            }
        }

        reading
    }

    fn generate_reading(&mut self) -> ReadingMessage {
        let at = self.timestamp();
        let message = match self.scenario {
            Scenario::Random => generate_mock_reading(&mut self.rng, at),
            Scenario::Full => ReadingMessage {
                timestamp: Some(at.format(BOARD_TIMESTAMP_FORMAT).to_string()),
                reading: round_reading(self.phased_reading()),
            },
        };

        self.readings_generated += 1;
        if self.current_phase != Phase::Normal && self.current_phase != Phase::Recovery {
            self.fault_readings += 1;
        }
        message
    }
}

/// Round to the precision the board reports.
fn round_reading(r: Reading) -> Reading {
    Reading {
        ax: round_to(r.ax, 3),
        ay: round_to(r.ay, 3),
        az: round_to(r.az, 3),
        temp: round_to(r.temp, 1),
        amp: round_to(r.amp, 2),
        rul_predict: r.rul_predict.round(),
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

fn csv_line(message: &ReadingMessage) -> String {
    let r = &message.reading;
    format!(
        "{},{},{},{},{},{},{}",
        message.timestamp.as_deref().unwrap_or_default(),
        r.ax,
        r.ay,
        r.az,
        r.temp,
        r.amp,
        r.rul_predict
    )
}

// ============================================================================
// Logging Utilities
// ============================================================================

fn format_time(seconds: f64) -> String {
    let hours = (seconds / 3600.0) as u32;
    let minutes = ((seconds % 3600.0) / 60.0) as u32;
    let secs = (seconds % 60.0) as u32;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

fn log_mission(time: f64, message: &str, quiet: bool) {
    if !quiet {
        eprintln!("[{}] {}", format_time(time), message);
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut state = SimulationState::new(args.minutes, args.scenario, args.seed)?;

    let sample_rate = f64::from(args.sample_rate);
    let total_samples = (state.total_duration_seconds * sample_rate) as u64;
    let sample_interval_real = Duration::from_secs_f64(1.0 / (sample_rate * f64::from(args.speed)));
    let sample_interval_sim = 1.0 / sample_rate;

    log_mission(0.0, &"=".repeat(70), args.quiet);
    log_mission(0.0, "COMPRESSOR BOARD SIMULATION v1.0", args.quiet);
    log_mission(0.0, &"=".repeat(70), args.quiet);
    log_mission(0.0, "", args.quiet);
    log_mission(0.0, "MACHINE PARAMETERS:", args.quiet);
    log_mission(0.0, &format!("  Motor Temperature: {BASE_TEMP_C:.0} °C"), args.quiet);
    log_mission(0.0, &format!("  Motor Current: {BASE_AMP:.1} A"), args.quiet);
    log_mission(0.0, &format!("  RUL at start: {FRESH_RUL_HOURS:.0} h"), args.quiet);
    log_mission(0.0, "", args.quiet);
    log_mission(0.0, "SIMULATION PARAMETERS:", args.quiet);
    log_mission(0.0, &format!("  Scenario: {:?}", args.scenario), args.quiet);
    log_mission(
        0.0,
        &format!("  Duration: {} minutes ({} samples)", args.minutes, total_samples),
        args.quiet,
    );
    log_mission(0.0, &format!("  Speed: {}x compression", args.speed), args.quiet);
    log_mission(0.0, &format!("  Sample rate: {} Hz", args.sample_rate), args.quiet);
    if let Some(seed) = args.seed {
        log_mission(0.0, &format!("  Random seed: {seed}"), args.quiet);
    }
    if args.scenario == Scenario::Full {
        log_mission(0.0, "", args.quiet);
        log_mission(0.0, "SCENARIO PHASES:", args.quiet);
        log_mission(0.0, "  0-40%:   Normal Operation", args.quiet);
        log_mission(0.0, "  40-55%:  Excessive Vibration", args.quiet);
        log_mission(0.0, "  55-70%:  Overheating", args.quiet);
        log_mission(0.0, "  70-85%:  Overcurrent", args.quiet);
        log_mission(0.0, "  85-100%: Recovery", args.quiet);
    }
    log_mission(0.0, &"=".repeat(70), args.quiet);
    log_mission(0.0, "SIMULATION START", args.quiet);
    log_mission(0.0, &"=".repeat(70), args.quiet);

    let stdout = io::stdout();
    let mut stdout_lock = stdout.lock();

    if args.format == OutputFormat::Csv {
        writeln!(stdout_lock, "{CSV_HEADER}")?;
    }

    let start_time = Instant::now();
    let mut last_log_percent = 0;

    while state.sim_time_seconds < state.total_duration_seconds {
        let loop_start = Instant::now();

        if args.scenario == Scenario::Full && state.update_phase() {
            log_mission(state.sim_time_seconds, "", args.quiet);
            log_mission(
                state.sim_time_seconds,
                &format!(">>> PHASE: {}", state.current_phase.name()),
                args.quiet,
            );
            log_mission(
                state.sim_time_seconds,
                &format!("    {}", state.current_phase.expectation()),
                args.quiet,
            );
            log_mission(state.sim_time_seconds, "", args.quiet);
        }

        let message = state.generate_reading();

        let current_percent = (state.progress() * 100.0) as u32 / 10 * 10;
        if current_percent > last_log_percent && current_percent <= 100 {
            let r = &message.reading;
            log_mission(
                state.sim_time_seconds,
                &format!(
                    "Progress: {}% | Temp: {:.1}°C | Amp: {:.2}A | RUL: {:.0}h",
                    current_percent, r.temp, r.amp, r.rul_predict
                ),
                args.quiet,
            );
            last_log_percent = current_percent;
        }

        match args.format {
            OutputFormat::Json => writeln!(stdout_lock, "{}", serde_json::to_string(&message)?)?,
            OutputFormat::Csv => writeln!(stdout_lock, "{}", csv_line(&message))?,
        }
        // The monitor reads line by line, so each reading must reach it now.
        stdout_lock.flush()?;

        state.sim_time_seconds += sample_interval_sim;

        let elapsed = loop_start.elapsed();
        if elapsed < sample_interval_real {
            std::thread::sleep(sample_interval_real - elapsed);
        }
    }

    log_mission(state.sim_time_seconds, "", args.quiet);
    log_mission(state.sim_time_seconds, &"=".repeat(70), args.quiet);
    log_mission(state.sim_time_seconds, "SIMULATION COMPLETE", args.quiet);
    log_mission(
        state.sim_time_seconds,
        &format!("  Readings generated: {}", state.readings_generated),
        args.quiet,
    );
    if args.scenario == Scenario::Full {
        log_mission(
            state.sim_time_seconds,
            &format!("  Readings in fault phases: {}", state.fault_readings),
            args.quiet,
        );
    }
    log_mission(
        state.sim_time_seconds,
        &format!("  Wall time: {:.1}s", start_time.elapsed().as_secs_f64()),
        args.quiet,
    );
    log_mission(state.sim_time_seconds, &"=".repeat(70), args.quiet);

    Ok(())
}
