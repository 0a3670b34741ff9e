//! Sensor board data acquisition
//!
//! Handles newline-delimited JSON readings from the compressor board over TCP.

pub mod board_client;

pub use board_client::{BoardClient, BoardClientStats, SourceError};
