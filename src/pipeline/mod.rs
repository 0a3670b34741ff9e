//! Reading Pipeline
//!
//! ```text
//! ReadingSource ──► ProcessingLoop ──► DashboardState (validate, classify, admit)
//!                        │
//!                        ├──► ReadingHistory (sled, optional)
//!                        └──► broadcast<LiveUpdate> ──► WebSocket clients
//! ```
//!
//! A reconnect event from the source clears the dashboard state before the
//! next reading is processed.

mod state;
pub mod source;
pub mod processing_loop;

pub use state::*;
pub use processing_loop::{ProcessingLoop, RetentionPolicy};
