//! Tick sources for the mmsim backtester.
//!
//! This crate handles:
//! - Loading recorded ticks from JSON lines
//! - Ordering checks (the stream is never re-sorted)
//! - Seeded synthetic random-walk ticks

pub mod loader;
pub mod synthetic;

pub use loader::{load_json_lines, parse_json_lines, LoadStats};
pub use synthetic::{SyntheticConfig, SyntheticFeed};
