//! Core types and configuration for the mmsim backtester.
//!
//! This crate provides shared types used across all other crates:
//! - Market data ticks, orders and trades
//! - P&L history records
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use types::*;
