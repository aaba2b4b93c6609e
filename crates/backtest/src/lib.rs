//! Backtesting engine for the mmsim market-making simulator.
//!
//! This crate provides:
//! - Single-level order book and tick-driven fill simulation
//! - Slippage and rolling volatility models
//! - Inventory-aware market-making strategy
//! - Position ledger, P&L history and performance metrics
//! - Pluggable key-value cache for ticks and trades
//! - Latency recording and run reports

pub mod cache;
pub mod engine;
pub mod fill_model;
pub mod latency;
pub mod metrics;
pub mod order_book;
pub mod position;
pub mod report;
pub mod slippage;
pub mod strategy;
pub mod volatility;

pub use cache::{MarketDataCache, MemoryCache, NoopCache, SqliteCache};
pub use engine::BacktestEngine;
pub use fill_model::FillModel;
pub use latency::{LatencyRecorder, LatencySummary};
pub use metrics::{PerformanceAnalyzer, PerformanceMetrics};
pub use order_book::SimplifiedOrderBook;
pub use position::{PositionLedger, SymbolPosition};
pub use report::{BacktestReport, OrderStats};
pub use slippage::SlippageModel;
pub use strategy::MarketMakingStrategy;
