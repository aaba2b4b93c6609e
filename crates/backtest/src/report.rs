//! Backtest run report.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use mmsim_core::{Order, Quantity, Result};
use serde::Serialize;

use crate::latency::LatencySummary;
use crate::metrics::PerformanceMetrics;
use crate::position::SymbolPosition;

/// Totals over every order that reached the fill step.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrderStats {
    pub total_orders: u64,
    pub total_volume: Quantity,
    pub total_value: f64,
    pub avg_order_size: f64,
    pub avg_order_value: f64,
}

impl OrderStats {
    /// Count one order valued at `price` (the limit, or the touch for market orders).
    pub fn record(&mut self, order: &Order, price: f64) {
        self.total_orders += 1;
        self.total_volume += order.quantity;
        self.total_value += price * order.quantity as f64;

        let n = self.total_orders.max(1) as f64;
        self.avg_order_size = self.total_volume as f64 / n;
        self.avg_order_value = self.total_value / n;
    }
}

/// Everything a run produced, ready to serialise.
#[derive(Debug, Clone, Serialize)]
pub struct BacktestReport {
    pub orders: OrderStats,
    pub performance: LatencySummary,
    pub metrics: PerformanceMetrics,
    pub positions: BTreeMap<String, SymbolPosition>,
    pub generated_at: DateTime<Utc>,
}

impl BacktestReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
