//! Per-tick processing latency.
//!
//! Wall-clock samples recorded around the order-generation-and-fill step.
//! Reporting only; nothing in the simulation reads them back.

use std::time::Duration;

use serde::Serialize;
use statrs::statistics::{Data, OrderStatistics, Statistics};

/// Latency and throughput summary for the report.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LatencySummary {
    pub throughput_ops_sec: f64,
    pub avg_us: f64,
    pub p50_us: f64,
    pub p90_us: f64,
    pub p99_us: f64,
    pub max_us: f64,
}

/// Append-only series of per-tick durations, stored in microseconds.
#[derive(Debug, Clone, Default)]
pub struct LatencyRecorder {
    samples_us: Vec<f64>,
}

impl LatencyRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, elapsed: Duration) {
        self.samples_us.push(elapsed.as_secs_f64() * 1e6);
    }

    pub fn len(&self) -> usize {
        self.samples_us.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples_us.is_empty()
    }

    /// Mean latency in microseconds (0 with no samples).
    pub fn mean_us(&self) -> f64 {
        if self.samples_us.is_empty() {
            return 0.0;
        }
        self.samples_us.iter().mean()
    }

    /// Mean latency in milliseconds.
    pub fn mean_ms(&self) -> f64 {
        self.mean_us() / 1_000.0
    }

    /// Summarise the series. Throughput is `orders / elapsed`, 0 if no time passed.
    pub fn summary(&self, orders_processed: u64, elapsed: Duration) -> LatencySummary {
        let secs = elapsed.as_secs_f64();
        let throughput_ops_sec = if secs > 0.0 {
            orders_processed as f64 / secs
        } else {
            0.0
        };

        if self.samples_us.is_empty() {
            return LatencySummary {
                throughput_ops_sec,
                ..Default::default()
            };
        }

        let mut data = Data::new(self.samples_us.clone());
        LatencySummary {
            throughput_ops_sec,
            avg_us: self.mean_us(),
            p50_us: data.percentile(50),
            p90_us: data.percentile(90),
            p99_us: data.percentile(99),
            max_us: self.samples_us.iter().copied().fold(0.0, f64::max),
        }
    }

    pub fn clear(&mut self) {
        self.samples_us.clear();
    }
}
