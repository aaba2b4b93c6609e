//! Backtest performance metrics.
//!
//! Reduces the trade list and P&L history of a run into a single snapshot.
//! Per-trade P&L is the signed cash flow of the fill (`+qty*price` for
//! sells, `-qty*price` for buys), so win/loss counts describe cash direction
//! rather than round-trip profitability.

use std::time::Duration;

use mmsim_core::{PnlRecord, Trade};
use serde::Serialize;
use statrs::statistics::Statistics;

/// Backtest performance metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceMetrics {
    /// Total number of trades.
    pub total_trades: u64,
    /// Trades with positive P&L.
    pub winning_trades: u64,
    /// Trades with negative P&L.
    pub losing_trades: u64,
    /// Winning trades / total trades (0-1).
    pub hit_rate: f64,
    /// Cumulative realized cash-flow P&L.
    pub total_pnl: f64,
    pub realized_pnl: f64,
    /// Open inventory marked at the final mid.
    pub unrealized_pnl: f64,
    pub avg_trade_pnl: f64,
    /// Largest peak-to-trough decline of cumulative P&L.
    pub max_drawdown: f64,
    /// Mean / population std of per-trade P&L, not annualized.
    pub sharpe_ratio: f64,
    /// Sum of |slippage * price * quantity|.
    pub total_slippage: f64,
    pub avg_slippage: f64,
    /// Total filled quantity.
    pub volume_traded: u64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub max_consecutive_wins: u32,
    pub max_consecutive_losses: u32,
    /// Orders processed per wall-clock second.
    pub throughput_ops_sec: f64,
    /// Mean per-tick processing latency.
    pub avg_latency_ms: f64,
}

/// Run-level figures the analyzer cannot derive from trades alone.
#[derive(Debug, Clone, Default)]
pub struct ActivityStats {
    pub orders_processed: u64,
    pub elapsed: Duration,
    pub avg_latency_ms: f64,
    pub unrealized_pnl: f64,
}

/// Signed P&L of a single fill.
#[inline]
pub fn trade_pnl(trade: &Trade) -> f64 {
    trade.cash_flow()
}

/// Maximum drawdown over a P&L history, measured from a flat start.
pub fn max_drawdown(pnl_history: &[PnlRecord]) -> f64 {
    let mut peak = 0.0_f64;
    let mut max_dd = 0.0_f64;
    for record in pnl_history {
        peak = peak.max(record.cumulative_pnl);
        max_dd = max_dd.max(peak - record.cumulative_pnl);
    }
    max_dd
}

fn sharpe_ratio(pnls: &[f64]) -> f64 {
    if pnls.len() < 2 {
        return 0.0;
    }
    let std_dev = pnls.iter().population_std_dev();
    if std_dev > 0.0 {
        pnls.iter().mean() / std_dev
    } else {
        0.0
    }
}

/// Stateless metrics reducer.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerformanceAnalyzer;

impl PerformanceAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Calculate metrics. Pure: the same inputs always give the same snapshot.
    pub fn calculate(
        &self,
        trades: &[Trade],
        pnl_history: &[PnlRecord],
        activity: &ActivityStats,
    ) -> PerformanceMetrics {
        if trades.is_empty() {
            return PerformanceMetrics::default();
        }

        let mut metrics = PerformanceMetrics {
            total_trades: trades.len() as u64,
            ..Default::default()
        };

        let pnls: Vec<f64> = trades.iter().map(trade_pnl).collect();

        let mut current_wins = 0u32;
        let mut current_losses = 0u32;

        for (trade, &pnl) in trades.iter().zip(&pnls) {
            metrics.total_pnl += pnl;
            metrics.total_slippage += trade.slippage_cost();
            metrics.volume_traded += trade.quantity;

            if pnl > 0.0 {
                metrics.winning_trades += 1;
                metrics.largest_win = metrics.largest_win.max(pnl);

                current_wins += 1;
                current_losses = 0;
                metrics.max_consecutive_wins = metrics.max_consecutive_wins.max(current_wins);
            } else if pnl < 0.0 {
                metrics.losing_trades += 1;
                metrics.largest_loss = metrics.largest_loss.min(pnl);

                current_losses += 1;
                current_wins = 0;
                metrics.max_consecutive_losses =
                    metrics.max_consecutive_losses.max(current_losses);
            } else {
                current_wins = 0;
                current_losses = 0;
            }
        }

        let n = metrics.total_trades as f64;
        metrics.hit_rate = metrics.winning_trades as f64 / n;
        metrics.realized_pnl = metrics.total_pnl;
        metrics.unrealized_pnl = activity.unrealized_pnl;
        metrics.avg_trade_pnl = metrics.total_pnl / n;
        metrics.avg_slippage = metrics.total_slippage / n;
        metrics.max_drawdown = max_drawdown(pnl_history);
        metrics.sharpe_ratio = sharpe_ratio(&pnls);

        let secs = activity.elapsed.as_secs_f64();
        metrics.throughput_ops_sec = if secs > 0.0 {
            activity.orders_processed as f64 / secs
        } else {
            0.0
        };
        metrics.avg_latency_ms = activity.avg_latency_ms;

        metrics
    }
}
