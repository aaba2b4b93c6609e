//! Position and cash bookkeeping for backtesting.
//!
//! Tracks per-symbol inventory and cash, the global cumulative realized P&L
//! (simplified cash-flow mark) and its history.

use std::collections::BTreeMap;

use mmsim_core::{PnlRecord, Position, Quantity, Side, Trade};
use serde::Serialize;

/// Inventory and cash for one symbol.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SymbolPosition {
    /// Signed inventory.
    pub position: Position,
    /// Net cash from fills (sells minus buys).
    pub cash: f64,
    /// Total filled quantity.
    pub volume_traded: Quantity,
    /// Number of buy fills.
    pub buy_fills: u64,
    /// Number of sell fills.
    pub sell_fills: u64,
}

impl SymbolPosition {
    /// Mark-to-market value of the inventory at `price`.
    pub fn inventory_value(&self, price: f64) -> f64 {
        self.position as f64 * price
    }
}

/// Position ledger for backtesting.
#[derive(Debug, Clone, Default)]
pub struct PositionLedger {
    positions: BTreeMap<String, SymbolPosition>,
    cumulative_pnl: f64,
    pnl_history: Vec<PnlRecord>,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a symbol with a flat position.
    pub fn open_symbol(&mut self, symbol: &str) {
        self.positions.entry(symbol.to_string()).or_default();
    }

    /// Book a fill. Appends one `PnlRecord` and returns the new cumulative P&L.
    pub fn apply(&mut self, trade: &Trade) -> f64 {
        let entry = self.positions.entry(trade.symbol.clone()).or_default();
        let cash_flow = trade.cash_flow();

        entry.position += trade.side.sign() * trade.quantity as i64;
        entry.cash += cash_flow;
        entry.volume_traded += trade.quantity;
        match trade.side {
            Side::Buy => entry.buy_fills += 1,
            Side::Sell => entry.sell_fills += 1,
        }

        self.cumulative_pnl += cash_flow;
        self.pnl_history
            .push(PnlRecord::new(trade.timestamp, self.cumulative_pnl));
        self.cumulative_pnl
    }

    pub fn position(&self, symbol: &str) -> Position {
        self.positions.get(symbol).map(|p| p.position).unwrap_or(0)
    }

    pub fn get(&self, symbol: &str) -> Option<&SymbolPosition> {
        self.positions.get(symbol)
    }

    pub fn positions(&self) -> &BTreeMap<String, SymbolPosition> {
        &self.positions
    }

    /// Cumulative realized cash-flow P&L.
    pub fn cumulative_pnl(&self) -> f64 {
        self.cumulative_pnl
    }

    pub fn pnl_history(&self) -> &[PnlRecord] {
        &self.pnl_history
    }

    /// Flatten all symbols (registrations kept) and clear history.
    pub fn reset(&mut self) {
        for position in self.positions.values_mut() {
            *position = SymbolPosition::default();
        }
        self.cumulative_pnl = 0.0;
        self.pnl_history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn trade(symbol: &str, side: Side, quantity: u64, price: f64, ts: i64) -> Trade {
        Trade {
            order_id: 1,
            symbol: symbol.to_string(),
            side,
            quantity,
            price,
            timestamp: ts,
            slippage: 0.0,
        }
    }

    #[test]
    fn test_buy_then_sell() {
        let mut ledger = PositionLedger::new();
        ledger.open_symbol("AAPL");

        let pnl = ledger.apply(&trade("AAPL", Side::Buy, 100, 100.0, 1));
        assert_abs_diff_eq!(pnl, -10_000.0, epsilon = 1e-9);
        assert_eq!(ledger.position("AAPL"), 100);

        let pnl = ledger.apply(&trade("AAPL", Side::Sell, 100, 101.0, 2));
        assert_abs_diff_eq!(pnl, 100.0, epsilon = 1e-9);
        assert_eq!(ledger.position("AAPL"), 0);

        let history = ledger.pnl_history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].timestamp, 1);
        assert_abs_diff_eq!(history[1].cumulative_pnl, 100.0, epsilon = 1e-9);

        let aapl = ledger.get("AAPL").unwrap();
        assert_eq!(aapl.volume_traded, 200);
        assert_eq!((aapl.buy_fills, aapl.sell_fills), (1, 1));
    }

    #[test]
    fn test_symbols_are_independent() {
        let mut ledger = PositionLedger::new();
        ledger.apply(&trade("AAPL", Side::Buy, 100, 10.0, 1));
        ledger.apply(&trade("MSFT", Side::Sell, 50, 20.0, 2));

        assert_eq!(ledger.position("AAPL"), 100);
        assert_eq!(ledger.position("MSFT"), -50);
        assert_abs_diff_eq!(ledger.get("AAPL").unwrap().cash, -1000.0, epsilon = 1e-9);
        assert_abs_diff_eq!(ledger.get("MSFT").unwrap().cash, 1000.0, epsilon = 1e-9);
        assert_abs_diff_eq!(ledger.cumulative_pnl(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_reset_keeps_symbols() {
        let mut ledger = PositionLedger::new();
        ledger.open_symbol("AAPL");
        ledger.apply(&trade("AAPL", Side::Buy, 100, 10.0, 1));
        ledger.reset();

        assert_eq!(ledger.positions().len(), 1);
        assert_eq!(ledger.position("AAPL"), 0);
        assert!(ledger.pnl_history().is_empty());
    }

    #[test]
    fn test_inventory_value() {
        let position = SymbolPosition {
            position: -200,
            ..Default::default()
        };
        assert_abs_diff_eq!(position.inventory_value(50.0), -10_000.0, epsilon = 1e-9);
    }
}
