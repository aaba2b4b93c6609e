//! Core data types for the mmsim backtester.

use serde::{Deserialize, Serialize};

/// Timestamp in nanoseconds since Unix epoch (UTC).
pub type TimestampNs = i64;

/// Order/trade quantity (shares or contracts).
pub type Quantity = u64;

/// Signed inventory.
pub type Position = i64;

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Position direction: +1 for buy, -1 for sell.
    #[inline]
    pub fn sign(self) -> i64 {
        match self {
            Side::Buy => 1,
            Side::Sell => -1,
        }
    }

    /// Cash-flow direction: buys cost cash, sells raise it.
    #[inline]
    pub fn cash_sign(self) -> f64 {
        match self {
            Side::Buy => -1.0,
            Side::Sell => 1.0,
        }
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderKind {
    Market,
    Limit,
}

/// A candidate order produced by a strategy for a single tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Per-strategy order id (strictly increasing).
    pub id: u64,
    /// Instrument symbol.
    pub symbol: String,
    /// Buy or sell.
    pub side: Side,
    /// Market or limit.
    pub kind: OrderKind,
    /// Quantity, must be positive.
    pub quantity: Quantity,
    /// Limit price (ignored for market orders).
    pub price: f64,
    /// Creation time (tick time).
    pub timestamp: TimestampNs,
}

impl Order {
    /// Build a limit order.
    pub fn limit(
        id: u64,
        symbol: impl Into<String>,
        side: Side,
        quantity: Quantity,
        price: f64,
        timestamp: TimestampNs,
    ) -> Self {
        Self {
            id,
            symbol: symbol.into(),
            side,
            kind: OrderKind::Limit,
            quantity,
            price,
            timestamp,
        }
    }

    /// Build a market order.
    pub fn market(
        id: u64,
        symbol: impl Into<String>,
        side: Side,
        quantity: Quantity,
        timestamp: TimestampNs,
    ) -> Self {
        Self {
            id,
            symbol: symbol.into(),
            side,
            kind: OrderKind::Market,
            quantity,
            price: 0.0,
            timestamp,
        }
    }

    #[inline]
    pub fn is_market(&self) -> bool {
        self.kind == OrderKind::Market
    }
}

/// A simulated execution. Created only on a successful fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Id of the order that filled.
    pub order_id: u64,
    /// Instrument symbol.
    pub symbol: String,
    /// Side of the filled order.
    pub side: Side,
    /// Filled quantity.
    pub quantity: Quantity,
    /// Slippage-adjusted execution price.
    pub price: f64,
    /// Execution time (tick time).
    pub timestamp: TimestampNs,
    /// Slippage applied, as a fraction of price.
    pub slippage: f64,
}

impl Trade {
    /// Notional value of the fill.
    #[inline]
    pub fn notional(&self) -> f64 {
        self.quantity as f64 * self.price
    }

    /// Signed cash flow: positive for sells, negative for buys.
    #[inline]
    pub fn cash_flow(&self) -> f64 {
        self.notional() * self.side.cash_sign()
    }

    /// Absolute slippage cost in price units.
    #[inline]
    pub fn slippage_cost(&self) -> f64 {
        (self.slippage * self.price * self.quantity as f64).abs()
    }
}

/// One top-of-book observation for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketData {
    /// Instrument symbol.
    pub symbol: String,
    /// Best bid price.
    pub bid: f64,
    /// Best ask price.
    pub ask: f64,
    /// Best bid size.
    pub bid_size: Quantity,
    /// Best ask size.
    pub ask_size: Quantity,
    /// Tick timestamp.
    pub timestamp: TimestampNs,
    /// Last trade price, if the tick carried a print.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade_price: Option<f64>,
    /// Last trade size, if the tick carried a print.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade_size: Option<Quantity>,
}

impl MarketData {
    /// Build a quote-only tick.
    pub fn quote(
        symbol: impl Into<String>,
        bid: f64,
        ask: f64,
        bid_size: Quantity,
        ask_size: Quantity,
        timestamp: TimestampNs,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            bid,
            ask,
            bid_size,
            ask_size,
            timestamp,
            trade_price: None,
            trade_size: None,
        }
    }

    /// Both sides quoted with positive prices.
    #[inline]
    pub fn has_market(&self) -> bool {
        self.bid > 0.0 && self.ask > 0.0
    }

    /// Calculate mid price.
    #[inline]
    pub fn mid(&self) -> f64 {
        (self.bid + self.ask) / 2.0
    }
}

/// Cumulative realized P&L after a fill.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PnlRecord {
    pub timestamp: TimestampNs,
    pub cumulative_pnl: f64,
}

impl PnlRecord {
    pub fn new(timestamp: TimestampNs, cumulative_pnl: f64) -> Self {
        Self {
            timestamp,
            cumulative_pnl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_side_signs() {
        assert_eq!(Side::Buy.sign(), 1);
        assert_eq!(Side::Sell.sign(), -1);
        assert_eq!(Side::Buy.cash_sign(), -1.0);
        assert_eq!(Side::Sell.cash_sign(), 1.0);
    }

    #[test]
    fn test_tick_mid_and_market() {
        let tick = MarketData::quote("AAPL", 100.0, 100.2, 300, 100, 0);
        assert_abs_diff_eq!(tick.mid(), 100.1, epsilon = 1e-10);
        assert!(tick.has_market());
        assert!(!MarketData::quote("AAPL", 0.0, 100.2, 300, 100, 0).has_market());
        assert!(!MarketData::quote("AAPL", 100.0, -1.0, 300, 100, 0).has_market());
    }

    #[test]
    fn test_trade_cash_flow() {
        let trade = Trade {
            order_id: 1,
            symbol: "AAPL".to_string(),
            side: Side::Buy,
            quantity: 100,
            price: 50.0,
            timestamp: 0,
            slippage: 0.001,
        };
        assert_abs_diff_eq!(trade.cash_flow(), -5000.0, epsilon = 1e-10);
        assert_abs_diff_eq!(trade.slippage_cost(), 5.0, epsilon = 1e-10);
    }

    #[test]
    fn test_tick_json_optional_print() {
        let line = r#"{"symbol":"MSFT","bid":99.0,"ask":101.0,"bid_size":10,"ask_size":20,"timestamp":5}"#;
        let tick: MarketData = serde_json::from_str(line).unwrap();
        assert_eq!(tick.trade_price, None);
        assert_eq!(tick.trade_size, None);

        let side: Side = serde_json::from_str("\"SELL\"").unwrap();
        assert_eq!(side, Side::Sell);
    }
}
