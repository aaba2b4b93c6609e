//! Slippage model.
//!
//! Estimates slippage as a fraction of price from order size, volatility and
//! order type. Deterministic: the same inputs always give the same fraction.

use mmsim_core::{MarketData, Order, Side};

/// Order size (in units) at which the size factor reaches 1.
const SIZE_UNIT: f64 = 1000.0;
/// Cap on the size factor.
const MAX_SIZE_FACTOR: f64 = 10.0;
/// Slippage added per unit of size factor.
const SIZE_IMPACT: f64 = 0.1;
/// Slippage multiplier per unit of volatility.
const VOLATILITY_IMPACT: f64 = 2.0;
/// Market orders cross the spread.
const MARKET_ORDER_MULTIPLIER: f64 = 2.0;

/// Slippage model.
#[derive(Debug, Clone)]
pub struct SlippageModel {
    base_slippage_bps: f64,
}

impl Default for SlippageModel {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl SlippageModel {
    /// Create a new slippage model.
    pub fn new(base_slippage_bps: f64) -> Self {
        Self { base_slippage_bps }
    }

    /// Slippage fraction for `order` given the tick it trades against.
    pub fn slippage(&self, order: &Order, _tick: &MarketData, volatility: f64) -> f64 {
        let mut slippage = self.base_slippage_bps / 10_000.0;

        let size_factor = (order.quantity as f64 / SIZE_UNIT).min(MAX_SIZE_FACTOR);
        slippage *= 1.0 + SIZE_IMPACT * size_factor;

        slippage *= 1.0 + VOLATILITY_IMPACT * volatility;

        if order.is_market() {
            slippage *= MARKET_ORDER_MULTIPLIER;
        }

        slippage
    }

    /// Apply a slippage fraction against the order's side.
    #[inline]
    pub fn apply(side: Side, price: f64, fraction: f64) -> f64 {
        match side {
            Side::Buy => price * (1.0 + fraction),
            Side::Sell => price * (1.0 - fraction),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tick() -> MarketData {
        MarketData::quote("AAPL", 100.0, 100.2, 500, 500, 0)
    }

    fn limit(qty: u64) -> Order {
        Order::limit(1, "AAPL", Side::Buy, qty, 100.0, 0)
    }

    #[test]
    fn test_base_case() {
        let model = SlippageModel::new(0.5);
        // 0.5bps * (1 + 0.1 * 0.1) * (1 + 2 * 0.01)
        let expected = 0.00005 * 1.01 * 1.02;
        assert_relative_eq!(model.slippage(&limit(100), &tick(), 0.01), expected, max_relative = 1e-12);
    }

    #[test]
    fn test_size_factor_saturates() {
        let model = SlippageModel::new(0.5);
        let at_cap = model.slippage(&limit(10_000), &tick(), 0.01);
        let beyond = model.slippage(&limit(100_000), &tick(), 0.01);
        assert_eq!(at_cap, beyond);
        assert!(at_cap > model.slippage(&limit(5_000), &tick(), 0.01));
    }

    #[test]
    fn test_market_orders_double() {
        let model = SlippageModel::new(1.0);
        let market = Order::market(1, "AAPL", Side::Sell, 100, 0);
        let limit = Order::limit(1, "AAPL", Side::Sell, 100, 100.0, 0);
        assert_relative_eq!(
            model.slippage(&market, &tick(), 0.0),
            2.0 * model.slippage(&limit, &tick(), 0.0),
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_volatility_increases_slippage() {
        let model = SlippageModel::new(0.5);
        assert!(model.slippage(&limit(100), &tick(), 0.05) > model.slippage(&limit(100), &tick(), 0.01));
    }

    #[test]
    fn test_apply_direction() {
        assert_relative_eq!(SlippageModel::apply(Side::Buy, 100.0, 0.001), 100.1, max_relative = 1e-12);
        assert_relative_eq!(SlippageModel::apply(Side::Sell, 100.0, 0.001), 99.9, max_relative = 1e-12);
    }
}
