//! Fill model for backtesting.
//!
//! Single-sided: an order trades against the opposite touch of the
//! simplified book or not at all. No queueing, no resting, one fill per
//! order.
//!
//! Limit orders that sit within `relaxed_fill_threshold` of the touch
//! without crossing it also fill, at their own limit price. This models
//! quotes expected to be crossed imminently and is part of the simulated
//! P&L, not a bug.

use mmsim_core::{Order, OrderKind, Side};

use crate::order_book::SimplifiedOrderBook;

/// Configuration for the fill model.
#[derive(Debug, Clone)]
pub struct FillModelConfig {
    /// Relative distance from the touch that still fills a limit order.
    pub relaxed_fill_threshold: f64,
}

impl Default for FillModelConfig {
    fn default() -> Self {
        Self {
            relaxed_fill_threshold: 0.001,
        }
    }
}

/// How an order was matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillKind {
    /// Market order at the touch.
    Market,
    /// Limit order that reached the touch.
    Crossed,
    /// Limit order inside the relaxed threshold.
    Relaxed,
}

/// A matched price before slippage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillPrice {
    pub price: f64,
    pub kind: FillKind,
}

/// Fill model for simulating order execution.
#[derive(Debug, Clone)]
pub struct FillModel {
    config: FillModelConfig,
}

impl FillModel {
    /// Create a new fill model.
    pub fn new(config: FillModelConfig) -> Self {
        Self { config }
    }

    /// Match `order` against the book's opposite touch.
    pub fn try_fill(&self, order: &Order, book: &SimplifiedOrderBook) -> Option<FillPrice> {
        match order.side {
            Side::Buy => self.buy(order, book.best_ask().price),
            Side::Sell => self.sell(order, book.best_bid().price),
        }
    }

    fn buy(&self, order: &Order, ask: f64) -> Option<FillPrice> {
        if !(ask > 0.0 && ask.is_finite()) {
            return None;
        }
        match order.kind {
            OrderKind::Market => Some(FillPrice {
                price: ask,
                kind: FillKind::Market,
            }),
            OrderKind::Limit if order.price >= ask => Some(FillPrice {
                price: order.price.min(ask),
                kind: FillKind::Crossed,
            }),
            OrderKind::Limit if order.price >= ask * (1.0 - self.config.relaxed_fill_threshold) => {
                Some(FillPrice {
                    price: order.price,
                    kind: FillKind::Relaxed,
                })
            }
            OrderKind::Limit => None,
        }
    }

    fn sell(&self, order: &Order, bid: f64) -> Option<FillPrice> {
        if bid <= 0.0 {
            return None;
        }
        match order.kind {
            OrderKind::Market => Some(FillPrice {
                price: bid,
                kind: FillKind::Market,
            }),
            OrderKind::Limit if order.price <= bid => Some(FillPrice {
                price: order.price.max(bid),
                kind: FillKind::Crossed,
            }),
            OrderKind::Limit if order.price <= bid * (1.0 + self.config.relaxed_fill_threshold) => {
                Some(FillPrice {
                    price: order.price,
                    kind: FillKind::Relaxed,
                })
            }
            OrderKind::Limit => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use mmsim_core::MarketData;

    fn book(bid: f64, ask: f64) -> SimplifiedOrderBook {
        let mut book = SimplifiedOrderBook::new("AAPL");
        book.update(&MarketData::quote("AAPL", bid, ask, 100, 100, 0));
        book
    }

    fn model() -> FillModel {
        FillModel::new(FillModelConfig::default())
    }

    fn limit(side: Side, price: f64) -> Order {
        Order::limit(1, "AAPL", side, 100, price, 0)
    }

    #[test]
    fn test_market_orders_take_touch() {
        let book = book(100.0, 100.5);
        let buy = model().try_fill(&Order::market(1, "AAPL", Side::Buy, 10, 0), &book).unwrap();
        assert_eq!(buy, FillPrice { price: 100.5, kind: FillKind::Market });

        let sell = model().try_fill(&Order::market(2, "AAPL", Side::Sell, 10, 0), &book).unwrap();
        assert_eq!(sell, FillPrice { price: 100.0, kind: FillKind::Market });
    }

    #[test]
    fn test_limit_buy_crossing_fills_at_ask() {
        let fill = model().try_fill(&limit(Side::Buy, 101.0), &book(100.0, 100.5)).unwrap();
        assert_eq!(fill.kind, FillKind::Crossed);
        assert_abs_diff_eq!(fill.price, 100.5, epsilon = 1e-12);
    }

    #[test]
    fn test_limit_sell_crossing_fills_at_bid() {
        let fill = model().try_fill(&limit(Side::Sell, 99.0), &book(100.0, 100.5)).unwrap();
        assert_eq!(fill.kind, FillKind::Crossed);
        assert_abs_diff_eq!(fill.price, 100.0, epsilon = 1e-12);
    }

    #[test]
    fn test_relaxed_buy_fills_at_own_price() {
        // 0.1% below 100.5 is 100.3995
        let fill = model().try_fill(&limit(Side::Buy, 100.4), &book(100.0, 100.5)).unwrap();
        assert_eq!(fill.kind, FillKind::Relaxed);
        assert_abs_diff_eq!(fill.price, 100.4, epsilon = 1e-12);

        assert!(model().try_fill(&limit(Side::Buy, 100.39), &book(100.0, 100.5)).is_none());
    }

    #[test]
    fn test_relaxed_sell_fills_at_own_price() {
        // 0.1% above 100.0 is 100.1
        let fill = model().try_fill(&limit(Side::Sell, 100.05), &book(100.0, 100.5)).unwrap();
        assert_eq!(fill.kind, FillKind::Relaxed);
        assert_abs_diff_eq!(fill.price, 100.05, epsilon = 1e-12);

        assert!(model().try_fill(&limit(Side::Sell, 100.2), &book(100.0, 100.5)).is_none());
    }

    #[test]
    fn test_zero_threshold_disables_relaxed_fills() {
        let strict = FillModel::new(FillModelConfig { relaxed_fill_threshold: 0.0 });
        assert!(strict.try_fill(&limit(Side::Buy, 100.49), &book(100.0, 100.5)).is_none());
    }

    #[test]
    fn test_empty_book_never_fills() {
        let empty = SimplifiedOrderBook::new("AAPL");
        assert!(model().try_fill(&Order::market(1, "AAPL", Side::Buy, 10, 0), &empty).is_none());
        assert!(model().try_fill(&Order::market(1, "AAPL", Side::Sell, 10, 0), &empty).is_none());
    }
}
