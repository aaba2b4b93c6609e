//! Inventory-aware market-making strategy.
//!
//! Quotes one lot on each side, just inside the current touch, with both
//! quotes shifted by an inventory skew that leans towards the target
//! position. The position bound is only checked when quoting.

use mmsim_core::config::StrategyConfig;
use mmsim_core::{MarketData, Order, Position, Quantity, Side, TimestampNs, Trade};
use tracing::warn;

/// Fraction of the target spread applied per unit of inventory skew.
const SKEW_SPREAD_FRACTION: f64 = 0.1;

/// Market-making strategy for one symbol.
#[derive(Debug, Clone)]
pub struct MarketMakingStrategy {
    config: StrategyConfig,
    lot_size: Quantity,
    price_improvement: f64,
    position: Position,
    order_id_counter: u64,
}

impl MarketMakingStrategy {
    /// Create a strategy quoting `lot_size` at `price_improvement` inside the touch.
    pub fn new(config: StrategyConfig, lot_size: Quantity, price_improvement: f64) -> Self {
        if !config.skew_enabled() && config.inventory_target != 0 {
            warn!(
                symbol = %config.symbol,
                "max_position is not positive, inventory skew disabled"
            );
        }
        Self {
            config,
            lot_size,
            price_improvement,
            position: 0,
            order_id_counter: 0,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.config.symbol
    }

    /// Current signed inventory.
    pub fn position(&self) -> Position {
        self.position
    }

    /// Number of orders generated so far (also the last id used).
    pub fn orders_generated(&self) -> u64 {
        self.order_id_counter
    }

    /// Inventory skew in [-1, 1] for a position within bounds; 0 when skew is disabled.
    pub fn inventory_skew(&self) -> f64 {
        if self.config.skew_enabled() {
            (self.position - self.config.inventory_target) as f64 / self.config.max_position as f64
        } else {
            0.0
        }
    }

    /// Generate this tick's candidate quotes.
    pub fn generate_orders(&mut self, tick: &MarketData, now: TimestampNs) -> Vec<Order> {
        let mut orders = Vec::with_capacity(2);

        if !tick.has_market() {
            return orders;
        }

        let mid = tick.mid();
        let spread = self.config.spread_bps / 10_000.0 * mid;
        let skew_adjustment = self.inventory_skew() * spread * SKEW_SPREAD_FRACTION;

        let bid_price = tick.bid + self.price_improvement - skew_adjustment;
        let ask_price = tick.ask - self.price_improvement - skew_adjustment;

        let max_position = self.config.max_position;
        let can_buy = self.position < max_position && bid_price < ask_price;
        let can_sell = self.position > -max_position && ask_price > bid_price;

        if can_buy && bid_price > 0.0 {
            orders.push(self.next_order(Side::Buy, bid_price, now));
        }
        if can_sell {
            orders.push(self.next_order(Side::Sell, ask_price, now));
        }

        orders
    }

    fn next_order(&mut self, side: Side, price: f64, now: TimestampNs) -> Order {
        self.order_id_counter += 1;
        Order::limit(
            self.order_id_counter,
            self.config.symbol.clone(),
            side,
            self.lot_size,
            price,
            now,
        )
    }

    /// Apply a fill of one of this strategy's orders.
    pub fn on_trade(&mut self, trade: &Trade) {
        self.position += trade.side.sign() * trade.quantity as i64;
    }

    /// Flatten and restart order ids.
    pub fn reset(&mut self) {
        self.position = 0;
        self.order_id_counter = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn strategy(max_position: i64, inventory_target: i64) -> MarketMakingStrategy {
        MarketMakingStrategy::new(
            StrategyConfig {
                symbol: "AAPL".to_string(),
                spread_bps: 2.0,
                max_position,
                inventory_target,
            },
            100,
            0.01,
        )
    }

    fn tick(bid: f64, ask: f64) -> MarketData {
        MarketData::quote("AAPL", bid, ask, 500, 500, 1_000)
    }

    fn fill(side: Side, quantity: u64) -> Trade {
        Trade {
            order_id: 1,
            symbol: "AAPL".to_string(),
            side,
            quantity,
            price: 100.0,
            timestamp: 0,
            slippage: 0.0,
        }
    }

    #[test]
    fn test_flat_quotes_inside_touch() {
        let mut strat = strategy(1000, 0);
        let orders = strat.generate_orders(&tick(100.0, 100.2), 1_000);

        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].side, Side::Buy);
        assert_abs_diff_eq!(orders[0].price, 100.01, epsilon = 1e-9);
        assert_eq!(orders[1].side, Side::Sell);
        assert_abs_diff_eq!(orders[1].price, 100.19, epsilon = 1e-9);
        assert!(orders.iter().all(|o| o.quantity == 100 && o.timestamp == 1_000));
        assert_eq!(orders[0].id, 1);
        assert_eq!(orders[1].id, 2);
    }

    #[test]
    fn test_no_market_no_quotes() {
        let mut strat = strategy(1000, 0);
        assert!(strat.generate_orders(&tick(0.0, 100.2), 0).is_empty());
        assert!(strat.generate_orders(&tick(100.0, -1.0), 0).is_empty());
        assert_eq!(strat.orders_generated(), 0);
    }

    #[test]
    fn test_order_ids_strictly_increase() {
        let mut strat = strategy(1000, 0);
        let mut ids = Vec::new();
        for _ in 0..3 {
            ids.extend(strat.generate_orders(&tick(100.0, 100.2), 0).into_iter().map(|o| o.id));
        }
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(strat.orders_generated(), 6);
    }

    #[test]
    fn test_long_limit_blocks_buys() {
        let mut strat = strategy(100, 0);
        strat.on_trade(&fill(Side::Buy, 100));
        assert_eq!(strat.position(), 100);

        let orders = strat.generate_orders(&tick(100.0, 100.2), 0);
        assert!(orders.iter().all(|o| o.side != Side::Buy));
        assert_eq!(orders.len(), 1);
    }

    #[test]
    fn test_short_limit_blocks_sells() {
        let mut strat = strategy(100, 0);
        strat.on_trade(&fill(Side::Sell, 100));
        let orders = strat.generate_orders(&tick(100.0, 100.2), 0);
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].side, Side::Buy);
    }

    #[test]
    fn test_long_inventory_skews_quotes_down() {
        let mut strat = strategy(1000, 0);
        strat.on_trade(&fill(Side::Buy, 500));

        let orders = strat.generate_orders(&tick(100.0, 100.2), 0);
        // skew 0.5 * spread (100.1 * 2bps) * 0.1
        let adj = 0.5 * (2.0 / 10_000.0 * 100.1) * 0.1;
        assert_abs_diff_eq!(orders[0].price, 100.01 - adj, epsilon = 1e-9);
        assert_abs_diff_eq!(orders[1].price, 100.19 - adj, epsilon = 1e-9);
    }

    #[test]
    fn test_skew_disabled_without_max_position() {
        let strat = strategy(0, 25);
        assert_eq!(strat.inventory_skew(), 0.0);
    }

    #[test]
    fn test_locked_market_quotes_nothing() {
        // improvement on both sides crosses the quotes
        let mut strat = strategy(1000, 0);
        assert!(strat.generate_orders(&tick(100.0, 100.01), 0).is_empty());
    }

    #[test]
    fn test_on_trade_and_reset() {
        let mut strat = strategy(1000, 0);
        strat.on_trade(&fill(Side::Buy, 300));
        strat.on_trade(&fill(Side::Sell, 100));
        assert_eq!(strat.position(), 200);
        strat.generate_orders(&tick(100.0, 100.2), 0);

        strat.reset();
        assert_eq!(strat.position(), 0);
        assert_eq!(strat.orders_generated(), 0);
    }
}
