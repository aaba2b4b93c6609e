//! Backtest engine.
//!
//! Replays ticks in stream order. Per tick: best-effort cache write, book
//! update, quote generation, then one fill attempt per quote against the
//! same tick's top-of-book. Quotes never rest across ticks.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use mmsim_core::config::{CacheConfig, EngineConfig};
use mmsim_core::{Config, Error, MarketData, Order, PnlRecord, Result, Side, TimestampNs, Trade};
use tracing::{debug, info, trace, warn};

use crate::cache::{self, MarketDataCache, NoopCache};
use crate::fill_model::{FillModel, FillModelConfig};
use crate::latency::LatencyRecorder;
use crate::metrics::{ActivityStats, PerformanceAnalyzer, PerformanceMetrics};
use crate::order_book::SimplifiedOrderBook;
use crate::position::{PositionLedger, SymbolPosition};
use crate::report::{BacktestReport, OrderStats};
use crate::slippage::SlippageModel;
use crate::strategy::MarketMakingStrategy;
use crate::volatility::VolatilityEstimator;

/// Everything the engine keeps for one registered symbol.
#[derive(Debug, Clone)]
struct SymbolState {
    book: SimplifiedOrderBook,
    strategy: MarketMakingStrategy,
    volatility: VolatilityEstimator,
}

/// Backtest engine state.
pub struct BacktestEngine {
    config: EngineConfig,
    cache_config: CacheConfig,
    fill_model: FillModel,
    slippage: SlippageModel,
    analyzer: PerformanceAnalyzer,
    cache: Box<dyn MarketDataCache>,
    cache_available: bool,
    symbols: BTreeMap<String, SymbolState>,
    ledger: PositionLedger,
    trades: Vec<Trade>,
    latency: LatencyRecorder,
    order_stats: OrderStats,
    ticks_processed: u64,
    orders_processed: u64,
    rejected_orders: u64,
    elapsed: Duration,
    last_timestamp: Option<TimestampNs>,
}

impl BacktestEngine {
    /// Create an engine and register one strategy per configured symbol.
    ///
    /// The cache is pinged once here; if it does not answer it is never
    /// touched again.
    pub fn new(config: &Config, mut cache: Box<dyn MarketDataCache>) -> Result<Self> {
        config.validate()?;

        let cache_available = cache.ping();
        if !cache_available {
            debug!("cache unavailable, running without it");
        }

        let engine_config = config.engine.clone();
        let mut engine = Self {
            fill_model: FillModel::new(FillModelConfig {
                relaxed_fill_threshold: engine_config.relaxed_fill_threshold,
            }),
            slippage: SlippageModel::new(engine_config.base_slippage_bps),
            analyzer: PerformanceAnalyzer::new(),
            config: engine_config,
            cache_config: config.cache.clone(),
            cache,
            cache_available,
            symbols: BTreeMap::new(),
            ledger: PositionLedger::new(),
            trades: Vec::new(),
            latency: LatencyRecorder::new(),
            order_stats: OrderStats::default(),
            ticks_processed: 0,
            orders_processed: 0,
            rejected_orders: 0,
            elapsed: Duration::ZERO,
            last_timestamp: None,
        };

        for strategy_config in &config.strategies {
            let strategy = MarketMakingStrategy::new(
                strategy_config.clone(),
                engine.config.lot_size,
                engine.config.price_improvement_increment,
            );
            engine.add_strategy(strategy)?;
        }

        Ok(engine)
    }

    /// Create an engine with no cache.
    pub fn without_cache(config: &Config) -> Result<Self> {
        Self::new(config, Box::new(NoopCache))
    }

    /// Register a strategy for its symbol.
    pub fn add_strategy(&mut self, strategy: MarketMakingStrategy) -> Result<()> {
        let symbol = strategy.symbol().to_string();
        if self.symbols.contains_key(&symbol) {
            return Err(Error::config(format!("strategy for {symbol} already registered")));
        }

        self.ledger.open_symbol(&symbol);
        self.symbols.insert(
            symbol.clone(),
            SymbolState {
                book: SimplifiedOrderBook::new(symbol),
                strategy,
                volatility: VolatilityEstimator::from_config(&self.config.volatility),
            },
        );
        Ok(())
    }

    /// Process one tick.
    ///
    /// Rejected quotes are logged and dropped; only a malformed tick is
    /// returned as an error.
    pub fn process_tick(&mut self, tick: &MarketData) -> Result<()> {
        if !tick.bid.is_finite() || !tick.ask.is_finite() {
            return Err(Error::data(format!(
                "{}: non-finite quote bid={} ask={}",
                tick.symbol, tick.bid, tick.ask
            )));
        }

        if let Some(last) = self.last_timestamp {
            if tick.timestamp < last {
                warn!(
                    symbol = %tick.symbol,
                    timestamp = tick.timestamp,
                    previous = last,
                    "tick timestamp went backwards"
                );
            }
        }
        self.last_timestamp = Some(tick.timestamp);
        self.ticks_processed += 1;

        if self.cache_available {
            let ttl = Duration::from_secs(self.cache_config.tick_ttl_secs);
            let fields = cache::tick_fields(tick);
            if let Err(e) = self
                .cache
                .set_with_expiry(&cache::tick_key(&tick.symbol), &fields, ttl)
            {
                debug!(symbol = %tick.symbol, error = %e, "tick cache write failed");
            }
        }

        let Some(state) = self.symbols.get_mut(&tick.symbol) else {
            return Ok(());
        };

        state.book.update(tick);
        if state.book.has_market() {
            state.volatility.observe(state.book.mid_price());
        }

        let started = Instant::now();
        let orders = state.strategy.generate_orders(tick, tick.timestamp);
        for order in &orders {
            if let Err(e) = self.process_order(order, tick) {
                warn!(order_id = order.id, symbol = %order.symbol, error = %e, "order rejected");
            }
        }
        self.latency.record(started.elapsed());

        Ok(())
    }

    /// Attempt to fill one order against its symbol's current book.
    ///
    /// Returns `Ok(None)` when the order does not match.
    pub fn process_order(&mut self, order: &Order, tick: &MarketData) -> Result<Option<Trade>> {
        if let Err(e) = self.check_order(order) {
            self.rejected_orders += 1;
            return Err(e);
        }
        let Some(state) = self.symbols.get_mut(&order.symbol) else {
            self.rejected_orders += 1;
            return Err(Error::invalid_order(format!(
                "order {} for unregistered symbol {}",
                order.id, order.symbol
            )));
        };

        self.orders_processed += 1;
        let touch = match order.side {
            Side::Buy => state.book.best_ask().price,
            Side::Sell => state.book.best_bid().price,
        };
        let value_price = if !order.is_market() {
            order.price
        } else if touch > 0.0 && touch.is_finite() {
            touch
        } else {
            0.0
        };
        self.order_stats.record(order, value_price);

        let Some(fill) = self.fill_model.try_fill(order, &state.book) else {
            return Ok(None);
        };

        let fraction = self
            .slippage
            .slippage(order, tick, state.volatility.current());
        let trade = Trade {
            order_id: order.id,
            symbol: order.symbol.clone(),
            side: order.side,
            quantity: order.quantity,
            price: SlippageModel::apply(order.side, fill.price, fraction),
            timestamp: tick.timestamp,
            slippage: fraction,
        };

        state.strategy.on_trade(&trade);
        let cumulative_pnl = self.ledger.apply(&trade);
        trace!(
            order_id = trade.order_id,
            symbol = %trade.symbol,
            side = ?trade.side,
            kind = ?fill.kind,
            price = trade.price,
            quantity = trade.quantity,
            position = self.ledger.position(&trade.symbol),
            cumulative_pnl,
            "fill"
        );

        self.trades.push(trade.clone());
        if self.cache_available {
            let ttl = Duration::from_secs(self.cache_config.trade_ttl_secs);
            let key = cache::trade_key(self.trades.len());
            if let Err(e) = self
                .cache
                .set_with_expiry(&key, &cache::trade_fields(&trade), ttl)
            {
                debug!(key = %key, error = %e, "trade cache write failed");
            }
        }

        Ok(Some(trade))
    }

    fn check_order(&self, order: &Order) -> Result<()> {
        if order.quantity == 0 {
            return Err(Error::invalid_order(format!("order {} has zero quantity", order.id)));
        }
        if !order.is_market() && !(order.price.is_finite() && order.price > 0.0) {
            return Err(Error::invalid_order(format!(
                "order {} has invalid limit price {}",
                order.id, order.price
            )));
        }
        Ok(())
    }

    /// Run over a tick stream and return the final metrics.
    pub fn run(&mut self, ticks: impl IntoIterator<Item = MarketData>) -> PerformanceMetrics {
        self.run_inner(ticks, None)
    }

    /// Run until the stream ends or `budget` of wall-clock time has passed.
    pub fn run_with_budget(
        &mut self,
        ticks: impl IntoIterator<Item = MarketData>,
        budget: Duration,
    ) -> PerformanceMetrics {
        self.run_inner(ticks, Some(budget))
    }

    fn run_inner(
        &mut self,
        ticks: impl IntoIterator<Item = MarketData>,
        budget: Option<Duration>,
    ) -> PerformanceMetrics {
        info!(
            symbols = self.symbols.len(),
            cache = self.cache_available,
            "Starting backtest"
        );

        let started = Instant::now();
        let mut count = 0u64;
        for tick in ticks {
            if let Some(budget) = budget {
                if started.elapsed() >= budget {
                    info!(ticks = count, "time budget exhausted, stopping");
                    break;
                }
            }

            if let Err(e) = self.process_tick(&tick) {
                warn!(
                    symbol = %tick.symbol,
                    timestamp = tick.timestamp,
                    error = %e,
                    "skipping tick"
                );
            }

            count += 1;
            if count % self.config.progress_interval == 0 {
                info!(
                    ticks = count,
                    trades = self.trades.len(),
                    pnl = self.ledger.cumulative_pnl(),
                    "progress"
                );
            }
        }
        self.elapsed += started.elapsed();

        let metrics = self.calculate_metrics();
        info!(
            ticks = count,
            orders = self.orders_processed,
            trades = metrics.total_trades,
            total_pnl = metrics.total_pnl,
            elapsed_secs = self.elapsed.as_secs_f64(),
            "Backtest complete"
        );
        metrics
    }

    /// Read back the latest cached tick for `symbol`.
    pub fn cached_market_data(&mut self, symbol: &str) -> Option<MarketData> {
        if !self.cache_available {
            return None;
        }
        match self.cache.get(&cache::tick_key(symbol)) {
            Ok(Some(fields)) => match cache::tick_from_fields(symbol, &fields) {
                Ok(tick) => Some(tick),
                Err(e) => {
                    debug!(symbol, error = %e, "cached tick unreadable");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                debug!(symbol, error = %e, "cache read failed");
                None
            }
        }
    }

    /// Open inventory marked at each symbol's current mid.
    pub fn unrealized_pnl(&self) -> f64 {
        self.symbols
            .iter()
            .filter(|(_, state)| state.book.has_market())
            .filter_map(|(symbol, state)| {
                self.ledger
                    .get(symbol)
                    .map(|position| position.inventory_value(state.book.mid_price()))
            })
            .sum()
    }

    /// Calculate metrics from everything processed so far.
    pub fn calculate_metrics(&self) -> PerformanceMetrics {
        let activity = ActivityStats {
            orders_processed: self.orders_processed,
            elapsed: self.elapsed,
            avg_latency_ms: self.latency.mean_ms(),
            unrealized_pnl: self.unrealized_pnl(),
        };
        self.analyzer
            .calculate(&self.trades, self.ledger.pnl_history(), &activity)
    }

    /// Build the run report.
    pub fn report(&self) -> BacktestReport {
        BacktestReport {
            orders: self.order_stats.clone(),
            performance: self.latency.summary(self.orders_processed, self.elapsed),
            metrics: self.calculate_metrics(),
            positions: self.ledger.positions().clone(),
            generated_at: chrono::Utc::now(),
        }
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn pnl_history(&self) -> &[PnlRecord] {
        self.ledger.pnl_history()
    }

    pub fn positions(&self) -> &BTreeMap<String, SymbolPosition> {
        self.ledger.positions()
    }

    pub fn order_book(&self, symbol: &str) -> Option<&SimplifiedOrderBook> {
        self.symbols.get(symbol).map(|state| &state.book)
    }

    pub fn strategy(&self, symbol: &str) -> Option<&MarketMakingStrategy> {
        self.symbols.get(symbol).map(|state| &state.strategy)
    }

    pub fn ticks_processed(&self) -> u64 {
        self.ticks_processed
    }

    /// Orders that reached the fill step.
    pub fn orders_processed(&self) -> u64 {
        self.orders_processed
    }

    pub fn rejected_orders(&self) -> u64 {
        self.rejected_orders
    }

    pub fn order_stats(&self) -> &OrderStats {
        &self.order_stats
    }

    pub fn latency(&self) -> &LatencyRecorder {
        &self.latency
    }

    pub fn cache_available(&self) -> bool {
        self.cache_available
    }

    /// Reset all run state. Registered symbols and cache availability are kept.
    pub fn reset(&mut self) {
        for (symbol, state) in self.symbols.iter_mut() {
            state.book = SimplifiedOrderBook::new(symbol.clone());
            state.strategy.reset();
            state.volatility = VolatilityEstimator::from_config(&self.config.volatility);
        }
        self.ledger.reset();
        self.trades.clear();
        self.latency.clear();
        self.order_stats = OrderStats::default();
        self.ticks_processed = 0;
        self.orders_processed = 0;
        self.rejected_orders = 0;
        self.elapsed = Duration::ZERO;
        self.last_timestamp = None;
    }
}
