//! Seeded synthetic tick generator.
//!
//! Each symbol follows a multiplicative Gaussian random walk with a price
//! floor. Ticks are interleaved round-robin across symbols and share one
//! timestamp per round, so the stream is non-decreasing in time.

use mmsim_core::{Error, MarketData, Result, TimestampNs};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Synthetic feed parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticConfig {
    /// Symbols to generate, in round-robin order.
    pub symbols: Vec<String>,
    /// Rounds to generate (ticks per symbol).
    pub ticks_per_symbol: usize,
    /// RNG seed.
    pub seed: u64,
    /// Timestamp of the first round.
    pub start_ts: TimestampNs,
    /// Time between rounds.
    pub step_ns: i64,
    /// Stdev of the per-tick relative price change.
    pub volatility: f64,
    /// Quoted spread as a fraction of price.
    pub spread_fraction: f64,
    /// Lowest allowed price.
    pub price_floor: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            symbols: vec!["AAPL".to_string(), "GOOGL".to_string(), "MSFT".to_string()],
            ticks_per_symbol: 20_000,
            seed: 42,
            start_ts: 1_700_000_000_000_000_000,
            step_ns: 1_000_000,
            volatility: 0.02,
            spread_fraction: 0.002,
            price_floor: 50.0,
        }
    }
}

/// Iterator over synthetic ticks.
pub struct SyntheticFeed {
    config: SyntheticConfig,
    rng: StdRng,
    step: Normal<f64>,
    prices: Vec<f64>,
    round: usize,
    next_symbol: usize,
}

impl SyntheticFeed {
    /// Create a new synthetic feed.
    pub fn new(config: SyntheticConfig) -> Result<Self> {
        if config.symbols.is_empty() {
            return Err(Error::config("synthetic feed needs at least one symbol"));
        }
        let step = Normal::new(0.0, config.volatility)
            .map_err(|e| Error::config(format!("invalid synthetic volatility: {e}")))?;
        let prices = (0..config.symbols.len())
            .map(|i| 100.0 + i as f64 * 5.0)
            .collect();

        Ok(Self {
            rng: StdRng::seed_from_u64(config.seed),
            step,
            prices,
            round: 0,
            next_symbol: 0,
            config,
        })
    }

    /// Total number of ticks the feed will yield.
    pub fn total_ticks(&self) -> usize {
        self.config.ticks_per_symbol * self.config.symbols.len()
    }
}

impl Iterator for SyntheticFeed {
    type Item = MarketData;

    fn next(&mut self) -> Option<MarketData> {
        if self.round >= self.config.ticks_per_symbol {
            return None;
        }

        let idx = self.next_symbol;
        let mut base = self.prices[idx];
        base += self.step.sample(&mut self.rng) * base;
        base = base.max(self.config.price_floor);
        self.prices[idx] = base;

        let half_spread = base * self.config.spread_fraction / 2.0;
        let tick = MarketData::quote(
            self.config.symbols[idx].clone(),
            base - half_spread,
            base + half_spread,
            self.rng.gen_range(100..1000),
            self.rng.gen_range(100..1000),
            self.config.start_ts + self.round as i64 * self.config.step_ns,
        );

        self.next_symbol += 1;
        if self.next_symbol == self.config.symbols.len() {
            self.next_symbol = 0;
            self.round += 1;
        }

        Some(tick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn small_config(seed: u64) -> SyntheticConfig {
        SyntheticConfig {
            symbols: vec!["AAPL".to_string(), "MSFT".to_string()],
            ticks_per_symbol: 50,
            seed,
            ..Default::default()
        }
    }

    #[test]
    fn test_same_seed_same_stream() {
        let a: Vec<_> = SyntheticFeed::new(small_config(7)).unwrap().collect();
        let b: Vec<_> = SyntheticFeed::new(small_config(7)).unwrap().collect();
        assert_eq!(a, b);
        assert_eq!(a.len(), 100);
    }

    #[test]
    fn test_interleaved_and_ordered() {
        let ticks: Vec<_> = SyntheticFeed::new(small_config(1)).unwrap().collect();
        assert_eq!(ticks[0].symbol, "AAPL");
        assert_eq!(ticks[1].symbol, "MSFT");
        assert_eq!(ticks[0].timestamp, ticks[1].timestamp);
        assert!(ticks.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_quotes_are_well_formed() {
        let config = small_config(3);
        let floor = config.price_floor;
        for tick in SyntheticFeed::new(config).unwrap() {
            assert!(tick.bid > 0.0);
            assert!(tick.ask > tick.bid);
            assert!(tick.mid() >= floor - 1e-9);
            assert_relative_eq!((tick.ask - tick.bid) / tick.mid(), 0.002, max_relative = 1e-9);
            assert!((100..1000).contains(&tick.bid_size));
        }
    }

    #[test]
    fn test_rejects_empty_symbols() {
        let config = SyntheticConfig {
            symbols: Vec::new(),
            ..Default::default()
        };
        assert!(SyntheticFeed::new(config).is_err());
    }
}
