//! Configuration structures for the mmsim backtester.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Main configuration for a backtest run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Engine / execution configuration.
    pub engine: EngineConfig,
    /// Cache key expiry configuration.
    pub cache: CacheConfig,
    /// One market-making strategy per symbol.
    pub strategies: Vec<StrategyConfig>,
}

impl Config {
    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Parse a configuration from a JSON string.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Reject static configuration that cannot produce a meaningful run.
    ///
    /// A strategy with `max_position <= 0` and a non-zero inventory target is
    /// accepted; the strategy runs with skew disabled.
    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;
        self.cache.validate()?;

        let mut seen = HashSet::new();
        for strategy in &self.strategies {
            strategy.validate()?;
            if !seen.insert(strategy.symbol.as_str()) {
                return Err(Error::config(format!(
                    "duplicate strategy for symbol {}",
                    strategy.symbol
                )));
            }
        }
        Ok(())
    }
}

/// Engine and fill-simulation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Base slippage in basis points.
    pub base_slippage_bps: f64,
    /// Fixed lot size for every quote.
    pub lot_size: u64,
    /// Price improvement over the touch for each quote.
    pub price_improvement_increment: f64,
    /// Fraction of the touch within which a non-crossing limit still fills.
    pub relaxed_fill_threshold: f64,
    /// Volatility input to the slippage model.
    pub volatility: VolatilityConfig,
    /// Log progress every N ticks.
    pub progress_interval: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_slippage_bps: 0.5,
            lot_size: 100,
            price_improvement_increment: 0.01,
            relaxed_fill_threshold: 0.001,
            volatility: VolatilityConfig::default(),
            progress_interval: 10_000,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.base_slippage_bps.is_finite() || self.base_slippage_bps < 0.0 {
            return Err(Error::config(format!(
                "base_slippage_bps must be a non-negative number, got {}",
                self.base_slippage_bps
            )));
        }
        if self.lot_size == 0 {
            return Err(Error::config("lot_size must be positive"));
        }
        if !self.price_improvement_increment.is_finite() || self.price_improvement_increment <= 0.0
        {
            return Err(Error::config(format!(
                "price_improvement_increment must be positive, got {}",
                self.price_improvement_increment
            )));
        }
        if !(0.0..1.0).contains(&self.relaxed_fill_threshold) {
            return Err(Error::config(format!(
                "relaxed_fill_threshold must be in [0, 1), got {}",
                self.relaxed_fill_threshold
            )));
        }
        if self.progress_interval == 0 {
            return Err(Error::config("progress_interval must be positive"));
        }
        self.volatility.validate()
    }
}

/// Source of the volatility figure fed to the slippage model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum VolatilityConfig {
    /// A constant volatility for every fill.
    Fixed { value: f64 },
    /// Rolling stdev of log mid returns per symbol, `fallback` until warm.
    Rolling { window: usize, fallback: f64 },
}

impl Default for VolatilityConfig {
    fn default() -> Self {
        VolatilityConfig::Fixed { value: 0.01 }
    }
}

impl VolatilityConfig {
    pub fn validate(&self) -> Result<()> {
        match *self {
            VolatilityConfig::Fixed { value } => {
                if !value.is_finite() || value < 0.0 {
                    return Err(Error::config(format!("invalid fixed volatility {value}")));
                }
            }
            VolatilityConfig::Rolling { window, fallback } => {
                if window < 2 {
                    return Err(Error::config(format!(
                        "rolling volatility window must be at least 2, got {window}"
                    )));
                }
                if !fallback.is_finite() || fallback < 0.0 {
                    return Err(Error::config(format!(
                        "invalid fallback volatility {fallback}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Cache key expiry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Expiry of `md:{symbol}` entries, seconds.
    pub tick_ttl_secs: u64,
    /// Expiry of `trade:{n}` entries, seconds.
    pub trade_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            tick_ttl_secs: 60,
            trade_ttl_secs: 3600,
        }
    }
}

/// Longest accepted cache expiry: 365 days.
pub const MAX_CACHE_TTL_SECS: u64 = 365 * 24 * 60 * 60;

impl CacheConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, ttl) in [
            ("tick_ttl_secs", self.tick_ttl_secs),
            ("trade_ttl_secs", self.trade_ttl_secs),
        ] {
            if ttl == 0 || ttl > MAX_CACHE_TTL_SECS {
                return Err(Error::config(format!(
                    "{name} must be in 1..={MAX_CACHE_TTL_SECS}, got {ttl}"
                )));
            }
        }
        Ok(())
    }
}

/// Market-making strategy configuration for one symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Trading symbol.
    pub symbol: String,
    /// Target spread in basis points of mid.
    #[serde(default = "default_spread_bps")]
    pub spread_bps: f64,
    /// Absolute inventory bound checked at quote time.
    #[serde(default = "default_max_position")]
    pub max_position: i64,
    /// Inventory level the skew pulls towards.
    #[serde(default)]
    pub inventory_target: i64,
}

fn default_spread_bps() -> f64 {
    2.0
}

fn default_max_position() -> i64 {
    1000
}

impl StrategyConfig {
    /// Strategy for `symbol` with default parameters.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            spread_bps: default_spread_bps(),
            max_position: default_max_position(),
            inventory_target: 0,
        }
    }

    /// Whether inventory skew is active.
    pub fn skew_enabled(&self) -> bool {
        self.max_position > 0
    }

    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            return Err(Error::config("strategy symbol must not be empty"));
        }
        if !self.spread_bps.is_finite() || self.spread_bps < 0.0 {
            return Err(Error::config(format!(
                "{}: spread_bps must be non-negative, got {}",
                self.symbol, self.spread_bps
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.engine.base_slippage_bps, 0.5);
        assert_eq!(config.engine.lot_size, 100);
        assert_eq!(config.engine.relaxed_fill_threshold, 0.001);
        assert_eq!(config.cache.tick_ttl_secs, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_json() {
        let config = Config::from_json_str(
            r#"{
                "engine": { "lot_size": 50, "volatility": { "mode": "rolling", "window": 20, "fallback": 0.02 } },
                "strategies": [ { "symbol": "AAPL" }, { "symbol": "MSFT", "spread_bps": 4.0, "max_position": 500 } ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.engine.lot_size, 50);
        assert_eq!(config.engine.base_slippage_bps, 0.5);
        assert_eq!(
            config.engine.volatility,
            VolatilityConfig::Rolling { window: 20, fallback: 0.02 }
        );
        assert_eq!(config.strategies.len(), 2);
        assert_eq!(config.strategies[0].max_position, 1000);
        assert_eq!(config.strategies[1].spread_bps, 4.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_engine_config() {
        let mut config = Config::default();
        config.engine.lot_size = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = Config::default();
        config.engine.relaxed_fill_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.engine.volatility = VolatilityConfig::Rolling { window: 1, fallback: 0.01 };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_out_of_range_cache_ttl() {
        let mut config = Config::default();
        config.cache.tick_ttl_secs = u64::MAX;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = Config::default();
        config.cache.trade_ttl_secs = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = Config::default();
        config.cache.trade_ttl_secs = MAX_CACHE_TTL_SECS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_duplicate_symbols() {
        let config = Config {
            strategies: vec![StrategyConfig::new("AAPL"), StrategyConfig::new("AAPL")],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_positive_max_position_disables_skew() {
        let strategy = StrategyConfig {
            max_position: 0,
            inventory_target: 50,
            ..StrategyConfig::new("AAPL")
        };
        assert!(!strategy.skew_enabled());
        assert!(strategy.validate().is_ok());
    }
}
