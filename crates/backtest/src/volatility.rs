//! Volatility input for the slippage model.
//!
//! Either a configured constant or the standard deviation of log mid-price
//! returns over a rolling window of ticks, kept per symbol.

use std::collections::VecDeque;

use mmsim_core::config::VolatilityConfig;

/// Rolling standard deviation of log returns.
#[derive(Debug, Clone)]
pub struct RollingVolatility {
    /// Window size in periods.
    window: usize,
    /// Recent log returns.
    returns: VecDeque<f64>,
    /// Previous price (for computing next return).
    prev_price: Option<f64>,
    /// Running sum of returns (for mean).
    sum: f64,
    /// Running sum of squared returns (for variance).
    sum_sq: f64,
}

impl RollingVolatility {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            returns: VecDeque::with_capacity(window),
            prev_price: None,
            sum: 0.0,
            sum_sq: 0.0,
        }
    }

    /// Add a price observation. Non-positive prices reset the return chain.
    pub fn add_price(&mut self, price: f64) -> Option<f64> {
        if price <= 0.0 {
            self.prev_price = None;
            return self.volatility();
        }
        if let Some(prev) = self.prev_price {
            self.push_return((price / prev).ln());
        }
        self.prev_price = Some(price);
        self.volatility()
    }

    fn push_return(&mut self, ret: f64) {
        if self.returns.len() >= self.window {
            if let Some(old) = self.returns.pop_front() {
                self.sum -= old;
                self.sum_sq -= old * old;
            }
        }
        self.returns.push_back(ret);
        self.sum += ret;
        self.sum_sq += ret * ret;
    }

    /// Population stdev of the windowed returns; `None` with fewer than two.
    pub fn volatility(&self) -> Option<f64> {
        let n = self.returns.len();
        if n < 2 {
            return None;
        }
        let n_f = n as f64;
        let mean = self.sum / n_f;
        let variance = (self.sum_sq / n_f) - (mean * mean);
        // running sums can drift slightly negative
        if variance <= 0.0 {
            Some(0.0)
        } else {
            Some(variance.sqrt())
        }
    }

}

/// Per-symbol volatility source built from `VolatilityConfig`.
#[derive(Debug, Clone)]
pub enum VolatilityEstimator {
    Fixed(f64),
    Rolling {
        tracker: RollingVolatility,
        fallback: f64,
    },
}

impl VolatilityEstimator {
    pub fn from_config(config: &VolatilityConfig) -> Self {
        match *config {
            VolatilityConfig::Fixed { value } => VolatilityEstimator::Fixed(value),
            VolatilityConfig::Rolling { window, fallback } => VolatilityEstimator::Rolling {
                tracker: RollingVolatility::new(window),
                fallback,
            },
        }
    }

    /// Feed the latest mid price. No-op for the fixed source.
    pub fn observe(&mut self, mid: f64) {
        if let VolatilityEstimator::Rolling { tracker, .. } = self {
            tracker.add_price(mid);
        }
    }

    /// Current volatility figure.
    pub fn current(&self) -> f64 {
        match self {
            VolatilityEstimator::Fixed(value) => *value,
            VolatilityEstimator::Rolling { tracker, fallback } => {
                tracker.volatility().unwrap_or(*fallback)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_not_ready() {
        let vol = RollingVolatility::new(10);
        assert!(vol.returns.is_empty());
        assert!(vol.volatility().is_none());
    }

    #[test]
    fn test_constant_price() {
        let mut vol = RollingVolatility::new(5);
        for _ in 0..10 {
            vol.add_price(100.0);
        }
        assert_abs_diff_eq!(vol.volatility().unwrap(), 0.0, epsilon = 1e-12);
        assert_eq!(vol.returns.len(), 5);
    }

    #[test]
    fn test_rolling_window() {
        let mut vol = RollingVolatility::new(3);
        for price in [100.0, 101.0, 102.0, 103.0, 104.0] {
            vol.add_price(price);
        }
        assert_eq!(vol.returns.len(), 3);
        assert_abs_diff_eq!(vol.sum, (104.0_f64 / 101.0).ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_known_volatility() {
        let mut vol = RollingVolatility::new(3);
        // log returns 0.01, 0.02, 0.03 -> population stdev sqrt(0.0002 / 3)
        let mut price = 100.0_f64;
        vol.add_price(price);
        for r in [0.01_f64, 0.02, 0.03] {
            price *= r.exp();
            vol.add_price(price);
        }
        assert_abs_diff_eq!(vol.volatility().unwrap(), (0.0002_f64 / 3.0).sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_non_positive_price_breaks_chain() {
        let mut vol = RollingVolatility::new(5);
        vol.add_price(100.0);
        vol.add_price(0.0);
        vol.add_price(200.0);
        assert!(vol.returns.is_empty());
        assert_eq!(vol.prev_price, Some(200.0));
    }

    #[test]
    fn test_estimator_fixed_and_fallback() {
        let mut fixed = VolatilityEstimator::from_config(&VolatilityConfig::Fixed { value: 0.01 });
        fixed.observe(100.0);
        assert_eq!(fixed.current(), 0.01);

        let mut rolling = VolatilityEstimator::from_config(&VolatilityConfig::Rolling {
            window: 4,
            fallback: 0.03,
        });
        rolling.observe(100.0);
        rolling.observe(101.0);
        assert_eq!(rolling.current(), 0.03);
        rolling.observe(100.0);
        assert!(rolling.current() > 0.0 && rolling.current() != 0.03);
    }
}
