//! Single-level order book.
//!
//! Holds the latest top-of-book for one symbol. Every tick overwrites both
//! sides; nothing from earlier ticks is retained.

use mmsim_core::{MarketData, Quantity, TimestampNs};
use serde::Serialize;

/// Price/size pair on one side of the book.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Level {
    pub price: f64,
    pub size: Quantity,
}

impl Level {
    /// Sentinel bid before the first tick.
    pub const NO_BID: Level = Level {
        price: 0.0,
        size: 0,
    };

    /// Sentinel ask before the first tick.
    pub const NO_ASK: Level = Level {
        price: f64::INFINITY,
        size: 0,
    };
}

/// Latest top-of-book for one symbol.
#[derive(Debug, Clone)]
pub struct SimplifiedOrderBook {
    symbol: String,
    best_bid: Option<Level>,
    best_ask: Option<Level>,
    last_update: TimestampNs,
}

impl SimplifiedOrderBook {
    /// Create an empty book.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            best_bid: None,
            best_ask: None,
            last_update: 0,
        }
    }

    /// Replace both sides with the tick's top-of-book.
    pub fn update(&mut self, tick: &MarketData) {
        self.best_bid = Some(Level {
            price: tick.bid,
            size: tick.bid_size,
        });
        self.best_ask = Some(Level {
            price: tick.ask,
            size: tick.ask_size,
        });
        self.last_update = tick.timestamp;
    }

    /// Best bid, or `Level::NO_BID` before the first tick.
    pub fn best_bid(&self) -> Level {
        self.best_bid.unwrap_or(Level::NO_BID)
    }

    /// Best ask, or `Level::NO_ASK` before the first tick.
    pub fn best_ask(&self) -> Level {
        self.best_ask.unwrap_or(Level::NO_ASK)
    }

    /// Both sides present with a positive bid and a finite, positive ask.
    pub fn has_market(&self) -> bool {
        let ask = self.best_ask().price;
        self.best_bid().price > 0.0 && ask > 0.0 && ask.is_finite()
    }

    /// Mid price, or 0.0 when there is no market.
    pub fn mid_price(&self) -> f64 {
        if self.has_market() {
            (self.best_bid().price + self.best_ask().price) / 2.0
        } else {
            0.0
        }
    }

    /// Quoted spread, or 0.0 when there is no market.
    pub fn spread(&self) -> f64 {
        if self.has_market() {
            self.best_ask().price - self.best_bid().price
        } else {
            0.0
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Timestamp of the last applied tick (0 before the first).
    pub fn last_update(&self) -> TimestampNs {
        self.last_update
    }
}
