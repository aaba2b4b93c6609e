//! Key-value cache capability for the engine.
//!
//! The engine only ever talks to `MarketDataCache`. Availability is checked
//! once with `ping` when the engine is built; every write is best-effort.
//!
//! Key scheme: `md:{symbol}` for the latest tick, `trade:{n}` for the n-th
//! trade (1-based). Values are flat string field maps.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::{Duration, Instant};

use chrono::Utc;
use mmsim_core::{Error, MarketData, Result, Side, Trade};
use rusqlite::{params, Connection, OptionalExtension};

/// Flat field map stored under one key.
pub type FieldMap = BTreeMap<String, String>;

/// Get / set-with-expiry store.
pub trait MarketDataCache {
    /// Whether the store is reachable.
    fn ping(&mut self) -> bool;

    /// Store `fields` under `key`, replacing any previous value.
    fn set_with_expiry(&mut self, key: &str, fields: &FieldMap, ttl: Duration) -> Result<()>;

    /// Fetch `key`; expired or missing keys read as `None`.
    fn get(&mut self, key: &str) -> Result<Option<FieldMap>>;
}

/// Key for the latest tick of `symbol`.
pub fn tick_key(symbol: &str) -> String {
    format!("md:{symbol}")
}

/// Key for the `n`-th trade.
pub fn trade_key(n: usize) -> String {
    format!("trade:{n}")
}

pub fn tick_fields(tick: &MarketData) -> FieldMap {
    let mut fields = FieldMap::new();
    fields.insert("bid".to_string(), tick.bid.to_string());
    fields.insert("ask".to_string(), tick.ask.to_string());
    fields.insert("bid_size".to_string(), tick.bid_size.to_string());
    fields.insert("ask_size".to_string(), tick.ask_size.to_string());
    fields.insert("timestamp".to_string(), tick.timestamp.to_string());
    fields
}

/// Rebuild a tick from its cached fields.
pub fn tick_from_fields(symbol: &str, fields: &FieldMap) -> Result<MarketData> {
    fn field<T: std::str::FromStr>(fields: &FieldMap, name: &str) -> Result<T> {
        fields
            .get(name)
            .ok_or_else(|| Error::cache(format!("cached tick missing field {name}")))?
            .parse()
            .map_err(|_| Error::cache(format!("cached tick field {name} is malformed")))
    }

    Ok(MarketData::quote(
        symbol,
        field(fields, "bid")?,
        field(fields, "ask")?,
        field(fields, "bid_size")?,
        field(fields, "ask_size")?,
        field(fields, "timestamp")?,
    ))
}

pub fn trade_fields(trade: &Trade) -> FieldMap {
    let side = match trade.side {
        Side::Buy => "BUY",
        Side::Sell => "SELL",
    };
    let mut fields = FieldMap::new();
    fields.insert("order_id".to_string(), trade.order_id.to_string());
    fields.insert("symbol".to_string(), trade.symbol.clone());
    fields.insert("side".to_string(), side.to_string());
    fields.insert("quantity".to_string(), trade.quantity.to_string());
    fields.insert("price".to_string(), trade.price.to_string());
    fields.insert("timestamp".to_string(), trade.timestamp.to_string());
    fields.insert("slippage".to_string(), trade.slippage.to_string());
    fields
}

/// Cache that is never available.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

impl MarketDataCache for NoopCache {
    fn ping(&mut self) -> bool {
        false
    }

    fn set_with_expiry(&mut self, _key: &str, _fields: &FieldMap, _ttl: Duration) -> Result<()> {
        Ok(())
    }

    fn get(&mut self, _key: &str) -> Result<Option<FieldMap>> {
        Ok(None)
    }
}

/// In-process cache with per-key expiry.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: HashMap<String, (FieldMap, Instant)>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys, expired ones included until read.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl MarketDataCache for MemoryCache {
    fn ping(&mut self) -> bool {
        true
    }

    fn set_with_expiry(&mut self, key: &str, fields: &FieldMap, ttl: Duration) -> Result<()> {
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| Error::cache(format!("{key}: expiry {ttl:?} out of range")))?;
        self.entries
            .insert(key.to_string(), (fields.clone(), expires_at));
        Ok(())
    }

    fn get(&mut self, key: &str) -> Result<Option<FieldMap>> {
        let expired = match self.entries.get(key) {
            Some((_, expires_at)) => Instant::now() >= *expires_at,
            None => return Ok(None),
        };
        if expired {
            self.entries.remove(key);
            return Ok(None);
        }
        Ok(self.entries.get(key).map(|(fields, _)| fields.clone()))
    }
}

/// SQLite-backed cache. Fields are stored as a JSON object; expiry is a
/// wall-clock unix timestamp in milliseconds.
pub struct SqliteCache {
    conn: Connection,
}

fn sqlite_err(e: rusqlite::Error) -> Error {
    Error::cache(e.to_string())
}

impl SqliteCache {
    /// Open (or create) a cache database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::init(Connection::open(path).map_err(sqlite_err)?)
    }

    /// Private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory().map_err(sqlite_err)?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                fields TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            )",
        )
        .map_err(sqlite_err)?;
        Ok(Self { conn })
    }

    /// Delete expired rows. Returns the number removed.
    pub fn purge_expired(&mut self) -> Result<usize> {
        self.conn
            .execute(
                "DELETE FROM kv WHERE expires_at <= ?1",
                params![Utc::now().timestamp_millis()],
            )
            .map_err(sqlite_err)
    }
}

impl MarketDataCache for SqliteCache {
    fn ping(&mut self) -> bool {
        self.conn
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .is_ok()
    }

    fn set_with_expiry(&mut self, key: &str, fields: &FieldMap, ttl: Duration) -> Result<()> {
        let expires_at = i64::try_from(ttl.as_millis())
            .ok()
            .and_then(|ms| Utc::now().timestamp_millis().checked_add(ms))
            .ok_or_else(|| Error::cache(format!("{key}: expiry {ttl:?} out of range")))?;
        let json = serde_json::to_string(fields)?;
        self.conn
            .execute(
                "INSERT INTO kv (key, fields, expires_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET fields = excluded.fields, expires_at = excluded.expires_at",
                params![key, json, expires_at],
            )
            .map_err(sqlite_err)?;
        Ok(())
    }

    fn get(&mut self, key: &str) -> Result<Option<FieldMap>> {
        let row = self
            .conn
            .query_row(
                "SELECT fields, expires_at FROM kv WHERE key = ?1",
                params![key],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()
            .map_err(sqlite_err)?;

        match row {
            Some((json, expires_at)) if expires_at > Utc::now().timestamp_millis() => {
                Ok(Some(serde_json::from_str(&json)?))
            }
            _ => Ok(None),
        }
    }
}
