//! JSON-lines tick loader.
//!
//! One `MarketData` object per line. Malformed lines are skipped and counted,
//! never fatal. Timestamps are checked for ordering but the stream is kept in
//! file order.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use mmsim_core::{MarketData, Result, TimestampNs};
use serde::Serialize;
use tracing::{info, warn};

/// Statistics about a load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    /// Ticks parsed successfully.
    pub loaded: u64,
    /// Lines that failed to parse.
    pub skipped: u64,
    /// Ticks whose timestamp went backwards.
    pub out_of_order: u64,
}

impl LoadStats {
    /// Whether the loaded stream is non-decreasing in time.
    pub fn is_ordered(&self) -> bool {
        self.out_of_order == 0
    }
}

/// Load ticks from a JSON-lines file.
pub fn load_json_lines(path: impl AsRef<Path>) -> Result<(Vec<MarketData>, LoadStats)> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let (ticks, stats) = parse_json_lines(BufReader::new(file))?;
    info!(
        path = %path.display(),
        loaded = stats.loaded,
        skipped = stats.skipped,
        out_of_order = stats.out_of_order,
        "Loaded ticks"
    );
    Ok((ticks, stats))
}

/// Parse ticks from any buffered reader.
///
/// Only I/O failures are returned as errors.
pub fn parse_json_lines<R: BufRead>(reader: R) -> Result<(Vec<MarketData>, LoadStats)> {
    let mut ticks = Vec::new();
    let mut stats = LoadStats::default();
    let mut last_ts: Option<TimestampNs> = None;

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match serde_json::from_str::<MarketData>(trimmed) {
            Ok(tick) => {
                if let Some(prev) = last_ts {
                    if tick.timestamp < prev {
                        stats.out_of_order += 1;
                        warn!(
                            line = idx + 1,
                            timestamp = tick.timestamp,
                            previous = prev,
                            "Tick timestamp goes backwards"
                        );
                    }
                }
                last_ts = Some(last_ts.map_or(tick.timestamp, |p| p.max(tick.timestamp)));
                stats.loaded += 1;
                ticks.push(tick);
            }
            Err(e) => {
                stats.skipped += 1;
                warn!(line = idx + 1, error = %e, "Skipping malformed tick");
            }
        }
    }

    Ok((ticks, stats))
}
