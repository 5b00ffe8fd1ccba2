//! Local CSV bar files: `{dir}/{SYMBOL}_{interval}.csv`.
//!
//! Header: `timestamp,open,high,low,close,volume`. Timestamps are RFC 3339 or
//! `YYYY-MM-DD`. A missing or row-less file is "no data".

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::provider::{parse_timestamp, BarSource, DataError, DataSource};
use crate::domain::Bar;

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

#[derive(Debug, Clone)]
pub struct CsvBarSource {
    dir: PathBuf,
    interval: String,
}

impl CsvBarSource {
    pub fn new(dir: impl Into<PathBuf>, interval: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            interval: interval.into(),
        }
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}_{}.csv", self.interval))
    }
}

/// Read every row of a bar CSV. Rows are returned in file order.
pub fn read_bars_csv(symbol: &str, path: &Path) -> Result<Vec<Bar>, DataError> {
    let file = fs::File::open(path).map_err(|e| DataError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut bars = Vec::new();
    for (i, record) in reader.deserialize::<CsvRow>().enumerate() {
        let row = record.map_err(|e| DataError::CsvError(format!("{}: {e}", path.display())))?;
        let timestamp = parse_timestamp(&row.timestamp)
            .map_err(|e| DataError::CsvError(format!("{} row {}: {e}", path.display(), i + 1)))?;
        bars.push(Bar {
            symbol: symbol.to_string(),
            timestamp,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        });
    }
    Ok(bars)
}

impl BarSource for CsvBarSource {
    fn name(&self) -> &str {
        "csv"
    }

    fn source(&self) -> DataSource {
        DataSource::CsvImport
    }

    fn fetch(&self, symbol: &str) -> Result<Option<Vec<Bar>>, DataError> {
        let path = self.path_for(symbol);
        if !path.exists() {
            return Ok(None);
        }
        let bars = read_bars_csv(symbol, &path)?;
        Ok(if bars.is_empty() { None } else { Some(bars) })
    }
}
