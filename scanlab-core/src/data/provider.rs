//! Bar source trait and structured error types.
//!
//! `BarSource` abstracts over where bars come from (local CSV, local Parquet,
//! synthetic generator, in-memory fixtures) so the runner can swap them and
//! tests can inject data. A source must tell "no data for this symbol"
//! (`Ok(None)`) apart from a failure (`Err`): the first is a skip, the second
//! is reported as an error for that symbol. Neither aborts the run.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

use crate::domain::Bar;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("read {}: {message}", path.display())]
    Io { path: PathBuf, message: String },

    #[error("CSV error: {0}")]
    CsvError(String),

    #[error("parquet I/O error: {0}")]
    ParquetError(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("data error: {0}")]
    Other(String),
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    CsvImport,
    ParquetImport,
    Synthetic,
    Memory,
}

impl DataSource {
    /// Vendor tag written into alert provenance.
    pub fn vendor(&self) -> &'static str {
        match self {
            Self::CsvImport => "local_csv",
            Self::ParquetImport => "local_parquet",
            Self::Synthetic => "synthetic",
            Self::Memory => "memory",
        }
    }

    /// Feed tag written into alert provenance.
    pub fn feed(&self) -> &'static str {
        match self {
            Self::CsvImport | Self::ParquetImport => "file",
            Self::Synthetic => "demo",
            Self::Memory => "in_process",
        }
    }
}

/// Trait for bar sources.
pub trait BarSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    fn source(&self) -> DataSource;

    /// Bars for `symbol`, ascending by timestamp.
    ///
    /// `Ok(None)` means the source has nothing for the symbol.
    fn fetch(&self, symbol: &str) -> Result<Option<Vec<Bar>>, DataError>;
}

/// Optional latest reading of a volatility index.
///
/// Absence is normal and never fails regime classification.
pub trait VolatilitySource: Send + Sync {
    fn latest(&self) -> Result<Option<f64>, DataError>;
}

/// A volatility level fixed up front (e.g. from the command line).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FixedVolatility(pub Option<f64>);

impl VolatilitySource for FixedVolatility {
    fn latest(&self) -> Result<Option<f64>, DataError> {
        match self.0 {
            Some(v) if !v.is_finite() || v < 0.0 => Err(DataError::ValidationError(format!(
                "volatility level {v} must be finite and >= 0"
            ))),
            other => Ok(other),
        }
    }
}

/// Bars held in memory, keyed by symbol.
#[derive(Debug, Clone, Default)]
pub struct MemoryBarSource {
    bars: HashMap<String, Vec<Bar>>,
}

impl MemoryBarSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: impl Into<String>, bars: Vec<Bar>) {
        self.bars.insert(symbol.into(), bars);
    }

    pub fn with(mut self, symbol: impl Into<String>, bars: Vec<Bar>) -> Self {
        self.insert(symbol, bars);
        self
    }
}

impl BarSource for MemoryBarSource {
    fn name(&self) -> &str {
        "memory"
    }

    fn source(&self) -> DataSource {
        DataSource::Memory
    }

    fn fetch(&self, symbol: &str) -> Result<Option<Vec<Bar>>, DataError> {
        Ok(self.bars.get(symbol).cloned())
    }
}

/// Parse a bar timestamp: RFC 3339, or a bare `YYYY-MM-DD` taken as midnight UTC.
pub fn parse_timestamp(s: &str) -> Result<chrono::DateTime<chrono::Utc>, String> {
    use chrono::{DateTime, NaiveDate, Utc};

    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| format!("unparsable timestamp '{s}'"))
}
