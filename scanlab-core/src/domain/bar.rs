//! Bar: the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OHLCV bar for a single symbol at a single instant.
///
/// A bar sequence for one symbol must be strictly increasing in `timestamp`
/// before any feature is computed from it (see [`validate_bars`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Returns true if any OHLCV field is NaN or infinite.
    pub fn is_void(&self) -> bool {
        !(self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite())
    }

    /// Finite and non-negative on every OHLCV field.
    pub fn is_sane(&self) -> bool {
        !self.is_void()
            && self.open >= 0.0
            && self.high >= 0.0
            && self.low >= 0.0
            && self.close >= 0.0
            && self.volume >= 0.0
    }
}

/// Malformed or insufficient bar sequence. Fails one symbol, never the batch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BarError {
    #[error("{symbol}: no bars")]
    Empty { symbol: String },

    #[error("{symbol}: {got} bars, at least {required} required")]
    InsufficientHistory {
        symbol: String,
        got: usize,
        required: usize,
    },

    #[error("{symbol}: timestamp at index {index} is not after the previous bar")]
    NonMonotonic { symbol: String, index: usize },

    #[error("{symbol}: non-finite or negative OHLCV at index {index}")]
    InvalidValue { symbol: String, index: usize },

    #[error("{symbol}: bar at index {index} belongs to '{found}'")]
    SymbolMismatch {
        symbol: String,
        index: usize,
        found: String,
    },
}

/// Check a bar sequence before feature computation.
///
/// Rejects empty input, fewer than `min_history` bars, timestamps that do not
/// strictly increase, non-finite or negative OHLCV values, and bars tagged
/// with a different symbol than `symbol`.
pub fn validate_bars(symbol: &str, bars: &[Bar], min_history: usize) -> Result<(), BarError> {
    if bars.is_empty() {
        return Err(BarError::Empty {
            symbol: symbol.to_string(),
        });
    }
    if bars.len() < min_history {
        return Err(BarError::InsufficientHistory {
            symbol: symbol.to_string(),
            got: bars.len(),
            required: min_history,
        });
    }

    for (i, bar) in bars.iter().enumerate() {
        if bar.symbol != symbol {
            return Err(BarError::SymbolMismatch {
                symbol: symbol.to_string(),
                index: i,
                found: bar.symbol.clone(),
            });
        }
        if !bar.is_sane() {
            return Err(BarError::InvalidValue {
                symbol: symbol.to_string(),
                index: i,
            });
        }
        if i > 0 && bar.timestamp <= bars[i - 1].timestamp {
            return Err(BarError::NonMonotonic {
                symbol: symbol.to_string(),
                index: i,
            });
        }
    }

    Ok(())
}
