//! Universe selection: which symbols are scanned and which survive the
//! price and liquidity floor.
//!
//! Exclusions apply before any data is loaded. The price and dollar-volume
//! floor applies to the latest complete feature row; a symbol that fails it is
//! skipped, not treated as an error.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::config::ConfigError;
use crate::features::{Feature, FeatureError, FeatureRow};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UniverseFilter {
    pub min_price: f64,
    /// Floor on close × 20-bar average volume.
    pub min_avg_dollar_volume_20d: f64,
    #[serde(default)]
    pub exclude_symbols: Vec<String>,
}

/// Why a symbol did or did not pass the floor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterVerdict {
    Passed,
    BelowMinPrice { close: f64, min: f64 },
    BelowMinDollarVolume { dollar_volume: f64, min: f64 },
}

impl FilterVerdict {
    pub fn passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

impl fmt::Display for FilterVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => write!(f, "passed"),
            Self::BelowMinPrice { close, min } => {
                write!(f, "close {close:.2} below min_price {min:.2}")
            }
            Self::BelowMinDollarVolume { dollar_volume, min } => write!(
                f,
                "avg dollar volume {dollar_volume:.0} below min_avg_dollar_volume_20d {min:.0}"
            ),
        }
    }
}

impl UniverseFilter {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, v) in [
            ("universe_filter.min_price", self.min_price),
            (
                "universe_filter.min_avg_dollar_volume_20d",
                self.min_avg_dollar_volume_20d,
            ),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(ConfigError::Invalid {
                    key: key.into(),
                    message: format!("{v} must be finite and >= 0"),
                });
            }
        }
        Ok(())
    }

    pub fn is_excluded(&self, symbol: &str) -> bool {
        self.exclude_symbols
            .iter()
            .any(|s| s.eq_ignore_ascii_case(symbol))
    }

    /// Price and dollar-volume floor on the latest complete row.
    pub fn check(&self, row: &FeatureRow) -> Result<FilterVerdict, FeatureError> {
        let close = row.close();
        let vol20 = row.require(Feature::Vol20)?;
        if close < self.min_price {
            return Ok(FilterVerdict::BelowMinPrice {
                close,
                min: self.min_price,
            });
        }
        let dollar_volume = close * vol20;
        if dollar_volume < self.min_avg_dollar_volume_20d {
            return Ok(FilterVerdict::BelowMinDollarVolume {
                dollar_volume,
                min: self.min_avg_dollar_volume_20d,
            });
        }
        Ok(FilterVerdict::Passed)
    }

    /// Symbols to scan, in the order given: excluded symbols, the benchmark,
    /// and repeats are removed. Symbols are upper-cased.
    pub fn resolve_symbols<S: AsRef<str>>(&self, requested: &[S], benchmark: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        requested
            .iter()
            .map(|s| s.as_ref().trim().to_ascii_uppercase())
            .filter(|s| !s.is_empty())
            .filter(|s| !s.eq_ignore_ascii_case(benchmark))
            .filter(|s| !self.is_excluded(s))
            .filter(|s| seen.insert(s.clone()))
            .collect()
    }
}

/// Convenience for `filter.check(row)` collapsed to pass/fail.
pub fn passes_universe_filters(row: &FeatureRow, filter: &UniverseFilter) -> Result<bool, FeatureError> {
    Ok(filter.check(row)?.passed())
}
