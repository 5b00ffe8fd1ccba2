//! Feature assembler.
//!
//! Runs the indicator engine over a full bar sequence and appends the derived
//! columns the regime classifier and strategy evaluators read. Raw OHLCV fields
//! are carried through untouched.
//!
//! Undefined values are `None`. A row is *complete* once every window-bound
//! field is defined; the ratio fields (`rsi14`, `z20`, `vol_multiple`) may stay
//! undefined on a complete row when their denominator is zero.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::domain::Bar;
use crate::indicators::{
    moving_average, volumes, Atr, BollingerZ, Indicator, Roc, RollingHigh, Rsi, Sma,
};

pub const MA_FAST: usize = 20;
pub const MA_MID: usize = 50;
pub const MA_SLOW: usize = 200;
pub const ATR_PERIOD: usize = 14;
pub const RSI_PERIOD: usize = 14;
pub const BOLLINGER_PERIOD: usize = 20;
pub const RET_SHORT: usize = 20;
pub const RET_LONG: usize = 60;
pub const HIGH_WINDOW: usize = 20;
pub const VOLUME_WINDOW: usize = 20;
/// Bars between the two ma50 readings of the slope proxy.
pub const SLOPE_SHIFT: usize = 20;

/// Named feature columns, in assembly order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Ma20,
    Ma50,
    Ma200,
    Atr14,
    Rsi14,
    Z20,
    Ret20,
    Ret60,
    High20,
    Vol20,
    VolMultiple,
    Ma50Slope,
}

impl Feature {
    /// Fields that only depend on a window having elapsed.
    pub const WINDOW_BOUND: [Feature; 9] = [
        Feature::Ma20,
        Feature::Ma50,
        Feature::Ma200,
        Feature::Atr14,
        Feature::Ret20,
        Feature::Ret60,
        Feature::High20,
        Feature::Vol20,
        Feature::Ma50Slope,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ma20 => "ma20",
            Self::Ma50 => "ma50",
            Self::Ma200 => "ma200",
            Self::Atr14 => "atr14",
            Self::Rsi14 => "rsi14",
            Self::Z20 => "z20",
            Self::Ret20 => "ret20",
            Self::Ret60 => "ret60",
            Self::High20 => "high20",
            Self::Vol20 => "vol20",
            Self::VolMultiple => "vol_multiple",
            Self::Ma50Slope => "ma50_slope",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    #[error("{symbol}: no fully-defined feature row in {bars} bars")]
    NoCompleteRow { symbol: String, bars: usize },

    #[error("feature '{0}' is undefined on the latest row")]
    Undefined(Feature),
}

/// One bar extended with its derived features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub bar: Bar,
    pub ma20: Option<f64>,
    pub ma50: Option<f64>,
    pub ma200: Option<f64>,
    pub atr14: Option<f64>,
    pub rsi14: Option<f64>,
    pub z20: Option<f64>,
    pub ret20: Option<f64>,
    pub ret60: Option<f64>,
    pub high20: Option<f64>,
    pub vol20: Option<f64>,
    pub vol_multiple: Option<f64>,
    pub ma50_slope: Option<f64>,
}

impl FeatureRow {
    pub fn close(&self) -> f64 {
        self.bar.close
    }

    pub fn get(&self, feature: Feature) -> Option<f64> {
        match feature {
            Feature::Ma20 => self.ma20,
            Feature::Ma50 => self.ma50,
            Feature::Ma200 => self.ma200,
            Feature::Atr14 => self.atr14,
            Feature::Rsi14 => self.rsi14,
            Feature::Z20 => self.z20,
            Feature::Ret20 => self.ret20,
            Feature::Ret60 => self.ret60,
            Feature::High20 => self.high20,
            Feature::Vol20 => self.vol20,
            Feature::VolMultiple => self.vol_multiple,
            Feature::Ma50Slope => self.ma50_slope,
        }
    }

    /// Defined value of `feature`, or `FeatureError::Undefined`.
    pub fn require(&self, feature: Feature) -> Result<f64, FeatureError> {
        self.get(feature).ok_or(FeatureError::Undefined(feature))
    }

    /// True once every window-bound field is defined.
    pub fn is_complete(&self) -> bool {
        Feature::WINDOW_BOUND.iter().all(|f| self.get(*f).is_some())
    }
}

/// Feature rows for one symbol, in bar order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub symbol: String,
    pub rows: Vec<FeatureRow>,
}

impl FeatureSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Most recent complete row, if any.
    pub fn latest_complete(&self) -> Option<&FeatureRow> {
        self.rows.iter().rev().find(|r| r.is_complete())
    }

    /// Most recent complete row, or `FeatureError::NoCompleteRow`.
    pub fn latest(&self) -> Result<&FeatureRow, FeatureError> {
        self.latest_complete()
            .ok_or_else(|| FeatureError::NoCompleteRow {
                symbol: self.symbol.clone(),
                bars: self.rows.len(),
            })
    }
}

fn defined(v: f64) -> Option<f64> {
    if v.is_finite() {
        Some(v)
    } else {
        None
    }
}

/// Number of leading bars that can never produce a complete row.
pub fn warmup_bars() -> usize {
    let indicators: [Box<dyn Indicator>; 7] = [
        Box::new(Sma::new(MA_FAST)),
        Box::new(Sma::new(MA_MID)),
        Box::new(Sma::new(MA_SLOW)),
        Box::new(Atr::new(ATR_PERIOD)),
        Box::new(Roc::new(RET_SHORT)),
        Box::new(Roc::new(RET_LONG)),
        Box::new(RollingHigh::new(HIGH_WINDOW)),
    ];
    let slope = Sma::new(MA_MID).lookback() + SLOPE_SHIFT;
    let volume = VOLUME_WINDOW.saturating_sub(1);
    indicators
        .iter()
        .map(|i| i.lookback())
        .chain([slope, volume])
        .max()
        .unwrap_or(0)
}

/// Compute the feature set for one symbol's bar sequence.
///
/// Expects bars already checked by `validate_bars`; the symbol is taken from
/// the argument, not from the bars.
pub fn compute_features(symbol: &str, bars: &[Bar]) -> FeatureSet {
    let ma20 = Sma::new(MA_FAST).compute(bars);
    let ma50 = Sma::new(MA_MID).compute(bars);
    let ma200 = Sma::new(MA_SLOW).compute(bars);
    let atr14 = Atr::new(ATR_PERIOD).compute(bars);
    let rsi14 = Rsi::new(RSI_PERIOD).compute(bars);
    let z20 = BollingerZ::new(BOLLINGER_PERIOD).compute(bars);
    let ret20 = Roc::new(RET_SHORT).compute(bars);
    let ret60 = Roc::new(RET_LONG).compute(bars);
    let high20 = RollingHigh::new(HIGH_WINDOW).compute(bars);
    let vol20 = moving_average(&volumes(bars), VOLUME_WINDOW);

    let rows = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let vol_multiple = if vol20[i] > 0.0 {
                defined(bar.volume / vol20[i])
            } else {
                None
            };
            let ma50_slope = if i >= SLOPE_SHIFT && bar.close != 0.0 {
                defined((ma50[i] - ma50[i - SLOPE_SHIFT]) / bar.close)
            } else {
                None
            };
            FeatureRow {
                bar: bar.clone(),
                ma20: defined(ma20[i]),
                ma50: defined(ma50[i]),
                ma200: defined(ma200[i]),
                atr14: defined(atr14[i]),
                rsi14: defined(rsi14[i]),
                z20: defined(z20[i]),
                ret20: defined(ret20[i]),
                ret60: defined(ret60[i]),
                high20: defined(high20[i]),
                vol20: defined(vol20[i]),
                vol_multiple,
                ma50_slope,
            }
        })
        .collect();

    FeatureSet {
        symbol: symbol.to_string(),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars};

    fn rising(n: usize) -> Vec<Bar> {
        let closes: Vec<f64> = (0..n).map(|i| 100.0 + i as f64 * 0.5).collect();
        make_bars(&closes)
    }

    #[test]
    fn warmup_is_ma200_window() {
        assert_eq!(warmup_bars(), MA_SLOW - 1);
    }

    #[test]
    fn first_complete_row_is_at_warmup() {
        let set = compute_features("TEST", &rising(260));
        let first = set.rows.iter().position(|r| r.is_complete()).unwrap();
        assert_eq!(first, warmup_bars());
    }

    #[test]
    fn too_short_has_no_complete_row() {
        let set = compute_features("TEST", &rising(150));
        assert!(set.latest_complete().is_none());
        assert_eq!(
            set.latest(),
            Err(FeatureError::NoCompleteRow {
                symbol: "TEST".into(),
                bars: 150
            })
        );
    }

    #[test]
    fn raw_fields_are_untouched() {
        let bars = rising(30);
        let set = compute_features("TEST", &bars);
        for (row, bar) in set.rows.iter().zip(&bars) {
            assert_eq!(&row.bar, bar);
        }
    }

    #[test]
    fn rising_series_has_breakout_and_positive_slope() {
        let set = compute_features("TEST", &rising(260));
        let last = set.latest().unwrap();
        assert_eq!(last.high20, Some(last.close()));
        assert!(last.ma50_slope.unwrap() > 0.0);
        // no down-moves at all
        assert_eq!(last.rsi14, None);
        assert_approx(last.vol_multiple.unwrap(), 1.0, 1e-12);
    }

    #[test]
    fn zero_volume_leaves_vol_multiple_undefined() {
        let mut bars = rising(30);
        for b in &mut bars {
            b.volume = 0.0;
        }
        let set = compute_features("TEST", &bars);
        assert!(set.rows.iter().all(|r| r.vol_multiple.is_none()));
        assert_eq!(set.rows[29].vol20, Some(0.0));
    }

    #[test]
    fn slope_matches_definition() {
        let set = compute_features("TEST", &rising(120));
        let i = 100;
        let row = &set.rows[i];
        let expected =
            (row.ma50.unwrap() - set.rows[i - SLOPE_SHIFT].ma50.unwrap()) / row.close();
        assert_approx(row.ma50_slope.unwrap(), expected, 1e-12);
    }

    #[test]
    fn slope_needs_fifty_bars_plus_shift() {
        let set = compute_features("TEST", &rising(120));
        assert_eq!(set.rows[68].ma50_slope, None);
        assert!(set.rows[69].ma50_slope.is_some());
    }

    #[test]
    fn zero_close_leaves_slope_undefined() {
        let mut bars = rising(260);
        bars[259].close = 0.0;
        let set = compute_features("TEST", &bars);

        assert_eq!(set.rows[259].ma50_slope, None);
        assert!(!set.rows[259].is_complete());
        // Falls back to the last row that is still complete
        let last = set.latest().unwrap();
        assert_eq!(last.bar.timestamp, bars[258].timestamp);
        assert!(last.ma50_slope.is_some());
    }

    #[test]
    fn require_reports_missing_field() {
        let set = compute_features("TEST", &rising(10));
        assert_eq!(
            set.rows[9].require(Feature::Ma20),
            Err(FeatureError::Undefined(Feature::Ma20))
        );
        assert_eq!(Feature::VolMultiple.to_string(), "vol_multiple");
    }
}
