//! Market regime classification from the benchmark's latest complete row.
//!
//! Pure and deterministic: the same row and volatility level always give the
//! same label and reasons. The classifier must finish before any strategy is
//! evaluated, since `allowed_regimes` gates every evaluator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::features::{Feature, FeatureError, FeatureRow, FeatureSet};

/// Volatility-index level at or above which a trending or risk-off market is
/// relabelled HIGH_VOL.
pub const HIGH_VOL_LEVEL: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Regime {
    Trend,
    RiskOff,
    HighVol,
    Range,
}

impl Regime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trend => "TREND",
            Self::RiskOff => "RISK_OFF",
            Self::HighVol => "HIGH_VOL",
            Self::Range => "RANGE",
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Regime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TREND" => Ok(Self::Trend),
            "RISK_OFF" => Ok(Self::RiskOff),
            "HIGH_VOL" => Ok(Self::HighVol),
            "RANGE" => Ok(Self::Range),
            other => Err(format!("unknown regime '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegimeReason {
    CloseAboveMa200,
    Ma50AboveMa200,
    CloseBelowMa200,
    #[serde(rename = "vix_ge_30")]
    VixGe30,
    FallbackRange,
}

/// Classifier output. Immutable once produced; recomputed every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeResult {
    pub regime: Regime,
    pub reasons: Vec<RegimeReason>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegimeError {
    #[error("benchmark has no usable row: {0}")]
    NoUsableRow(#[from] FeatureError),
}

/// Classify the regime from a single benchmark row.
pub fn classify_row(row: &FeatureRow, volatility: Option<f64>) -> Result<RegimeResult, RegimeError> {
    let close = row.close();
    let ma50 = row.require(Feature::Ma50)?;
    let ma200 = row.require(Feature::Ma200)?;

    let close_above_ma200 = close > ma200;
    let ma50_above_ma200 = ma50 > ma200;
    let high_vol = volatility.is_some_and(|v| v >= HIGH_VOL_LEVEL);

    let (base, mut reasons) = if close_above_ma200 && ma50_above_ma200 {
        (
            Regime::Trend,
            vec![RegimeReason::CloseAboveMa200, RegimeReason::Ma50AboveMa200],
        )
    } else if !close_above_ma200 {
        (Regime::RiskOff, vec![RegimeReason::CloseBelowMa200])
    } else {
        return Ok(RegimeResult {
            regime: Regime::Range,
            reasons: vec![RegimeReason::FallbackRange],
        });
    };

    if high_vol {
        reasons.push(RegimeReason::VixGe30);
        return Ok(RegimeResult {
            regime: Regime::HighVol,
            reasons,
        });
    }

    Ok(RegimeResult {
        regime: base,
        reasons,
    })
}

/// Classify the regime from the benchmark's latest complete row.
///
/// Fails when the benchmark has no complete row; the whole run depends on it.
pub fn classify_regime(
    benchmark: &FeatureSet,
    volatility: Option<f64>,
) -> Result<RegimeResult, RegimeError> {
    let row = benchmark.latest()?;
    classify_row(row, volatility)
}
