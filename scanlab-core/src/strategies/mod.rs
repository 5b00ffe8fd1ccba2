//! Strategy evaluators.
//!
//! An evaluator looks at one symbol's latest complete feature row and either
//! produces exactly one [`AlertCandidate`] or declines. Declining (`Ok(None)`)
//! means the setup condition was not met. An `Err` means the inputs were not
//! good enough to decide: no complete row, a required field undefined, or a
//! score map missing.
//!
//! Evaluators hold no mutable state and never look at other symbols, so the
//! runner may call them from any thread.

pub mod breakout;
pub mod rs_rotation;

pub use breakout::TrendBreakout;
pub use rs_rotation::RsRotation;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::{ConfigError, ScanConfig, StrategyConfig};
use crate::domain::{AlertCandidate, PositionSizing, StopPlan, StopType};
use crate::features::{FeatureError, FeatureRow, FeatureSet};
use crate::regime::Regime;
use crate::scoring::score_map::{AVG_DOLLAR_VOLUME_20D, RR, TREND_STRUCTURE_POINTS};
use crate::scoring::ScoreMaps;

/// Sub-score given for fit with the prevailing regime. Evaluators only run in
/// regimes their configuration allows, so the fit is taken as high.
pub const REGIME_FIT_ALLOWED: f64 = 90.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyKind {
    TrendBreakout,
    RsRotation,
}

impl StrategyKind {
    /// Evaluation order within a symbol.
    pub const ALL: [StrategyKind; 2] = [StrategyKind::TrendBreakout, StrategyKind::RsRotation];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TrendBreakout => "TREND_BREAKOUT",
            Self::RsRotation => "RS_ROTATION",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TREND_BREAKOUT" => Ok(Self::TrendBreakout),
            "RS_ROTATION" => Ok(Self::RsRotation),
            other => Err(format!("unknown strategy '{other}'")),
        }
    }
}

#[derive(Debug, Error)]
pub enum EvalError {
    #[error(transparent)]
    Feature(#[from] FeatureError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Read-only inputs shared by every evaluation in a run.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub config: &'a ScanConfig,
    pub maps: &'a ScoreMaps,
    /// Latest complete row of the benchmark.
    pub benchmark: &'a FeatureRow,
    pub regime: Regime,
}

impl<'a> EvalContext<'a> {
    pub fn strategy_config(&self, kind: StrategyKind) -> &'a StrategyConfig {
        self.config.strategies.get(kind)
    }

    pub fn position_sizing(&self, kind: StrategyKind) -> Result<PositionSizing, ConfigError> {
        let pool = self.config.pool(&self.strategy_config(kind).pool_default)?;
        Ok(PositionSizing {
            max_risk_pct_of_equity: pool.max_risk_pct_of_equity,
        })
    }
}

/// Trait for strategy evaluators.
///
/// # Contract
/// `evaluate` reads only `features` (the symbol's own rows) and `ctx`. It
/// must be deterministic: the same inputs always give the same candidate.
pub trait Strategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    fn name(&self) -> &str {
        self.kind().as_str()
    }

    fn evaluate(
        &self,
        symbol: &str,
        features: &FeatureSet,
        ctx: &EvalContext<'_>,
    ) -> Result<Option<AlertCandidate>, EvalError>;
}

/// Create the evaluator for a strategy kind.
pub fn create_strategy(kind: StrategyKind) -> Box<dyn Strategy> {
    match kind {
        StrategyKind::TrendBreakout => Box::new(TrendBreakout),
        StrategyKind::RsRotation => Box::new(RsRotation),
    }
}

/// Evaluators that are enabled and allowed under `regime`, in evaluation order.
pub fn active_strategies(config: &ScanConfig, regime: Regime) -> Vec<Box<dyn Strategy>> {
    StrategyKind::ALL
        .into_iter()
        .filter(|k| config.strategies.get(*k).runs_in(regime))
        .map(create_strategy)
        .collect()
}

// ─── Shared scoring pieces ───────────────────────────────────────────

/// Number of true checks.
pub(crate) fn count_points(checks: &[bool]) -> u32 {
    checks.iter().filter(|c| **c).count() as u32
}

pub(crate) fn trend_structure_score(maps: &ScoreMaps, points: u32) -> Result<f64, ConfigError> {
    maps.score(TREND_STRUCTURE_POINTS, f64::from(points))
}

pub(crate) fn risk_reward_score(maps: &ScoreMaps, min_rr: f64) -> Result<f64, ConfigError> {
    maps.score(RR, min_rr)
}

/// Liquidity sub-score on the close × vol20 dollar-volume proxy.
pub(crate) fn liquidity_score(maps: &ScoreMaps, close: f64, vol20: f64) -> Result<f64, ConfigError> {
    maps.score(AVG_DOLLAR_VOLUME_20D, close * vol20)
}

/// ATR stop below `reference`.
pub(crate) fn atr_stop(reference: f64, atr14: f64, multiple: f64) -> StopPlan {
    StopPlan {
        stop_type: StopType::VolatilityAtr,
        atr_multiple: multiple,
        stop_price: reference - atr14 * multiple,
    }
}
