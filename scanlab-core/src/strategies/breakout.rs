//! Trend breakout: long when the close makes a new 20-bar closing high inside
//! an established uptrend.
//!
//! Trend structure is four checks (close > ma50, ma50 > ma200, rising ma50,
//! breakout) mapped through `trend_structure_points`. Volume flow comes from
//! the volume multiple; the trade plan enters on the confirming close and is
//! invalidated by a close back below the 20-bar high.

use crate::domain::{
    Action, AlertCandidate, Direction, EntryPlan, Invalidation, InvalidationRule, Target,
    TradePlan,
};
use crate::features::{Feature, FeatureSet};
use crate::scoring::score_map::VOLUME_MULTIPLE;
use crate::scoring::ComponentScores;

use super::{
    atr_stop, count_points, liquidity_score, risk_reward_score, trend_structure_score, EvalContext,
    EvalError, Strategy, StrategyKind, REGIME_FIT_ALLOWED,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct TrendBreakout;

impl Strategy for TrendBreakout {
    fn kind(&self) -> StrategyKind {
        StrategyKind::TrendBreakout
    }

    fn evaluate(
        &self,
        symbol: &str,
        features: &FeatureSet,
        ctx: &EvalContext<'_>,
    ) -> Result<Option<AlertCandidate>, EvalError> {
        let cfg = ctx.strategy_config(self.kind());
        let params = &cfg.params;
        let row = features.latest()?;

        let close = row.close();
        let ma50 = row.require(Feature::Ma50)?;
        let ma200 = row.require(Feature::Ma200)?;
        let slope = row.require(Feature::Ma50Slope)?;
        let high20 = row.require(Feature::High20)?;
        let atr14 = row.require(Feature::Atr14)?;
        let vol20 = row.require(Feature::Vol20)?;
        let vol_multiple = row.require(Feature::VolMultiple)?;

        let breakout = close >= high20;
        if !breakout && params.require_close_confirm {
            return Ok(None);
        }

        let points = count_points(&[close > ma50, ma50 > ma200, slope > 0.0, breakout]);
        let components = ComponentScores {
            regime_fit: REGIME_FIT_ALLOWED,
            trend_momo: trend_structure_score(ctx.maps, points)?,
            mean_reversion: 0.0,
            volume_flow: ctx.maps.score(VOLUME_MULTIPLE, vol_multiple)?,
            risk_reward: risk_reward_score(ctx.maps, params.min_rr)?,
            liquidity: liquidity_score(ctx.maps, close, vol20)?,
            event_risk_penalty: 0.0,
        };

        let targets = if params.targets.is_empty() {
            vec![Target {
                name: "T1".into(),
                rr: params.min_rr,
                size_pct: 1.0,
            }]
        } else {
            params.targets.clone()
        };

        let trade_plan = TradePlan {
            entry: EntryPlan::CloseConfirm {
                trigger_price: close,
            },
            invalidation: Invalidation {
                rule: InvalidationRule::CloseBelowLevel,
                price: high20,
            },
            stop: atr_stop(close, atr14, params.stop_atr_multiple),
            targets,
            position_sizing: ctx.position_sizing(self.kind())?,
        };

        let breakout_line = if breakout {
            "Breakout condition met (close>=20D high proxy)"
        } else {
            "Breakout condition not met (close<20D high proxy)"
        };

        Ok(Some(AlertCandidate {
            symbol: symbol.to_string(),
            setup_name: self.name().to_string(),
            pool: cfg.pool_default.clone(),
            direction: Direction::Long,
            action: Action::Buy,
            components,
            evidence: vec![
                breakout_line.to_string(),
                format!("Volume multiple: {vol_multiple:.2}"),
                format!("Trend structure points: {points}/4"),
            ],
            trade_plan,
        }))
    }
}
