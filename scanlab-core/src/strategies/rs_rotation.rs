//! Relative-strength rotation: watchlist longs for symbols outrunning the
//! benchmark over 60 bars while their own trend is healthy.
//!
//! The percentile is a bucket proxy on the 60-bar return spread, not a rank
//! across the scanned universe.

use crate::domain::{
    Action, AlertCandidate, Direction, EntryPlan, Invalidation, InvalidationRule, Target,
    TradePlan,
};
use crate::features::{Feature, FeatureSet};
use crate::scoring::score_map::RS_PERCENTILE;
use crate::scoring::ComponentScores;

use super::{
    atr_stop, count_points, liquidity_score, risk_reward_score, trend_structure_score, EvalContext,
    EvalError, Strategy, StrategyKind, REGIME_FIT_ALLOWED,
};

/// Volume flow is not assessed by this setup; it gets the neutral midpoint.
pub const NEUTRAL_VOLUME_FLOW: f64 = 50.0;

const RS_WEIGHT: f64 = 0.6;
const TREND_WEIGHT: f64 = 0.4;

/// Bucket a 60-bar return spread into a coarse percentile.
pub fn rs_percentile_proxy(rs: f64) -> f64 {
    if rs >= 0.10 {
        0.95
    } else if rs >= 0.05 {
        0.85
    } else if rs >= 0.0 {
        0.70
    } else {
        0.50
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RsRotation;

impl Strategy for RsRotation {
    fn kind(&self) -> StrategyKind {
        StrategyKind::RsRotation
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
        let ma20 = row.require(Feature::Ma20)?;
        let ma50 = row.require(Feature::Ma50)?;
        let ma200 = row.require(Feature::Ma200)?;
        let slope = row.require(Feature::Ma50Slope)?;
        let atr14 = row.require(Feature::Atr14)?;
        let vol20 = row.require(Feature::Vol20)?;
        let ret60 = row.require(Feature::Ret60)?;
        let bench_ret60 = ctx.benchmark.require(Feature::Ret60)?;

        let rs = ret60 - bench_ret60;
        let rs_pct = rs_percentile_proxy(rs);
        let rs_score = ctx.maps.score(RS_PERCENTILE, rs_pct)?;

        let points = count_points(&[close > ma50, ma50 > ma200, slope > 0.0]);
        let trend_score = trend_structure_score(ctx.maps, points)?;

        let components = ComponentScores {
            regime_fit: REGIME_FIT_ALLOWED,
            trend_momo: (RS_WEIGHT * rs_score + TREND_WEIGHT * trend_score).round(),
            mean_reversion: 0.0,
            volume_flow: NEUTRAL_VOLUME_FLOW,
            risk_reward: risk_reward_score(ctx.maps, params.min_rr)?,
            liquidity: liquidity_score(ctx.maps, close, vol20)?,
            event_risk_penalty: 0.0,
        };

        // stop hangs off the lower edge of the zone
        let trade_plan = TradePlan {
            entry: EntryPlan::LimitEntry {
                entry_zone: [ma20, ma50],
            },
            invalidation: Invalidation {
                rule: InvalidationRule::CloseBelowLevel,
                price: ma50,
            },
            stop: atr_stop(ma20.min(ma50), atr14, params.stop_atr_multiple),
            targets: vec![Target {
                name: "T1".into(),
                rr: params.min_rr,
                size_pct: 1.0,
            }],
            position_sizing: ctx.position_sizing(self.kind())?,
        };

        Ok(Some(AlertCandidate {
            symbol: symbol.to_string(),
            setup_name: self.name().to_string(),
            pool: cfg.pool_default.clone(),
            direction: Direction::Long,
            action: Action::Watch,
            components,
            evidence: vec![
                format!("RS proxy (ret60 diff vs benchmark): {rs:.3}"),
                format!("RS percentile proxy: {rs_pct:.2}"),
                format!("Trend health points: {points}/3"),
            ],
            trade_plan,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{FeatureError, FeatureRow};
    use crate::regime::Regime;
    use crate::strategies::test_support::{config, maps, row};

    fn eval(symbol_row: FeatureRow, bench: &FeatureRow) -> Result<Option<AlertCandidate>, EvalError> {
        let c = config();
        let m = maps();
        let ctx = EvalContext {
            config: &c,
            maps: &m,
            benchmark: bench,
            regime: Regime::Trend,
        };
        let features = FeatureSet {
            symbol: "MSFT".into(),
            rows: vec![symbol_row],
        };
        RsRotation.evaluate("MSFT", &features, &ctx)
    }

    fn bench(ret60: f64) -> FeatureRow {
        row(400.0, 395.0, 390.0, 380.0, 400.0, 0.01, ret60, Some(1.0))
    }

    #[test]
    fn percentile_buckets() {
        assert_eq!(rs_percentile_proxy(0.10), 0.95);
        assert_eq!(rs_percentile_proxy(0.0999), 0.85);
        assert_eq!(rs_percentile_proxy(0.05), 0.85);
        assert_eq!(rs_percentile_proxy(0.0), 0.70);
        assert_eq!(rs_percentile_proxy(-0.0001), 0.50);
    }

    #[test]
    fn strong_outperformer_is_watch() {
        // ret60 0.20 vs benchmark 0.05: rs 0.15 -> pct 0.95 -> 90
        // 3/3 trend points -> 80; 0.6*90 + 0.4*80 = 86
        let cand = eval(row(120.0, 115.0, 110.0, 100.0, 121.0, 0.02, 0.20, None), &bench(0.05))
            .unwrap()
            .unwrap();
        assert_eq!(cand.action, Action::Watch);
        assert_eq!(cand.setup_name, "RS_ROTATION");
        assert_eq!(cand.components.trend_momo, 86.0);
        assert_eq!(cand.components.volume_flow, NEUTRAL_VOLUME_FLOW);
        assert_eq!(cand.components.regime_fit, 90.0);
        assert_eq!(
            cand.evidence,
            vec![
                "RS proxy (ret60 diff vs benchmark): 0.150".to_string(),
                "RS percentile proxy: 0.95".to_string(),
                "Trend health points: 3/3".to_string(),
            ]
        );
    }

    #[test]
    fn trend_momo_blends_rs_and_trend() {
        // rs -0.01 -> pct 0.50 -> 40; points 1 -> 30; 0.6*40 + 0.4*30 = 36
        let cand = eval(row(105.0, 104.0, 100.0, 110.0, 106.0, -0.01, 0.0, None), &bench(0.01))
            .unwrap()
            .unwrap();
        assert_eq!(cand.components.trend_momo, 36.0);
        assert_eq!(cand.evidence[2], "Trend health points: 1/3");
    }

    #[test]
    fn trade_plan_is_limit_zone_at_moving_averages() {
        let plan = eval(row(120.0, 115.0, 110.0, 100.0, 121.0, 0.02, 0.20, None), &bench(0.05))
            .unwrap()
            .unwrap()
            .trade_plan;
        assert_eq!(plan.entry, EntryPlan::LimitEntry { entry_zone: [115.0, 110.0] });
        assert_eq!(plan.invalidation.price, 110.0);
        // lower edge 110 - atr 2.0 * 1.5
        assert_eq!(plan.stop.stop_price, 107.0);
        assert_eq!(plan.targets.len(), 1);
        assert_eq!(plan.targets[0].rr, 2.0);
        assert_eq!(plan.targets[0].size_pct, 1.0);
    }

    #[test]
    fn never_declines_on_weak_strength() {
        let cand = eval(row(90.0, 95.0, 98.0, 100.0, 99.0, -0.02, -0.30, None), &bench(0.10));
        assert!(cand.unwrap().is_some());
    }

    #[test]
    fn benchmark_without_ret60_is_an_error() {
        let mut b = bench(0.05);
        b.ret60 = None;
        let result = eval(row(120.0, 115.0, 110.0, 100.0, 121.0, 0.02, 0.20, None), &b);
        assert!(matches!(
            result,
            Err(EvalError::Feature(FeatureError::Undefined(Feature::Ret60)))
        ));
    }
}
