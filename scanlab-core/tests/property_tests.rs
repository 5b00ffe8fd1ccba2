//! Property tests for indicator and scoring invariants.
//!
//! Uses proptest to verify:
//! 1. Moving-average definedness starts exactly at index n-1
//! 2. Wilder ATR/RSI are deterministic across recomputation
//! 3. RSI stays within [0, 100] wherever it is defined
//! 4. Constant prices leave RSI and the Bollinger z undefined
//! 5. Selection gate output is bounded, thresholded, and ranked
//! 6. Piecewise scores always come from a rule (or are 0)

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use scanlab_core::domain::Bar;
use scanlab_core::indicators::{atr, bollinger_z, moving_average, rsi};
use scanlab_core::scoring::{piecewise_score, select, ScoreRule, Threshold};

fn bars_from(closes: &[f64]) -> Vec<Bar> {
    let t0 = Utc.with_ymd_and_hms(2024, 1, 2, 21, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                symbol: "PROP".into(),
                timestamp: t0 + Duration::days(i as i64),
                open,
                high: open.max(close) * 1.01,
                low: open.min(close) * 0.99,
                close,
                volume: 1_000_000.0,
            }
        })
        .collect()
}

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_closes(min_len: usize, max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1.0..500.0_f64, min_len..max_len)
}

fn arb_threshold() -> impl Strategy<Value = Threshold> {
    let level = -100.0..100.0_f64;
    prop_oneof![
        level.clone().prop_map(Threshold::Lte),
        level.clone().prop_map(Threshold::Lt),
        level.clone().prop_map(Threshold::Gte),
        level.prop_map(Threshold::Gt),
    ]
}

fn arb_rules() -> impl Strategy<Value = Vec<ScoreRule>> {
    prop::collection::vec(
        (arb_threshold(), 0.0..100.0_f64).prop_map(|(t, s)| ScoreRule::new(t, s)),
        0..6,
    )
}

// ── 1. Moving-average definedness ────────────────────────────────────

proptest! {
    #[test]
    fn moving_average_defined_from_n_minus_one(
        values in arb_closes(1, 120),
        n in 1usize..60,
    ) {
        let ma = moving_average(&values, n);
        prop_assert_eq!(ma.len(), values.len());
        for (i, v) in ma.iter().enumerate() {
            if i + 1 < n {
                prop_assert!(v.is_nan(), "index {} defined before n-1", i);
            } else {
                prop_assert!(v.is_finite(), "index {} undefined at or after n-1", i);
            }
        }
    }
}

// ── 2. Determinism ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn wilder_indicators_are_deterministic(closes in arb_closes(2, 200)) {
        let bars = bars_from(&closes);
        let a1 = atr(&bars, 14);
        let a2 = atr(&bars, 14);
        let r1 = rsi(&closes, 14);
        let r2 = rsi(&closes, 14);
        for i in 0..closes.len() {
            prop_assert!(a1[i].to_bits() == a2[i].to_bits());
            prop_assert!(r1[i].to_bits() == r2[i].to_bits());
        }
        prop_assert!(a1[0].is_nan());
        prop_assert!(a1[1..].iter().all(|v| v.is_finite()));
    }
}

// ── 3. RSI bounds ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn rsi_within_bounds(closes in arb_closes(2, 200)) {
        for v in rsi(&closes, 14) {
            if !v.is_nan() {
                prop_assert!((0.0..=100.0).contains(&v), "rsi {} out of bounds", v);
            }
        }
    }
}

// ── 4. Constant prices ───────────────────────────────────────────────

proptest! {
    #[test]
    fn constant_prices_leave_ratios_undefined(
        price in 1.0..1000.0_f64,
        len in 21usize..120,
    ) {
        let closes = vec![price; len];
        prop_assert!(rsi(&closes, 14).iter().all(|v| v.is_nan()));
        prop_assert!(bollinger_z(&closes, 20).iter().all(|v| v.is_nan()));
    }
}

// ── 5. Selection gate ────────────────────────────────────────────────

proptest! {
    #[test]
    fn selection_gate_invariants(
        totals in prop::collection::vec(0.0..100.0_f64, 0..40),
        min_total in 0.0..100.0_f64,
        max_count in 0usize..15,
    ) {
        let items: Vec<(usize, f64)> = totals.iter().copied().enumerate().collect();
        let out = select(items, min_total, max_count, |x| x.1);

        prop_assert!(out.len() <= max_count);
        prop_assert!(out.iter().all(|x| x.1 >= min_total));
        for w in out.windows(2) {
            prop_assert!(w[0].1 >= w[1].1);
            // stable: equal totals keep input order
            if w[0].1 == w[1].1 {
                prop_assert!(w[0].0 < w[1].0);
            }
        }
        let eligible = totals.iter().filter(|t| **t >= min_total).count();
        prop_assert_eq!(out.len(), eligible.min(max_count));
    }
}

// ── 6. Piecewise score ───────────────────────────────────────────────

proptest! {
    #[test]
    fn piecewise_score_is_first_match_or_zero(
        rules in arb_rules(),
        value in -150.0..150.0_f64,
    ) {
        let score = piecewise_score(value, &rules);
        match rules.iter().find(|r| r.threshold.matches(value)) {
            Some(r) => prop_assert_eq!(score, r.score),
            None => prop_assert_eq!(score, 0.0),
        }
    }
}
