//! Relative Strength Index (RSI).
//!
//! Up-moves and down-moves are Wilder-smoothed separately.
//! RSI = 100 - 100 / (1 + up_smoothed / down_smoothed)
//! Lookback: 1 (the first change needs a previous close).
//! Edge case: down_smoothed == 0 → undefined (NaN), never a division by zero.

use super::atr::wilder_smooth;
use super::{closes, Indicator};
use crate::domain::Bar;

/// RSI over a close series.
pub fn rsi(close: &[f64], period: usize) -> Vec<f64> {
    let n = close.len();
    let mut up = vec![f64::NAN; n];
    let mut down = vec![f64::NAN; n];

    for i in 1..n {
        let change = close[i] - close[i - 1];
        if change.is_nan() {
            continue;
        }
        up[i] = change.max(0.0);
        down[i] = (-change).max(0.0);
    }

    let up_s = wilder_smooth(&up, period);
    let down_s = wilder_smooth(&down, period);

    up_s.iter()
        .zip(&down_s)
        .map(|(&u, &d)| {
            if u.is_nan() || d.is_nan() || d == 0.0 {
                f64::NAN
            } else {
                100.0 - 100.0 / (1.0 + u / d)
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        rsi(&closes(bars), self.period)
    }
}
