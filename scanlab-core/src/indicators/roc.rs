//! N-bar return.
//!
//! Fractional price change over N bars.
//! ret[t] = (close[t] - close[t-period]) / close[t-period]
//! Lookback: period. A zero reference price yields NaN.

use super::{closes, Indicator};
use crate::domain::Bar;

pub fn n_bar_return(close: &[f64], period: usize) -> Vec<f64> {
    let n = close.len();
    let mut result = vec![f64::NAN; n];

    if period == 0 {
        return result;
    }

    for i in period..n {
        let prev = close[i - period];
        let curr = close[i];
        if prev.is_nan() || curr.is_nan() || prev == 0.0 {
            continue;
        }
        result[i] = (curr - prev) / prev;
    }

    result
}

#[derive(Debug, Clone)]
pub struct Roc {
    period: usize,
    name: String,
}

impl Roc {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "return period must be >= 1");
        Self {
            period,
            name: format!("ret_{period}"),
        }
    }
}

impl Indicator for Roc {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        n_bar_return(&closes(bars), self.period)
    }
}
