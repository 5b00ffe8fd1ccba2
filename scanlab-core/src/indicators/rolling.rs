//! Rolling extrema over a trailing window.
//!
//! - max(values[t-period+1..=t])
//! - min(values[t-period+1..=t])
//!
//! Lookback: period - 1. A NaN anywhere in the window yields NaN.

use super::{closes, Indicator};
use crate::domain::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extreme {
    Max,
    Min,
}

fn rolling_extreme(values: &[f64], period: usize, extreme: Extreme) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if period == 0 || n < period {
        return result;
    }

    for i in (period - 1)..n {
        let window = &values[(i + 1 - period)..=i];
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }
        result[i] = match extreme {
            Extreme::Max => window.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Extreme::Min => window.iter().copied().fold(f64::INFINITY, f64::min),
        };
    }

    result
}

pub fn rolling_max(values: &[f64], period: usize) -> Vec<f64> {
    rolling_extreme(values, period, Extreme::Max)
}

pub fn rolling_min(values: &[f64], period: usize) -> Vec<f64> {
    rolling_extreme(values, period, Extreme::Min)
}

/// Highest **close** over the window.
///
/// Used as the breakout reference: because the current close is part of its
/// own window, `close >= high` holds exactly when the bar closes at a new
/// `period`-bar closing high.
#[derive(Debug, Clone)]
pub struct RollingHigh {
    period: usize,
    name: String,
}

impl RollingHigh {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "rolling period must be >= 1");
        Self {
            period,
            name: format!("close_high_{period}"),
        }
    }
}

impl Indicator for RollingHigh {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        rolling_max(&closes(bars), self.period)
    }
}
