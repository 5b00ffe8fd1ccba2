//! Bollinger z-score: distance of close from its moving average in units of
//! population standard deviation over the same window.
//!
//! z = (close - SMA(close, period)) / stddev(close, period)
//! Lookback: period - 1. Zero dispersion → undefined.

use super::{closes, Indicator};
use crate::domain::Bar;

/// Relative tolerance under which the window's dispersion counts as zero.
/// Rounding in the mean leaves residues around 1e-15 on flat windows.
const ZERO_DISPERSION: f64 = 1e-12;

pub fn bollinger_z(close: &[f64], period: usize) -> Vec<f64> {
    let n = close.len();
    let mut result = vec![f64::NAN; n];

    if period == 0 || n < period {
        return result;
    }

    for i in (period - 1)..n {
        let window = &close[(i + 1 - period)..=i];
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }

        let mean = window.iter().sum::<f64>() / period as f64;
        let variance = window
            .iter()
            .map(|v| {
                let diff = v - mean;
                diff * diff
            })
            .sum::<f64>()
            / period as f64;
        let stddev = variance.sqrt();

        if stddev <= ZERO_DISPERSION * mean.abs().max(1.0) {
            continue;
        }
        result[i] = (close[i] - mean) / stddev;
    }

    result
}

#[derive(Debug, Clone)]
pub struct BollingerZ {
    period: usize,
    name: String,
}

impl BollingerZ {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "Bollinger period must be >= 1");
        Self {
            period,
            name: format!("bollinger_z_{period}"),
        }
    }
}

impl Indicator for BollingerZ {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        bollinger_z(&closes(bars), self.period)
    }
}
