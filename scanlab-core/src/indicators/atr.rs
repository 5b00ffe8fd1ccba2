//! Average True Range (ATR) and Wilder smoothing.
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|).
//! ATR is the Wilder smoothing (alpha = 1/period) of the true range.
//! TR[0] has no previous close and is undefined, so ATR starts at index 1.

use super::Indicator;
use crate::domain::Bar;

/// True Range series. `TR[0]` is NaN (no previous close).
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let n = bars.len();
    let mut tr = vec![f64::NAN; n];

    for i in 1..n {
        let h = bars[i].high;
        let l = bars[i].low;
        let pc = bars[i - 1].close;
        if h.is_nan() || l.is_nan() || pc.is_nan() {
            continue;
        }
        tr[i] = (h - l).abs().max((h - pc).abs()).max((l - pc).abs());
    }

    tr
}

/// Wilder smoothing: exponential smoothing with alpha = 1/period.
///
/// Seeded by the raw series: the first defined input is copied through as-is,
/// then `s[t] = alpha * x[t] + (1 - alpha) * s[t-1]`. Leading NaNs are skipped.
/// A NaN after the seed yields NaN at that index and leaves the state untouched.
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if period == 0 {
        return result;
    }

    let alpha = 1.0 / period as f64;
    let mut prev: Option<f64> = None;

    for (i, &x) in values.iter().enumerate() {
        if x.is_nan() {
            continue;
        }
        let smoothed = match prev {
            None => x,
            Some(p) => alpha * x + (1.0 - alpha) * p,
        };
        result[i] = smoothed;
        prev = Some(smoothed);
    }

    result
}

/// Wilder-smoothed true range.
pub fn atr(bars: &[Bar], period: usize) -> Vec<f64> {
    wilder_smooth(&true_range(bars), period)
}

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            name: format!("atr_{period}"),
        }
    }
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        atr(bars, self.period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};
    use chrono::{Duration, TimeZone, Utc};

    fn make_ohlc_bars(data: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 2, 21, 0, 0).unwrap();
        data.iter()
            .enumerate()
            .map(|(i, &(open, high, low, close))| Bar {
                symbol: "TEST".to_string(),
                timestamp: t0 + Duration::days(i as i64),
                open,
                high,
                low,
                close,
                volume: 1000.0,
            })
            .collect()
    }

    #[test]
    fn true_range_basic() {
        let bars = make_ohlc_bars(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0), // max(8, |108-102|, |100-102|) = 8
            (106.0, 107.0, 98.0, 99.0),   // max(9, |107-106|, |98-106|) = 9
        ]);
        let tr = true_range(&bars);
        assert!(tr[0].is_nan());
        assert_approx(tr[1], 8.0, DEFAULT_EPSILON);
        assert_approx(tr[2], 9.0, DEFAULT_EPSILON);
    }

    #[test]
    fn true_range_gap_up() {
        let bars = make_ohlc_bars(&[
            (98.0, 102.0, 97.0, 100.0),
            (110.0, 115.0, 108.0, 112.0), // max(7, |115-100|, |108-100|) = 15
        ]);
        assert_approx(true_range(&bars)[1], 15.0, DEFAULT_EPSILON);
    }

    #[test]
    fn wilder_seeds_with_first_defined_value() {
        let s = wilder_smooth(&[f64::NAN, 8.0, 9.0, 6.0], 3);
        assert!(s[0].is_nan());
        assert_approx(s[1], 8.0, DEFAULT_EPSILON);
        // 1/3*9 + 2/3*8 = 25/3
        assert_approx(s[2], 25.0 / 3.0, DEFAULT_EPSILON);
        // 1/3*6 + 2/3*25/3 = 2 + 50/9 = 68/9
        assert_approx(s[3], 68.0 / 9.0, DEFAULT_EPSILON);
    }

    #[test]
    fn wilder_gap_keeps_state() {
        let s = wilder_smooth(&[4.0, f64::NAN, 4.0], 2);
        assert_approx(s[0], 4.0, DEFAULT_EPSILON);
        assert!(s[1].is_nan());
        assert_approx(s[2], 4.0, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_period_3() {
        let bars = make_ohlc_bars(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0), // TR = 8
            (106.0, 107.0, 98.0, 99.0),   // TR = 9
            (99.0, 103.0, 97.0, 101.0),   // TR = 6
        ]);
        let result = Atr::new(3).compute(&bars);
        assert!(result[0].is_nan());
        assert_approx(result[1], 8.0, DEFAULT_EPSILON);
        assert_approx(result[3], 68.0 / 9.0, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_is_deterministic() {
        let bars = make_ohlc_bars(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0),
            (106.0, 107.0, 98.0, 99.0),
        ]);
        let a = atr(&bars, 14);
        let b = atr(&bars, 14);
        assert_eq!(format!("{a:?}"), format!("{b:?}"));
    }
}
