//! Indicator engine.
//!
//! Every indicator is a pure function from a series to a series of the same
//! length. Undefined values are `f64::NAN` and propagate as NaN; they are never
//! replaced with zero. Callers convert to `Option<f64>` at the feature-row
//! boundary (see `features`).
//!
//! Each bar-based indicator also implements the `Indicator` trait so the
//! feature assembler can compute warmup from `lookback()`.

pub mod atr;
pub mod bollinger;
pub mod roc;
pub mod rolling;
pub mod rsi;
pub mod sma;

pub use atr::{atr, true_range, wilder_smooth, Atr};
pub use bollinger::{bollinger_z, BollingerZ};
pub use roc::{n_bar_return, Roc};
pub use rolling::{rolling_max, rolling_min, RollingHigh};
pub use rsi::{rsi, Rsi};
pub use sma::{moving_average, Sma};

use crate::domain::Bar;

/// Trait for bar-based indicators.
///
/// # Look-ahead contamination guard
/// No value at bar t may depend on bars after t. Every indicator must pass
/// the truncated-vs-full series test.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "sma_20", "atr_14").
    fn name(&self) -> &str;

    /// Index of the first bar that can carry a defined value.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the whole bar series.
    ///
    /// Returns a `Vec<f64>` of the same length as `bars`.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Close prices of a bar slice.
pub fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

/// Volumes of a bar slice.
pub fn volumes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.volume).collect()
}

/// Create synthetic bars from close prices for testing.
///
/// open = prev_close (or close for the first bar), high = max(open,close) + 1,
/// low = min(open,close) - 1, volume = 1000, one bar per day.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    use chrono::{Duration, TimeZone, Utc};
    let t0 = Utc.with_ymd_and_hms(2024, 1, 2, 21, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                symbol: "TEST".to_string(),
                timestamp: t0 + Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
