//! Bar loading for the runner.
//!
//! Resolves where bars come from and computes the dataset hash that goes into
//! every alert's provenance. The fallback policy is decided by the caller:
//! 1. `--synthetic` → [`SyntheticBarSource`] for every symbol (tagged)
//! 2. `--format parquet` → local Parquet files
//! 3. otherwise → local CSV files
//!
//! Synthetic data is a developer/demo mode. Alerts built on it carry
//! `vendor = "synthetic"` so they can never be mistaken for real signals.

use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use scanlab_core::data::{BarSource, CsvBarSource, DataError, DataSource, ParquetBarSource};
use scanlab_core::domain::Bar;

/// Default number of synthetic bars per symbol (about two trading years).
pub const SYNTHETIC_BARS: usize = 520;
/// Mean daily log return of the synthetic walk.
pub const SYNTHETIC_DRIFT: f64 = 0.0004;
/// Daily log-return standard deviation of the synthetic walk.
pub const SYNTHETIC_VOL: f64 = 0.02;
const SYNTHETIC_START_PRICE: f64 = 100.0;
const OPEN_NOISE: f64 = 0.002;
const SPREAD_NOISE: f64 = 0.006;
const VOLUME_RANGE: std::ops::Range<u64> = 800_000..3_500_000;

// ─── Local file formats ─────────────────────────────────────────────

/// On-disk bar format for local data directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    #[default]
    Csv,
    Parquet,
}

impl FromStr for FileFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "parquet" => Ok(Self::Parquet),
            other => Err(format!("unknown bar file format '{other}' (expected csv or parquet)")),
        }
    }
}

/// Options controlling which bar source the runner reads.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Directory holding `{SYMBOL}_{interval}.{csv,parquet}` files.
    pub data_dir: PathBuf,
    pub format: FileFormat,
    /// Ignore `data_dir` and generate synthetic bars.
    pub synthetic: bool,
    pub bar_interval: String,
}

/// Build the bar source described by `opts`.
pub fn open_source(opts: &LoadOptions) -> Box<dyn BarSource> {
    if opts.synthetic {
        return Box::new(SyntheticBarSource::default());
    }
    match opts.format {
        FileFormat::Csv => Box::new(CsvBarSource::new(&opts.data_dir, &opts.bar_interval)),
        FileFormat::Parquet => Box::new(ParquetBarSource::new(&opts.data_dir, &opts.bar_interval)),
    }
}

// ─── Synthetic bars ─────────────────────────────────────────────────

/// Seeded geometric random walk on business days.
///
/// Deterministic per `(seed, symbol)`: the same pair always yields the same
/// bars, and different symbols get different paths. Timestamps are midnight
/// UTC on weekdays, ending on `anchor` (or the last weekday before it).
#[derive(Debug, Clone)]
pub struct SyntheticBarSource {
    bars: usize,
    anchor: NaiveDate,
    seed: u64,
}

impl SyntheticBarSource {
    pub fn new(bars: usize, anchor: NaiveDate, seed: u64) -> Self {
        Self { bars, anchor, seed }
    }

    /// Generate the bar path for one symbol.
    pub fn generate(&self, symbol: &str) -> Vec<Bar> {
        let mut rng = StdRng::from_seed(symbol_seed(self.seed, symbol));
        let dates = business_days_ending(self.anchor, self.bars);

        let mut log_price = SYNTHETIC_START_PRICE.ln();
        dates
            .into_iter()
            .map(|timestamp| {
                log_price += SYNTHETIC_DRIFT + SYNTHETIC_VOL * standard_normal(&mut rng);
                let close = log_price.exp();
                let open = close * (1.0 + OPEN_NOISE * standard_normal(&mut rng));
                let spread = (SPREAD_NOISE * standard_normal(&mut rng)).abs();
                Bar {
                    symbol: symbol.to_string(),
                    timestamp,
                    open,
                    high: open.max(close) * (1.0 + spread),
                    low: open.min(close) * (1.0 - spread),
                    close,
                    volume: rng.gen_range(VOLUME_RANGE) as f64,
                }
            })
            .collect()
    }
}

impl Default for SyntheticBarSource {
    fn default() -> Self {
        Self {
            bars: SYNTHETIC_BARS,
            anchor: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap_or_default(),
            seed: 1,
        }
    }
}

impl BarSource for SyntheticBarSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn source(&self) -> DataSource {
        DataSource::Synthetic
    }

    fn fetch(&self, symbol: &str) -> Result<Option<Vec<Bar>>, DataError> {
        if self.bars == 0 {
            return Ok(None);
        }
        Ok(Some(self.generate(symbol)))
    }
}

fn symbol_seed(seed: u64, symbol: &str) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&seed.to_le_bytes());
    hasher.update(symbol.as_bytes());
    *hasher.finalize().as_bytes()
}

/// Box-Muller draw from N(0, 1).
fn standard_normal(rng: &mut StdRng) -> f64 {
    // 1 - U keeps u1 in (0, 1] so ln never sees 0
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// `n` weekdays ending on or before `anchor`, ascending, at midnight UTC.
fn business_days_ending(anchor: NaiveDate, n: usize) -> Vec<DateTime<Utc>> {
    let mut days = Vec::with_capacity(n);
    let mut current = anchor;
    while days.len() < n {
        if !matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            if let Some(dt) = current.and_hms_opt(0, 0, 0) {
                days.push(dt.and_utc());
            }
        }
        current -= Duration::days(1);
    }
    days.reverse();
    days
}

// ─── Dataset hash ───────────────────────────────────────────────────

/// Deterministic BLAKE3 hash over loaded bar data.
///
/// Covers timestamps and all OHLCV values in sorted symbol order, so the
/// result does not depend on load order or thread scheduling.
pub fn dataset_hash<'a, I>(series: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a [Bar])>,
{
    let mut sorted: Vec<(&str, &[Bar])> = series.into_iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let mut hasher = blake3::Hasher::new();
    for (symbol, bars) in sorted {
        hasher.update(symbol.as_bytes());
        for bar in bars {
            hasher.update(&bar.timestamp.timestamp().to_le_bytes());
            hasher.update(&bar.open.to_le_bytes());
            hasher.update(&bar.high.to_le_bytes());
            hasher.update(&bar.low.to_le_bytes());
            hasher.update(&bar.close.to_le_bytes());
            hasher.update(&bar.volume.to_le_bytes());
        }
    }

    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanlab_core::domain::validate_bars;

    #[test]
    fn synthetic_data_is_deterministic() {
        let src = SyntheticBarSource::default();
        let a = src.generate("SPY");
        let b = src.generate("SPY");
        assert_eq!(a, b);
    }

    #[test]
    fn different_symbols_get_different_paths() {
        let src = SyntheticBarSource::default();
        let spy = src.generate("SPY");
        let qqq = src.generate("QQQ");
        assert_eq!(spy.len(), qqq.len());
        assert_ne!(spy[0].close, qqq[0].close);
    }

    #[test]
    fn synthetic_bars_pass_validation() {
        let bars = SyntheticBarSource::default().fetch("AAPL").unwrap().unwrap();
        assert_eq!(bars.len(), SYNTHETIC_BARS);
        validate_bars("AAPL", &bars, SYNTHETIC_BARS).unwrap();
        for b in &bars {
            assert!(b.high >= b.open.max(b.close));
            assert!(b.low <= b.open.min(b.close));
            assert!((800_000.0..3_500_000.0).contains(&b.volume));
        }
    }

    #[test]
    fn synthetic_calendar_skips_weekends_and_ends_at_anchor() {
        // 2024-06-09 is a Sunday; the last bar lands on Friday the 7th
        let anchor = NaiveDate::from_ymd_opt(2024, 6, 9).unwrap();
        let bars = SyntheticBarSource::new(10, anchor, 7).generate("X");
        assert_eq!(bars.len(), 10);
        assert_eq!(
            bars[9].timestamp.date_naive(),
            NaiveDate::from_ymd_opt(2024, 6, 7).unwrap()
        );
        assert!(bars
            .iter()
            .all(|b| !matches!(b.timestamp.weekday(), Weekday::Sat | Weekday::Sun)));
    }

    #[test]
    fn seed_changes_the_path() {
        let anchor = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let a = SyntheticBarSource::new(5, anchor, 1).generate("SPY");
        let b = SyntheticBarSource::new(5, anchor, 2).generate("SPY");
        assert_ne!(a[0].close, b[0].close);
    }

    #[test]
    fn zero_length_source_has_no_data() {
        let anchor = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        assert!(SyntheticBarSource::new(0, anchor, 1).fetch("SPY").unwrap().is_none());
    }

    #[test]
    fn dataset_hash_ignores_input_order() {
        let src = SyntheticBarSource::default();
        let spy = src.generate("SPY");
        let qqq = src.generate("QQQ");
        let h1 = dataset_hash([("SPY", spy.as_slice()), ("QQQ", qqq.as_slice())]);
        let h2 = dataset_hash([("QQQ", qqq.as_slice()), ("SPY", spy.as_slice())]);
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
    }

    #[test]
    fn dataset_hash_sees_value_changes() {
        let src = SyntheticBarSource::default();
        let spy = src.generate("SPY");
        let mut tweaked = spy.clone();
        tweaked[100].close += 0.01;
        assert_ne!(
            dataset_hash([("SPY", spy.as_slice())]),
            dataset_hash([("SPY", tweaked.as_slice())])
        );
    }

    #[test]
    fn file_format_parses_case_insensitively() {
        assert_eq!("CSV".parse::<FileFormat>().unwrap(), FileFormat::Csv);
        assert_eq!("parquet".parse::<FileFormat>().unwrap(), FileFormat::Parquet);
        assert!("xlsx".parse::<FileFormat>().is_err());
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(32))]

            #[test]
            fn any_seed_yields_valid_bars(seed in any::<u64>(), symbol in "[A-Z]{1,5}", n in 1usize..120) {
                let anchor = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
                let bars = SyntheticBarSource::new(n, anchor, seed).generate(&symbol);
                prop_assert_eq!(bars.len(), n);
                prop_assert!(validate_bars(&symbol, &bars, n).is_ok());
            }

            #[test]
            fn dataset_hash_is_order_independent(seed in any::<u64>()) {
                let anchor = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
                let src = SyntheticBarSource::new(30, anchor, seed);
                let a = src.generate("AAA");
                let b = src.generate("BBB");
                prop_assert_eq!(
                    dataset_hash([("AAA", a.as_slice()), ("BBB", b.as_slice())]),
                    dataset_hash([("BBB", b.as_slice()), ("AAA", a.as_slice())])
                );
            }
        }
    }
}
