//! Local Parquet bar files: `{dir}/{SYMBOL}_{interval}.parquet`.
//!
//! Columns: `timestamp, open, high, low, close, volume`. The timestamp column
//! may be a Datetime (any unit), a Date, or Int64 epoch seconds. Price and
//! volume columns may be any numeric type; nulls become NaN and are caught by
//! bar validation.

use chrono::{DateTime, NaiveDate, Utc};
use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

use super::provider::{BarSource, DataError, DataSource};
use crate::domain::Bar;

const COLUMNS: [&str; 6] = ["timestamp", "open", "high", "low", "close", "volume"];

#[derive(Debug, Clone)]
pub struct ParquetBarSource {
    dir: PathBuf,
    interval: String,
}

impl ParquetBarSource {
    pub fn new(dir: impl Into<PathBuf>, interval: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            interval: interval.into(),
        }
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}_{}.parquet", self.interval))
    }
}

impl BarSource for ParquetBarSource {
    fn name(&self) -> &str {
        "parquet"
    }

    fn source(&self) -> DataSource {
        DataSource::ParquetImport
    }

    fn fetch(&self, symbol: &str) -> Result<Option<Vec<Bar>>, DataError> {
        let path = self.path_for(symbol);
        if !path.exists() {
            return Ok(None);
        }
        let bars = read_bars_parquet(symbol, &path)?;
        Ok(if bars.is_empty() { None } else { Some(bars) })
    }
}

/// Load a Parquet bar file into bars, in file order.
pub fn read_bars_parquet(symbol: &str, path: &Path) -> Result<Vec<Bar>, DataError> {
    let file = fs::File::open(path).map_err(|e| DataError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| DataError::ParquetError(format!("read {}: {e}", path.display())))?;

    if df.height() == 0 {
        return Ok(Vec::new());
    }
    for col_name in &COLUMNS {
        if df.column(col_name).is_err() {
            return Err(DataError::ValidationError(format!(
                "{}: missing column '{col_name}'",
                path.display()
            )));
        }
    }

    dataframe_to_bars(symbol, &df)
}

fn f64_values(df: &DataFrame, name: &str) -> Result<Vec<f64>, DataError> {
    let col = df
        .column(name)
        .and_then(|c| c.cast(&DataType::Float64))
        .map_err(|e| DataError::ParquetError(format!("{name} column: {e}")))?;
    let ca = col
        .f64()
        .map_err(|e| DataError::ParquetError(format!("{name} column type: {e}")))?;
    Ok(ca.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

fn timestamps(df: &DataFrame) -> Result<Vec<DateTime<Utc>>, DataError> {
    let col = df
        .column("timestamp")
        .map_err(|e| DataError::ParquetError(format!("timestamp column: {e}")))?;
    let type_err = |e: PolarsError| DataError::ParquetError(format!("timestamp column type: {e}"));
    let n = df.height();

    let from_secs = |i: usize, secs: Option<i64>| -> Result<DateTime<Utc>, DataError> {
        secs.and_then(|s| DateTime::from_timestamp(s, 0))
            .ok_or_else(|| DataError::ParquetError(format!("null or out-of-range timestamp at row {i}")))
    };

    match col.dtype() {
        DataType::Date => {
            let ca = col.date().map_err(type_err)?;
            let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)
                .ok_or_else(|| DataError::Other("epoch date".into()))?;
            (0..n)
                .map(|i| {
                    let days = ca
                        .get(i)
                        .ok_or_else(|| DataError::ParquetError(format!("null date at row {i}")))?;
                    (epoch + chrono::Duration::days(i64::from(days)))
                        .and_hms_opt(0, 0, 0)
                        .map(|dt| dt.and_utc())
                        .ok_or_else(|| DataError::ParquetError(format!("bad date at row {i}")))
                })
                .collect()
        }
        DataType::Datetime(unit, _) => {
            let per_second: i64 = match unit {
                TimeUnit::Nanoseconds => 1_000_000_000,
                TimeUnit::Microseconds => 1_000_000,
                TimeUnit::Milliseconds => 1_000,
            };
            let ca = col.datetime().map_err(type_err)?;
            (0..n)
                .map(|i| from_secs(i, ca.get(i).map(|v| v.div_euclid(per_second))))
                .collect()
        }
        DataType::Int64 => {
            let ca = col.i64().map_err(type_err)?;
            (0..n).map(|i| from_secs(i, ca.get(i))).collect()
        }
        other => Err(DataError::ValidationError(format!(
            "timestamp column has unsupported type {other}"
        ))),
    }
}

fn dataframe_to_bars(symbol: &str, df: &DataFrame) -> Result<Vec<Bar>, DataError> {
    let ts = timestamps(df)?;
    let open = f64_values(df, "open")?;
    let high = f64_values(df, "high")?;
    let low = f64_values(df, "low")?;
    let close = f64_values(df, "close")?;
    let volume = f64_values(df, "volume")?;

    Ok((0..df.height())
        .map(|i| Bar {
            symbol: symbol.to_string(),
            timestamp: ts[i],
            open: open[i],
            high: high[i],
            low: low[i],
            close: close[i],
            volume: volume[i],
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn write(path: &Path, mut df: DataFrame) {
        let file = fs::File::create(path).unwrap();
        ParquetWriter::new(file).finish(&mut df).unwrap();
    }

    fn sample(timestamp: Column) -> DataFrame {
        DataFrame::new(vec![
            timestamp,
            Column::new("open".into(), vec![100.0, 101.0]),
            Column::new("high".into(), vec![102.0, 103.0]),
            Column::new("low".into(), vec![99.0, 100.0]),
            Column::new("close".into(), vec![101.0, 102.0]),
            Column::new("volume".into(), vec![1000_u64, 1100]),
        ])
        .unwrap()
    }

    #[test]
    fn reads_epoch_seconds() {
        let dir = tempfile::tempdir().unwrap();
        let t0 = Utc.with_ymd_and_hms(2024, 1, 2, 21, 0, 0).unwrap().timestamp();
        let df = sample(Column::new("timestamp".into(), vec![t0, t0 + 86_400]));
        write(&dir.path().join("SPY_1d.parquet"), df);

        let bars = ParquetBarSource::new(dir.path(), "1d")
            .fetch("SPY")
            .unwrap()
            .unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].timestamp.timestamp(), t0);
        assert_eq!(bars[1].close, 102.0);
        assert_eq!(bars[1].volume, 1100.0);
        assert_eq!(bars[0].symbol, "SPY");
    }

    #[test]
    fn reads_date_column() {
        let dir = tempfile::tempdir().unwrap();
        let days = vec![19724_i32, 19725];
        let ts = Column::new("timestamp".into(), days)
            .cast(&DataType::Date)
            .unwrap();
        write(&dir.path().join("SPY_1d.parquet"), sample(ts));

        let bars = ParquetBarSource::new(dir.path(), "1d")
            .fetch("SPY")
            .unwrap()
            .unwrap();
        assert_eq!(bars[0].timestamp, Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn missing_column_is_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let df = DataFrame::new(vec![
            Column::new("timestamp".into(), vec![0_i64]),
            Column::new("close".into(), vec![1.0]),
        ])
        .unwrap();
        write(&dir.path().join("SPY_1d.parquet"), df);
        assert!(matches!(
            ParquetBarSource::new(dir.path(), "1d").fetch("SPY"),
            Err(DataError::ValidationError(_))
        ));
    }

    #[test]
    fn missing_file_is_no_data() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ParquetBarSource::new(dir.path(), "1d")
            .fetch("SPY")
            .unwrap()
            .is_none());
    }
}
