//! Bar sources: local CSV and Parquet files, in-memory fixtures, and the
//! optional volatility-index reading.

pub mod csv_source;
pub mod parquet_source;
pub mod provider;

pub use csv_source::{read_bars_csv, CsvBarSource};
pub use parquet_source::{read_bars_parquet, ParquetBarSource};
pub use provider::{
    parse_timestamp, BarSource, DataError, DataSource, FixedVolatility, MemoryBarSource,
    VolatilitySource,
};
