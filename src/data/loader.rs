//! Data loader for parquet datasets.
//!
//! Two kinds of files are read:
//! - Time series (returns, closes, realized variance) with a date column and
//!   a numeric value column
//! - Intraday bars with a timestamp column, for realized variance
//! - Options chain snapshots for a single expiration with the columns in
//!   [`CHAIN_COLUMNS`]
//!
//! Ingestion into these files happens elsewhere; this module only maps them
//! onto the crate's types.

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, warn};

use super::series::{SeriesError, TimeSeries};
use super::types::{OptionContract, OptionType, OptionsChain};

/// Expected columns in an options chain file.
pub const CHAIN_COLUMNS: &[&str] = &[
    "right",
    "strike",
    "bid",
    "ask",
    "delta",
    "impvol",
    "underprice",
];

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Series error: {0}")]
    Series(#[from] SeriesError),
}

/// Parquet loader rooted at a data directory.
pub struct DataLoader {
    data_dir: PathBuf,
}

impl DataLoader {
    /// Create a loader. Relative file names resolve against `data_dir`;
    /// absolute paths are used as-is.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn resolve(&self, file: impl AsRef<Path>) -> PathBuf {
        self.data_dir.join(file)
    }

    /// Scan a parquet file lazily.
    pub fn load_lazy(&self, file: impl AsRef<Path>) -> Result<LazyFrame, LoaderError> {
        let path = self.resolve(file);
        if !path.exists() {
            return Err(LoaderError::FileNotFound(path.display().to_string()));
        }
        let lf = LazyFrame::scan_parquet(&path, ScanArgsParquet::default())?;
        Ok(lf)
    }

    /// Load a date-keyed numeric series.
    ///
    /// Rows with a missing date or value are skipped. Rows are sorted by
    /// date; duplicate dates are rejected.
    pub fn load_series(
        &self,
        file: impl AsRef<Path>,
        date_column: &str,
        value_column: &str,
    ) -> Result<TimeSeries<NaiveDate, f64>, LoaderError> {
        let df = self
            .load_lazy(file)?
            .select([
                col(date_column),
                col(value_column).cast(DataType::Float64),
            ])
            .collect()?;

        let dates = column_dates(&df, date_column)?;
        let values = df.column(value_column)?.f64()?;

        let mut pairs: Vec<(NaiveDate, f64)> = dates
            .into_iter()
            .zip(values.into_iter())
            .filter_map(|(d, v)| Some((d?, v?)))
            .collect();

        let skipped = df.height() - pairs.len();
        if skipped > 0 {
            warn!("Skipped {} rows with missing {}/{}", skipped, date_column, value_column);
        }

        pairs.sort_by_key(|(d, _)| *d);
        debug!("Loaded {} observations of {}", pairs.len(), value_column);

        Ok(TimeSeries::from_pairs(pairs)?)
    }

    /// Load an intraday price series keyed by timestamp.
    ///
    /// The timestamp column is read as text, so both string and datetime
    /// columns are accepted.
    pub fn load_intraday(
        &self,
        file: impl AsRef<Path>,
        timestamp_column: &str,
        value_column: &str,
    ) -> Result<TimeSeries<NaiveDateTime, f64>, LoaderError> {
        let df = self
            .load_lazy(file)?
            .select([
                col(timestamp_column).cast(DataType::String),
                col(value_column).cast(DataType::Float64),
            ])
            .collect()?;

        let stamps = df.column(timestamp_column)?.str()?;
        let values = df.column(value_column)?.f64()?;

        let mut pairs: Vec<(NaiveDateTime, f64)> = stamps
            .into_iter()
            .zip(values.into_iter())
            .filter_map(|(ts, v)| Some((parse_timestamp(ts?)?, v?)))
            .collect();

        let skipped = df.height() - pairs.len();
        if skipped > 0 {
            warn!("Skipped {} bars with missing or unparseable fields", skipped);
        }

        pairs.sort_by_key(|(ts, _)| *ts);
        debug!("Loaded {} intraday bars of {}", pairs.len(), value_column);

        Ok(TimeSeries::from_pairs(pairs)?)
    }

    /// Load an options chain snapshot.
    pub fn load_chain(&self, file: impl AsRef<Path>) -> Result<OptionsChain, LoaderError> {
        let lf = self.load_lazy(file)?;

        let columns: Vec<Expr> = CHAIN_COLUMNS
            .iter()
            .map(|&name| match name {
                "right" => col(name).cast(DataType::String),
                _ => col(name).cast(DataType::Float64),
            })
            .collect();

        let df = lf.select(columns).collect()?;

        dataframe_to_chain(&df)
    }
}

/// Read a date column stored either as `YYYY-MM-DD` strings or as a date type.
fn column_dates(df: &DataFrame, name: &str) -> Result<Vec<Option<NaiveDate>>, LoaderError> {
    let dates_col = df.column(name)?;

    if let Ok(str_col) = dates_col.str() {
        Ok(str_col
            .into_iter()
            .map(|s| s.and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()))
            .collect())
    } else if let Ok(date_col) = dates_col.date() {
        Ok(date_col
            .into_iter()
            .map(|d| d.map(date_from_days))
            .collect())
    } else {
        Err(LoaderError::InvalidData(format!(
            "{} column has unexpected type",
            name
        )))
    }
}

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s.trim(), fmt).ok())
}

/// Convert days since Unix epoch to NaiveDate.
fn date_from_days(days: i32) -> NaiveDate {
    NaiveDate::from_num_days_from_ce_opt(days + 719163).unwrap_or_default()
}

fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert a chain DataFrame to an [`OptionsChain`].
///
/// Rows with an unknown right or missing numeric fields are skipped.
fn dataframe_to_chain(df: &DataFrame) -> Result<OptionsChain, LoaderError> {
    let right_col = df.column("right")?.str()?;
    let strike_col = df.column("strike")?.f64()?;
    let bid_col = df.column("bid")?.f64()?;
    let ask_col = df.column("ask")?.f64()?;
    let delta_col = df.column("delta")?.f64()?;
    let iv_col = df.column("impvol")?.f64()?;
    let under_col = df.column("underprice")?.f64()?;

    let mut contracts = Vec::with_capacity(df.height());

    for idx in 0..df.height() {
        let right = right_col.get(idx).and_then(OptionType::from_str);

        let row = (
            right,
            strike_col.get(idx),
            bid_col.get(idx),
            ask_col.get(idx),
            delta_col.get(idx),
            iv_col.get(idx),
            under_col.get(idx),
        );

        let (Some(right), Some(strike), Some(bid), Some(ask), Some(delta), Some(iv), Some(under)) =
            row
        else {
            continue;
        };

        contracts.push(OptionContract {
            right,
            strike: to_decimal(strike),
            bid: to_decimal(bid),
            ask: to_decimal(ask),
            delta,
            implied_vol: iv,
            underlying_price: to_decimal(under),
        });
    }

    if contracts.len() < df.height() {
        warn!(
            "Skipped {} incomplete chain rows",
            df.height() - contracts.len()
        );
    }

    if contracts.is_empty() && df.height() > 0 {
        return Err(LoaderError::InvalidData(
            "No usable rows in options chain".to_string(),
        ));
    }

    Ok(OptionsChain::new(contracts))
}
