//! Feature construction for volatility models.
//!
//! - Log returns from a close series
//! - Daily realized variance from intraday closes
//! - Lag matrices (`x_t, x_t-1, ..., x_t-n`) for autoregressive inputs

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};

use super::series::{SeriesError, SeriesView, TimeSeries};

/// Log returns `ln(p_t / p_{t-1})`, keyed by the later observation.
///
/// The first observation has no predecessor and is dropped.
pub fn log_returns<K: Ord + Clone>(
    closes: &TimeSeries<K, f64>,
) -> Result<TimeSeries<K, f64>, SeriesError> {
    let returns = closes.values().windows(2).map(|w| (w[1] / w[0]).ln());
    let keys = closes.keys().iter().skip(1).cloned();

    TimeSeries::from_pairs(keys.zip(returns))
}

/// Daily realized variance: the sum of squared intraday log returns per day.
///
/// Returns are only taken between bars of the same calendar day, so the
/// overnight gap never contributes. Days with a single bar report zero.
pub fn realized_variance(
    bars: &TimeSeries<NaiveDateTime, f64>,
) -> Result<TimeSeries<NaiveDate, f64>, SeriesError> {
    let mut daily: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    let mut previous: Option<(NaiveDate, f64)> = None;

    for (timestamp, &close) in bars.iter() {
        let date = timestamp.date();
        let entry = daily.entry(date).or_insert(0.0);

        if let Some((prev_date, prev_close)) = previous {
            if prev_date == date && prev_close > 0.0 && close > 0.0 {
                let r = (close / prev_close).ln();
                *entry += r * r;
            }
        }

        previous = Some((date, close));
    }

    TimeSeries::from_pairs(daily)
}

/// Lag rows `[x_t, x_t-1, ..., x_t-lags]` for every `t >= lags`.
pub fn lag_rows(values: &[f64], lags: usize) -> Vec<Vec<f64>> {
    (lags..values.len())
        .map(|t| (0..=lags).map(|n| values[t - n]).collect())
        .collect()
}

/// Lagged feature rows keyed by `t`.
///
/// Only rows with a complete lag window are produced, so the output is
/// `lags` observations shorter than the input.
pub fn lag_matrix<K: Ord + Clone>(
    series: SeriesView<'_, K, f64>,
    lags: usize,
) -> Result<TimeSeries<K, Vec<f64>>, SeriesError> {
    let keys = series.keys().iter().skip(lags).cloned();
    TimeSeries::from_pairs(keys.zip(lag_rows(series.values(), lags)))
}
