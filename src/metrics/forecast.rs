//! Out-of-sample forecast accuracy.
//!
//! Compares variance forecasts against a realized-variance series over the
//! keys that were actually forecasted. Keys without a realized value are
//! skipped.

use serde::{Deserialize, Serialize};

use crate::data::TimeSeries;
use crate::models::VarianceForecast;
use crate::walkforward::ForecastMap;

/// Accuracy statistics for variance forecasts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastAccuracy {
    /// Forecast/realized pairs compared.
    pub count: usize,
    /// Mean of forecast - realized.
    pub bias: f64,
    /// Mean absolute error.
    pub mae: f64,
    /// Root mean squared error.
    pub rmse: f64,
    /// Mean QLIKE loss over pairs where both values are positive.
    pub qlike: Option<f64>,
}

impl ForecastAccuracy {
    /// Score forecasts against realized variance.
    pub fn evaluate<K, F>(forecasts: &ForecastMap<K, F>, realized: &TimeSeries<K, f64>) -> Self
    where
        K: Ord,
        F: VarianceForecast,
    {
        let pairs = forecasts.forecasted().filter_map(|(key, forecast)| {
            realized
                .get(key)
                .map(|&actual| (forecast.variance(), actual))
        });
        Self::from_pairs(pairs)
    }

    /// Score forecasts using squared returns as the realized proxy.
    pub fn against_squared_returns<K, F>(
        forecasts: &ForecastMap<K, F>,
        returns: &TimeSeries<K, f64>,
    ) -> Self
    where
        K: Ord,
        F: VarianceForecast,
    {
        let pairs = forecasts.forecasted().filter_map(|(key, forecast)| {
            returns
                .get(key)
                .map(|&r| (forecast.variance(), r * r))
        });
        Self::from_pairs(pairs)
    }

    /// Score `(forecast, realized)` pairs. Non-finite pairs are ignored.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (f64, f64)>) -> Self {
        let mut count = 0usize;
        let mut error_sum = 0.0;
        let mut abs_sum = 0.0;
        let mut sq_sum = 0.0;
        let mut qlike_sum = 0.0;
        let mut qlike_count = 0usize;

        for (forecast, actual) in pairs {
            if !(forecast.is_finite() && actual.is_finite()) {
                continue;
            }
            let error = forecast - actual;
            count += 1;
            error_sum += error;
            abs_sum += error.abs();
            sq_sum += error * error;

            if forecast > 0.0 && actual > 0.0 {
                let ratio = actual / forecast;
                qlike_sum += ratio - ratio.ln() - 1.0;
                qlike_count += 1;
            }
        }

        if count == 0 {
            return Self::default();
        }

        let n = count as f64;
        Self {
            count,
            bias: error_sum / n,
            mae: abs_sum / n,
            rmse: (sq_sum / n).sqrt(),
            qlike: (qlike_count > 0).then(|| qlike_sum / qlike_count as f64),
        }
    }

    /// One-line summary for logs and the CLI.
    pub fn summary(&self) -> String {
        let qlike = self
            .qlike
            .map(|q| format!("{:.4}", q))
            .unwrap_or_else(|| "n/a".to_string());
        format!(
            "n={} bias={:.3e} mae={:.3e} rmse={:.3e} qlike={}",
            self.count, self.bias, self.mae, self.rmse, qlike
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_perfect_forecasts() {
        let acc = ForecastAccuracy::from_pairs([(0.01, 0.01), (0.04, 0.04)]);
        assert_eq!(acc.count, 2);
        assert_eq!(acc.mae, 0.0);
        assert_eq!(acc.rmse, 0.0);
        assert_relative_eq!(acc.qlike.unwrap(), 0.0, epsilon = 1e-15);
    }

    #[test]
    fn test_error_statistics() {
        let acc = ForecastAccuracy::from_pairs([(2.0, 1.0), (1.0, 3.0)]);
        assert_relative_eq!(acc.bias, -0.5);
        assert_relative_eq!(acc.mae, 1.5);
        assert_relative_eq!(acc.rmse, (2.5f64).sqrt());
    }

    #[test]
    fn test_only_forecasted_slots_are_scored() {
        let realized = TimeSeries::from_pairs((0u32..6).map(|k| (k, 0.02))).unwrap();
        let mut forecasts: ForecastMap<u32, f64> = ForecastMap::from_keys(0u32..6);
        forecasts.record(&4, 0.01);
        forecasts.record(&5, 0.03);

        let acc = ForecastAccuracy::against_squared_returns(&forecasts, &realized);
        assert_eq!(acc.count, 2);
        // Realized proxy is 0.02^2 = 0.0004
        assert_relative_eq!(acc.bias, 0.0196, epsilon = 1e-12);

        let direct = ForecastAccuracy::evaluate(&forecasts, &realized);
        assert_eq!(direct.count, 2);
        assert_relative_eq!(direct.bias, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_is_default() {
        let acc = ForecastAccuracy::from_pairs(std::iter::empty());
        assert_eq!(acc, ForecastAccuracy::default());
        assert!(acc.summary().contains("qlike=n/a"));
    }
}
