//! EWMA (RiskMetrics) variance model.
//!
//! sigma2_t = lambda * sigma2_{t-1} + (1 - lambda) * r_{t-1}^2
//!
//! Multi-step forecasts are flat: the one-step-ahead variance is repeated
//! for every step of the horizon.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::SeriesView;
use crate::walkforward::{ForecastModel, ModelError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EwmaConfig {
    /// Decay factor in (0, 1).
    pub lambda: f64,
    /// Observations used to seed the recursion.
    pub min_observations: usize,
}

impl Default for EwmaConfig {
    fn default() -> Self {
        Self {
            lambda: 0.94,
            min_observations: 20,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EwmaVolatility {
    config: EwmaConfig,
    next_variance: Option<f64>,
}

impl EwmaVolatility {
    pub fn new(config: EwmaConfig) -> Self {
        Self {
            config,
            next_variance: None,
        }
    }

    /// One-step-ahead variance from the last fit.
    pub fn next_variance(&self) -> Option<f64> {
        self.next_variance
    }

    pub fn fit_returns(&mut self, returns: &[f64]) -> Result<f64, ModelError> {
        let lambda = self.config.lambda;
        if !(lambda > 0.0 && lambda < 1.0) {
            return Err(ModelError::Fit(format!("lambda {} outside (0, 1)", lambda)));
        }

        let seed_len = self.config.min_observations.max(1);
        if returns.len() < seed_len {
            return Err(ModelError::InsufficientData {
                required: seed_len,
                actual: returns.len(),
            });
        }

        // Seed with the mean square of the first window
        let seed = returns[..seed_len].iter().map(|r| r * r).sum::<f64>() / seed_len as f64;

        let variance = returns
            .iter()
            .fold(seed, |var, r| lambda * var + (1.0 - lambda) * r * r);

        if !variance.is_finite() {
            return Err(ModelError::Fit("non-finite variance".to_string()));
        }

        debug!("EWMA fit on {} returns: next variance {:.3e}", returns.len(), variance);
        self.next_variance = Some(variance);
        Ok(variance)
    }
}

impl<K> ForecastModel<K, f64> for EwmaVolatility {
    type Forecast = f64;
    type Steps<'a> = std::iter::Take<std::iter::Repeat<f64>>;

    fn fit(&mut self, training: SeriesView<'_, K, f64>) -> Result<(), ModelError> {
        self.fit_returns(training.values()).map(|_| ())
    }

    fn forecast(&mut self, horizon: usize) -> Result<Self::Steps<'_>, ModelError> {
        let variance = self.next_variance.ok_or(ModelError::NotFitted)?;
        Ok(std::iter::repeat(variance).take(horizon))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TimeSeries;
    use crate::walkforward::WalkForwardTester;
    use approx::assert_relative_eq;

    #[test]
    fn test_constant_returns_converge() {
        let mut model = EwmaVolatility::default();
        let variance = model.fit_returns(&[0.01; 100]).unwrap();
        assert_relative_eq!(variance, 1e-4, epsilon = 1e-12);
    }

    #[test]
    fn test_recursion_weights_recent_shock() {
        let config = EwmaConfig {
            lambda: 0.9,
            min_observations: 2,
        };
        let mut model = EwmaVolatility::new(config);
        // seed = (0 + 0) / 2 = 0; after 0, 0, 0.1: 0.1 * 0.01 = 0.001
        let variance = model.fit_returns(&[0.0, 0.0, 0.1]).unwrap();
        assert_relative_eq!(variance, 0.001, epsilon = 1e-15);
    }

    #[test]
    fn test_forecast_requires_fit() {
        let mut model = EwmaVolatility::default();
        let result = ForecastModel::<u32, f64>::forecast(&mut model, 3);
        assert_eq!(result.err(), Some(ModelError::NotFitted));
    }

    #[test]
    fn test_insufficient_data() {
        let mut model = EwmaVolatility::default();
        assert_eq!(
            model.fit_returns(&[0.01; 5]).unwrap_err(),
            ModelError::InsufficientData {
                required: 20,
                actual: 5
            }
        );
    }

    #[test]
    fn test_walk_forward_flat_forecasts() {
        let returns: Vec<(u32, f64)> = (0..60)
            .map(|i| (i, if i % 2 == 0 { 0.01 } else { -0.01 }))
            .collect();
        let data = TimeSeries::from_pairs(returns).unwrap();

        let mut tester = WalkForwardTester::new(&data, EwmaVolatility::default(), 10, 20).unwrap();
        let forecasts = tester.walk_forward().unwrap();

        assert_eq!(forecasts.forecasted_count(), 40);
        for (_, variance) in forecasts.forecasted() {
            assert_relative_eq!(*variance, 1e-4, epsilon = 1e-12);
        }
    }
}
