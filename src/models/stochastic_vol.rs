//! Stochastic-volatility sampler.
//!
//! Models daily log-variance as an AR(1) process
//!
//! ```text
//! h_t = ln(r_t^2 + eps) - E[ln z^2]
//! h_t = mu + phi * (h_{t-1} - mu) + sigma * z_t,  z_t ~ N(0, 1)
//! ```
//!
//! Parameters are estimated by least squares on the training window.
//! Forecasting simulates `n_paths` log-variance paths from the last fitted
//! state and yields the cross-section of paths one step at a time.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use tracing::debug;

use crate::data::features::lag_rows;
use crate::data::SeriesView;
use crate::walkforward::{ForecastModel, ModelError};

use super::VarianceForecast;

/// Hard floor for the training window; the AR(1) regression needs pairs.
const MIN_FIT_OBSERVATIONS: usize = 3;

/// Mean of ln(z^2) for standard normal z.
const LOG_CHI2_MEAN: f64 = -1.270_362_845_461_478;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StochasticVolConfig {
    /// Number of simulated paths per forecast.
    pub n_paths: usize,
    /// Minimum training observations.
    pub min_observations: usize,
    /// Offset inside the log so zero returns stay finite.
    pub eps: f64,
    /// RNG seed.
    pub seed: u64,
}

impl Default for StochasticVolConfig {
    fn default() -> Self {
        Self {
            n_paths: 5000,
            min_observations: 30,
            eps: 1e-12,
            seed: 42,
        }
    }
}

/// Fitted AR(1) log-variance parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SvParams {
    /// Long-run mean of log-variance
    pub mu: f64,
    /// Persistence
    pub phi: f64,
    /// Innovation standard deviation
    pub sigma: f64,
    /// Log-variance of the last training observation
    pub last_h: f64,
}

impl SvParams {
    /// Stationary volatility implied by the fit.
    pub fn long_run_volatility(&self) -> f64 {
        (self.mu / 2.0).exp()
    }
}

/// Simulated log-variance draws for one forecast step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilityDraws {
    pub log_variance: Vec<f64>,
}

impl VolatilityDraws {
    pub fn len(&self) -> usize {
        self.log_variance.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log_variance.is_empty()
    }

    /// Per-period volatility of each draw, `exp(h / 2)`.
    pub fn volatilities(&self) -> Vec<f64> {
        self.log_variance.iter().map(|h| (h / 2.0).exp()).collect()
    }

    /// Volatility of each draw scaled to an annual figure.
    pub fn annualized(&self, periods_per_year: f64) -> Vec<f64> {
        let scale = periods_per_year.sqrt();
        self.log_variance
            .iter()
            .map(|h| (h / 2.0).exp() * scale)
            .collect()
    }
}

impl VarianceForecast for VolatilityDraws {
    /// Mean variance across draws.
    fn variance(&self) -> f64 {
        self.log_variance.iter().map(|h| h.exp()).mean()
    }
}

/// AR(1) log-variance model with Monte Carlo forecasts.
pub struct StochasticVolatility {
    config: StochasticVolConfig,
    params: Option<SvParams>,
    rng: StdRng,
    steps_generated: usize,
}

impl StochasticVolatility {
    pub fn new(config: StochasticVolConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            params: None,
            rng,
            steps_generated: 0,
        }
    }

    pub fn config(&self) -> &StochasticVolConfig {
        &self.config
    }

    /// Parameters of the last successful fit.
    pub fn params(&self) -> Option<&SvParams> {
        self.params.as_ref()
    }

    /// Forecast steps drawn since the last fit.
    pub fn steps_generated(&self) -> usize {
        self.steps_generated
    }

    /// Estimate parameters from a slice of returns.
    pub fn fit_returns(&mut self, returns: &[f64]) -> Result<&SvParams, ModelError> {
        let required = self.config.min_observations.max(MIN_FIT_OBSERVATIONS);
        if returns.len() < required {
            return Err(ModelError::InsufficientData {
                required,
                actual: returns.len(),
            });
        }
        if let Some(bad) = returns.iter().find(|r| !r.is_finite()) {
            return Err(ModelError::Fit(format!("non-finite return {}", bad)));
        }

        let eps = self.config.eps;
        let h: Vec<f64> = returns
            .iter()
            .map(|r| (r * r + eps).ln() - LOG_CHI2_MEAN)
            .collect();

        // Rows of [h_t, h_t-1]
        let rows = lag_rows(&h, 1);
        let y: Vec<f64> = rows.iter().map(|row| row[0]).collect();
        let x: Vec<f64> = rows.iter().map(|row| row[1]).collect();
        let mean_x = x.iter().mean();
        let mean_y = y.iter().mean();

        let sxx: f64 = x.iter().map(|xi| (xi - mean_x).powi(2)).sum();
        if sxx <= f64::EPSILON {
            return Err(ModelError::Fit("constant log-variance".to_string()));
        }
        let sxy: f64 = x
            .iter()
            .zip(&y)
            .map(|(xi, yi)| (xi - mean_x) * (yi - mean_y))
            .sum();

        let phi = (sxy / sxx).clamp(-0.999, 0.999);
        let intercept = mean_y - phi * mean_x;
        let mu = intercept / (1.0 - phi);

        let residuals: Vec<f64> = x
            .iter()
            .zip(&y)
            .map(|(xi, yi)| yi - intercept - phi * xi)
            .collect();
        let sigma = residuals.std_dev();

        if !(mu.is_finite() && sigma.is_finite()) {
            return Err(ModelError::Fit("non-finite parameter estimate".to_string()));
        }

        let last_h = h[h.len() - 1];
        debug!(
            "SV fit on {} returns: mu={:.4} phi={:.4} sigma={:.4}",
            returns.len(),
            mu,
            phi,
            sigma
        );

        self.steps_generated = 0;
        Ok(self.params.insert(SvParams {
            mu,
            phi,
            sigma,
            last_h,
        }))
    }

    /// Start a lazy simulation of `horizon` steps from the fitted state.
    pub fn simulate(&mut self, horizon: usize) -> Result<SvPaths<'_>, ModelError> {
        let params = self.params.ok_or(ModelError::NotFitted)?;
        let state = vec![params.last_h; self.config.n_paths];

        Ok(SvPaths {
            model: self,
            params,
            state,
            remaining: horizon,
        })
    }
}

impl Default for StochasticVolatility {
    fn default() -> Self {
        Self::new(StochasticVolConfig::default())
    }
}

/// Lazy forecast iterator. Each pull advances every path by one step.
pub struct SvPaths<'a> {
    model: &'a mut StochasticVolatility,
    params: SvParams,
    state: Vec<f64>,
    remaining: usize,
}

impl Iterator for SvPaths<'_> {
    type Item = VolatilityDraws;

    fn next(&mut self) -> Option<VolatilityDraws> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let SvParams { mu, phi, sigma, .. } = self.params;
        let rng = &mut self.model.rng;
        for h in self.state.iter_mut() {
            let z: f64 = rng.sample(StandardNormal);
            *h = mu + phi * (*h - mu) + sigma * z;
        }
        self.model.steps_generated += 1;

        Some(VolatilityDraws {
            log_variance: self.state.clone(),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K> ForecastModel<K, f64> for StochasticVolatility {
    type Forecast = VolatilityDraws;
    type Steps<'a> = SvPaths<'a>;

    fn fit(&mut self, training: SeriesView<'_, K, f64>) -> Result<(), ModelError> {
        self.fit_returns(training.values()).map(|_| ())
    }

    fn forecast(&mut self, horizon: usize) -> Result<Self::Steps<'_>, ModelError> {
        self.simulate(horizon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TimeSeries;
    use approx::assert_relative_eq;
    use rand_distr::{Distribution, Normal};

    fn config(n_paths: usize) -> StochasticVolConfig {
        StochasticVolConfig {
            n_paths,
            ..Default::default()
        }
    }

    /// Returns from a known AR(1) log-variance process.
    fn simulated_returns(n: usize, mu: f64, phi: f64, sigma: f64, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let shock = Normal::new(0.0, sigma).unwrap();
        let mut h = mu;
        (0..n)
            .map(|_| {
                h = mu + phi * (h - mu) + shock.sample(&mut rng);
                let z: f64 = rng.sample(StandardNormal);
                (h / 2.0).exp() * z
            })
            .collect()
    }

    #[test]
    fn test_forecast_before_fit_fails() {
        let mut model = StochasticVolatility::new(config(10));
        assert_eq!(model.simulate(5).err(), Some(ModelError::NotFitted));
    }

    #[test]
    fn test_insufficient_data() {
        let mut model = StochasticVolatility::new(config(10));
        let err = model.fit_returns(&[0.01, -0.02]).unwrap_err();
        assert_eq!(
            err,
            ModelError::InsufficientData {
                required: 30,
                actual: 2
            }
        );
    }

    #[test]
    fn test_fit_recovers_persistence() {
        let returns = simulated_returns(4000, -9.0, 0.9, 0.4, 7);
        let mut model = StochasticVolatility::new(config(10));
        let params = *model.fit_returns(&returns).unwrap();

        // ln(z^2) noise attenuates phi heavily, so only sign and rough size are checked
        assert!(params.phi > 0.05 && params.phi < 0.5);
        assert!(params.sigma > 0.0);
        // Long-run daily vol near exp(-4.5)
        assert!(params.long_run_volatility() > 0.002 && params.long_run_volatility() < 0.02);
    }

    #[test]
    fn test_forecast_is_lazy() {
        let returns = simulated_returns(300, -9.0, 0.9, 0.4, 11);
        let mut model = StochasticVolatility::new(config(50));
        model.fit_returns(&returns).unwrap();

        let mut steps = model.simulate(1_000).unwrap();
        let first = steps.next().unwrap();
        let _second = steps.next().unwrap();
        drop(steps);

        assert_eq!(first.len(), 50);
        assert_eq!(model.steps_generated(), 2);
    }

    #[test]
    fn test_paths_match_between_horizons() {
        let returns = simulated_returns(300, -9.0, 0.9, 0.4, 3);

        let mut short = StochasticVolatility::new(config(20));
        short.fit_returns(&returns).unwrap();
        let a: Vec<VolatilityDraws> = short.simulate(3).unwrap().collect();

        let mut long = StochasticVolatility::new(config(20));
        long.fit_returns(&returns).unwrap();
        let b: Vec<VolatilityDraws> = long.simulate(50).unwrap().take(3).collect();

        assert_eq!(a, b);
    }

    #[test]
    fn test_walk_forward_contract() {
        let returns = simulated_returns(120, -9.0, 0.9, 0.4, 5);
        let series = TimeSeries::from_pairs(returns.into_iter().enumerate()).unwrap();

        let mut model = StochasticVolatility::new(config(5));
        ForecastModel::fit(&mut model, series.prefix(60)).unwrap();
        let steps: Vec<_> = ForecastModel::<usize, f64>::forecast(&mut model, 4)
            .unwrap()
            .collect();
        assert_eq!(steps.len(), 4);
    }

    #[test]
    fn test_draw_transforms() {
        let draws = VolatilityDraws {
            log_variance: vec![(0.01f64).ln() * 2.0, (0.02f64).ln() * 2.0],
        };
        let vols = draws.volatilities();
        assert_relative_eq!(vols[0], 0.01, epsilon = 1e-12);
        assert_relative_eq!(vols[1], 0.02, epsilon = 1e-12);

        let annual = draws.annualized(252.0);
        assert_relative_eq!(annual[0], 0.01 * 252f64.sqrt(), epsilon = 1e-12);

        assert_relative_eq!(draws.variance(), (0.0001 + 0.0004) / 2.0, epsilon = 1e-12);
    }
}
