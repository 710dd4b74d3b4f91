//! Lagged log realized-variance regression.
//!
//! ```text
//! y_t = ln(rv_t + eps)
//! y_{t+1} = b_0 + b_1 y_t + ... + b_p y_{t-p+1} + e_{t+1},  e ~ N(0, s^2)
//! ```
//!
//! Fit by ridge-stabilized least squares over the lag matrix of the
//! training window. Forecasts iterate the regression on its own mean and
//! carry a Gaussian predictive distribution for log variance whose spread
//! accumulates the moving-average weights of the lag polynomial.

use std::collections::VecDeque;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::features::lag_matrix;
use crate::data::SeriesView;
use crate::walkforward::{ForecastModel, ModelError};

use super::VarianceForecast;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LaggedRvConfig {
    /// Lags of log realized variance used as regressors.
    pub lags: usize,
    /// Minimum training observations.
    pub min_observations: usize,
    /// Ridge penalty on the lag coefficients (not the intercept).
    pub ridge: f64,
    /// Offset inside the log so zero-variance days stay finite.
    pub eps: f64,
}

impl Default for LaggedRvConfig {
    fn default() -> Self {
        Self {
            lags: 21,
            min_observations: 100,
            ridge: 1e-6,
            eps: 1e-12,
        }
    }
}

/// Gaussian predictive distribution of log variance for one step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogVarianceForecast {
    pub mean: f64,
    pub std_dev: f64,
}

impl LogVarianceForecast {
    /// Variance at the `z`-score quantile of the predictive distribution.
    pub fn quantile(&self, z: f64) -> f64 {
        (self.mean + z * self.std_dev).exp()
    }
}

impl VarianceForecast for LogVarianceForecast {
    /// Lognormal mean, `exp(mean + std^2 / 2)`.
    fn variance(&self) -> f64 {
        (self.mean + 0.5 * self.std_dev * self.std_dev).exp()
    }
}

/// Fitted regression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaggedRvFit {
    pub intercept: f64,
    /// Coefficients on `y_t, y_t-1, ...`.
    pub coefficients: Vec<f64>,
    /// Residual standard deviation.
    pub sigma: f64,
    /// Last training lags, newest first.
    pub last_lags: Vec<f64>,
}

impl LaggedRvFit {
    /// Sum of the lag coefficients.
    pub fn persistence(&self) -> f64 {
        self.coefficients.iter().sum()
    }
}

#[derive(Debug, Clone, Default)]
pub struct LaggedRvRegression {
    config: LaggedRvConfig,
    fit: Option<LaggedRvFit>,
}

impl LaggedRvRegression {
    pub fn new(config: LaggedRvConfig) -> Self {
        Self { config, fit: None }
    }

    pub fn config(&self) -> &LaggedRvConfig {
        &self.config
    }

    /// Result of the last successful fit.
    pub fn fitted(&self) -> Option<&LaggedRvFit> {
        self.fit.as_ref()
    }

    /// Fit on a realized-variance window.
    pub fn fit_series<K: Ord + Clone>(
        &mut self,
        training: SeriesView<'_, K, f64>,
    ) -> Result<&LaggedRvFit, ModelError> {
        let p = self.config.lags;
        if p == 0 {
            return Err(ModelError::Fit("lags must be positive".to_string()));
        }

        // n - p regression rows must outnumber the p + 1 parameters
        let required = self.config.min_observations.max(2 * p + 2);
        if training.len() < required {
            return Err(ModelError::InsufficientData {
                required,
                actual: training.len(),
            });
        }
        if let Some(pos) = training
            .values()
            .iter()
            .position(|v| !(v.is_finite() && *v >= 0.0))
        {
            return Err(ModelError::Fit(format!(
                "invalid realized variance at position {}",
                pos
            )));
        }

        let eps = self.config.eps;
        let lagged = lag_matrix(training, p - 1).map_err(|e| ModelError::Fit(e.to_string()))?;
        let rows: Vec<Vec<f64>> = lagged
            .values()
            .iter()
            .map(|row| row.iter().map(|v| (v + eps).ln()).collect())
            .collect();

        // Row i predicts the newest entry of row i + 1
        let n = rows.len() - 1;
        let k = p + 1;
        let x = DMatrix::from_fn(n, k, |i, j| if j == 0 { 1.0 } else { rows[i][j - 1] });
        let y = DVector::from_iterator(n, rows[1..].iter().map(|row| row[0]));

        let mut xtx = x.transpose() * &x;
        for j in 1..k {
            xtx[(j, j)] += self.config.ridge;
        }
        let xty = x.transpose() * &y;
        let beta = xtx
            .cholesky()
            .ok_or_else(|| ModelError::Fit("singular normal equations".to_string()))?
            .solve(&xty);

        let residuals = &y - &x * &beta;
        let sigma = (residuals.norm_squared() / (n - k) as f64).sqrt();
        if !(sigma.is_finite() && beta.iter().all(|b| b.is_finite())) {
            return Err(ModelError::Fit("non-finite parameter estimate".to_string()));
        }

        let fit = LaggedRvFit {
            intercept: beta[0],
            coefficients: beta.iter().skip(1).copied().collect(),
            sigma,
            last_lags: rows[n].clone(),
        };
        debug!(
            "Lagged RV fit on {} days: persistence={:.4} sigma={:.4}",
            training.len(),
            fit.persistence(),
            fit.sigma
        );

        Ok(self.fit.insert(fit))
    }

    /// Lazy `horizon`-step forecast from the fitted state.
    pub fn steps(&self, horizon: usize) -> Result<LaggedRvSteps<'_>, ModelError> {
        let fit = self.fit.as_ref().ok_or(ModelError::NotFitted)?;
        Ok(LaggedRvSteps {
            fit,
            window: fit.last_lags.iter().copied().collect(),
            psi: Vec::with_capacity(horizon),
            psi_sq_sum: 0.0,
            remaining: horizon,
        })
    }
}

/// Iterated forecast. Step `h` has spread `s * sqrt(psi_0^2 + ... + psi_h-1^2)`.
pub struct LaggedRvSteps<'a> {
    fit: &'a LaggedRvFit,
    window: VecDeque<f64>,
    psi: Vec<f64>,
    psi_sq_sum: f64,
    remaining: usize,
}

impl Iterator for LaggedRvSteps<'_> {
    type Item = LogVarianceForecast;

    fn next(&mut self) -> Option<LogVarianceForecast> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let mean = self.fit.intercept
            + self
                .fit
                .coefficients
                .iter()
                .zip(&self.window)
                .map(|(b, y)| b * y)
                .sum::<f64>();
        self.window.pop_back();
        self.window.push_front(mean);

        // psi_0 = 1, psi_j = sum_i b_i * psi_{j-i}
        let j = self.psi.len();
        let weight = if j == 0 {
            1.0
        } else {
            self.fit
                .coefficients
                .iter()
                .take(j)
                .enumerate()
                .map(|(i, b)| b * self.psi[j - 1 - i])
                .sum()
        };
        self.psi.push(weight);
        self.psi_sq_sum += weight * weight;

        Some(LogVarianceForecast {
            mean,
            std_dev: self.fit.sigma * self.psi_sq_sum.sqrt(),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K: Ord + Clone> ForecastModel<K, f64> for LaggedRvRegression {
    type Forecast = LogVarianceForecast;
    type Steps<'a> = LaggedRvSteps<'a>;

    fn fit(&mut self, training: SeriesView<'_, K, f64>) -> Result<(), ModelError> {
        self.fit_series(training).map(|_| ())
    }

    fn forecast(&mut self, horizon: usize) -> Result<Self::Steps<'_>, ModelError> {
        self.steps(horizon)
    }
}
