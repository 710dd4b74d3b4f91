//! Walk-forward model tester.
//!
//! Repeatedly refits a model on an expanding window and forecasts the next
//! out-of-sample block. At split `idx` the model is fit on positions
//! `[0, idx)` only and its forecasts are assigned to positions
//! `idx, idx + 1, ..., idx + oos_periods - 1`.

use std::fmt::Debug;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::data::{SeriesView, TimeSeries};

use super::forecasts::ForecastMap;
use super::periods::{SplitIndices, SplitPlan, WalkForwardConfig};

/// Errors raised by forecasting models.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Model has not been fit")]
    NotFitted,

    #[error("Fit failed: {0}")]
    Fit(String),

    #[error("Forecast produced {produced} of {expected} steps")]
    ShortForecast { expected: usize, produced: usize },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WalkForwardError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// A model that can be fit on a training window and forecast forward.
///
/// `forecast` returns a lazy iterator: pulling the k-th value must not
/// require steps beyond k to have been computed, and each pull may advance
/// the model's internal state.
pub trait ForecastModel<K, V> {
    /// Per-step forecast payload.
    type Forecast;

    /// Iterator over forecast steps, borrowing the model.
    type Steps<'a>: Iterator<Item = Self::Forecast>
    where
        Self: 'a;

    fn fit(&mut self, training: SeriesView<'_, K, V>) -> Result<(), ModelError>;

    fn forecast(&mut self, horizon: usize) -> Result<Self::Steps<'_>, ModelError>;
}

/// Walk-forward tester over a borrowed dataset.
pub struct WalkForwardTester<'d, K: Ord, V, M: ForecastModel<K, V>> {
    data: &'d TimeSeries<K, V>,
    model: M,
    plan: SplitPlan,
    forecasts: ForecastMap<K, M::Forecast>,
}

impl<'d, K, V, M> WalkForwardTester<'d, K, V, M>
where
    K: Ord + Clone + Debug,
    M: ForecastModel<K, V>,
{
    /// Create a tester.
    ///
    /// `warmup >= data.len()` is accepted and produces no forecasts.
    pub fn new(
        data: &'d TimeSeries<K, V>,
        model: M,
        oos_periods: usize,
        warmup: usize,
    ) -> Result<Self, WalkForwardError> {
        let plan = SplitPlan::new(data.len(), warmup, oos_periods)?;

        Ok(Self {
            data,
            model,
            plan,
            forecasts: ForecastMap::from_keys(data.keys().iter().cloned()),
        })
    }

    pub fn with_config(
        data: &'d TimeSeries<K, V>,
        model: M,
        config: &WalkForwardConfig,
    ) -> Result<Self, WalkForwardError> {
        Self::new(data, model, config.oos_periods, config.warmup)
    }

    pub fn plan(&self) -> &SplitPlan {
        &self.plan
    }

    /// Split positions, independent of the model.
    pub fn split_indices(&self) -> SplitIndices {
        self.plan.indices()
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn forecasts(&self) -> &ForecastMap<K, M::Forecast> {
        &self.forecasts
    }

    pub fn into_parts(self) -> (M, ForecastMap<K, M::Forecast>) {
        (self.model, self.forecasts)
    }

    /// Run every fit/forecast cycle.
    ///
    /// Model failures abort the run and are returned unchanged; the
    /// previously stored forecasts are left untouched in that case.
    pub fn walk_forward(&mut self) -> Result<&ForecastMap<K, M::Forecast>, WalkForwardError> {
        let oos_periods = self.plan.oos_periods();
        let iterations = self.plan.iterations();

        if iterations == 0 {
            warn!(
                "No walk-forward iterations: {} observations, warmup {}, oos block {}",
                self.data.len(),
                self.plan.warmup(),
                oos_periods
            );
        } else {
            info!(
                "Walk-forward: {} iterations of {} periods after warmup {}",
                iterations,
                oos_periods,
                self.plan.adjusted_warmup()
            );
        }

        let mut forecasts = ForecastMap::from_keys(self.data.keys().iter().cloned());

        for (iteration, idx) in self.plan.indices().enumerate() {
            let training = self.data.prefix(idx);
            debug!(
                "Split {}/{}: fitting on {} observations through {:?}",
                iteration + 1,
                iterations,
                training.len(),
                training.last_key()
            );

            if let Err(e) = self.model.fit(training) {
                warn!("Fit failed at split index {}: {}", idx, e);
                return Err(e.into());
            }

            let steps = match self.model.forecast(oos_periods) {
                Ok(steps) => steps,
                Err(e) => {
                    warn!("Forecast failed at split index {}: {}", idx, e);
                    return Err(e.into());
                }
            };

            let mut produced = 0;
            for (k, forecast) in steps.take(oos_periods).enumerate() {
                // Plan guarantees idx + oos_periods <= len
                if let Some(key) = self.data.key_at(idx + k) {
                    forecasts.record(key, forecast);
                }
                produced += 1;
            }

            if produced < oos_periods {
                warn!(
                    "Model yielded {} of {} steps at split index {}",
                    produced, oos_periods, idx
                );
                return Err(ModelError::ShortForecast {
                    expected: oos_periods,
                    produced,
                }
                .into());
            }
        }

        info!(
            "Walk-forward complete: {} of {} observations forecast",
            forecasts.forecasted_count(),
            forecasts.len()
        );

        self.forecasts = forecasts;
        Ok(&self.forecasts)
    }
}
