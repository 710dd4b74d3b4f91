//! Volatility forecasting models.
//!
//! Every model implements [`ForecastModel`](crate::walkforward::ForecastModel)
//! and can be plugged into the walk-forward tester. The return-based models
//! fit daily returns; [`LaggedRvRegression`] fits daily realized variance.

pub mod ewma;
pub mod lagged_rv;
pub mod stochastic_vol;

pub use ewma::{EwmaConfig, EwmaVolatility};
pub use lagged_rv::{LaggedRvConfig, LaggedRvFit, LaggedRvRegression, LogVarianceForecast};
pub use stochastic_vol::{
    StochasticVolConfig, StochasticVolatility, SvParams, SvPaths, VolatilityDraws,
};

/// Forecast payloads that reduce to a single variance estimate.
pub trait VarianceForecast {
    fn variance(&self) -> f64;
}

impl VarianceForecast for f64 {
    fn variance(&self) -> f64 {
        *self
    }
}
