//! Forecast evaluation metrics.
//!
//! Provides out-of-sample accuracy for variance forecasts:
//! - Bias, MAE, RMSE
//! - QLIKE loss

pub mod forecast;

pub use forecast::ForecastAccuracy;
