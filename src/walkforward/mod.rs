//! Walk-forward (rolling-origin) model evaluation.
//!
//! The dataset is split into an initial warmup followed by equal-length
//! out-of-sample blocks:
//! - Fit: every observation before the split
//! - Forecast: the next `oos_periods` observations
//! - Roll: one block at a time until the data ends

pub mod forecasts;
pub mod periods;
pub mod tester;

pub use forecasts::{ForecastMap, ForecastSlot};
pub use periods::{SplitIndices, SplitPlan, WalkForwardConfig};
pub use tester::{ForecastModel, ModelError, WalkForwardError, WalkForwardTester};
