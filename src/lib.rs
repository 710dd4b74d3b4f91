pub mod config;
pub mod data;
pub mod metrics;
pub mod models;
pub mod pricing;
pub mod risk;
pub mod strategy;
pub mod walkforward;

// Re-export commonly used types
pub use config::{ConfigError, ResearchConfig};
pub use data::{DataLoader, OptionContract, OptionType, OptionsChain, SeriesView, TimeSeries};
pub use metrics::ForecastAccuracy;
pub use models::{
    EwmaVolatility, LaggedRvRegression, StochasticVolatility, VarianceForecast, VolatilityDraws,
};
pub use pricing::BlackScholes;
pub use risk::{KellyEstimate, KellyOptimizer, PriceSimulator};
pub use strategy::{OptionPosition, ShortIronCondor, SizingReport};
pub use walkforward::{
    ForecastMap, ForecastModel, ForecastSlot, ModelError, SplitPlan, WalkForwardError,
    WalkForwardTester,
};
