//! Research configuration.
//!
//! All sections are optional in the file; missing fields fall back to their
//! defaults.
//!
//! ```json
//! {
//!   "walk_forward": { "oos_periods": 21, "warmup": 252 },
//!   "condor": { "hedge_width": "10", "slippage_haircut": "0.15" },
//!   "kelly": { "max_leverage": 1.0 }
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{EwmaConfig, LaggedRvConfig, StochasticVolConfig};
use crate::risk::{KellyConfig, SimulationConfig};
use crate::strategy::CondorConfig;
use crate::walkforward::WalkForwardConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    pub walk_forward: WalkForwardConfig,
    pub stochastic_vol: StochasticVolConfig,
    pub ewma: EwmaConfig,
    pub lagged_rv: LaggedRvConfig,
    pub condor: CondorConfig,
    pub simulation: SimulationConfig,
    pub kelly: KellyConfig,
}

impl ResearchConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = ResearchConfig::from_json_str(
            r#"{ "walk_forward": { "oos_periods": 5, "warmup": 60 },
                 "condor": { "hedge_width": "5" } }"#,
        )
        .unwrap();

        assert_eq!(config.walk_forward.oos_periods, 5);
        assert_eq!(config.walk_forward.warmup, 60);
        assert_eq!(config.condor.hedge_width, dec!(5));
        assert_eq!(config.condor.slippage_haircut, dec!(0.15));
        assert_eq!(config.kelly.max_leverage, 1.0);
        assert_eq!(config.stochastic_vol.n_paths, 5000);
        assert_eq!(config.lagged_rv.lags, 21);
    }

    #[test]
    fn test_empty_object_is_default() {
        let config = ResearchConfig::from_json_str("{}").unwrap();
        assert_eq!(config.walk_forward.warmup, 252);
        assert_eq!(config.simulation.trading_days_per_year, 252.0);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            ResearchConfig::from_json_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            ResearchConfig::load("/nonexistent/volcondor.json"),
            Err(ConfigError::Io { .. })
        ));
    }
}
